// Renderer trait for drawing a chart specification into a container
use crate::application::chart_container::ChartContainer;
use crate::domain::chart::ChartSpec;

pub trait ChartRenderer: Send + Sync {
    /// Clear `target`, draw `spec` into it and signal render-complete when done.
    fn render(&self, spec: &ChartSpec, target: &ChartContainer) -> anyhow::Result<()>;
}
