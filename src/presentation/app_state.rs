// Application state for HTTP handlers
use crate::application::chart_container::ChartContainer;
use crate::application::chart_renderer::ChartRenderer;
use crate::application::dataset_builder::ChartDatasetBuilder;
use crate::application::rasterizer::VectorRasterizer;
use crate::application::record_view::{PRIMARY_CONTAINER, RecordView, SECONDARY_CONTAINER};
use crate::application::sensor_source::SensorSource;
use crate::application::snapshot_service::SnapshotCapture;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn SensorSource>,
    pub builder: ChartDatasetBuilder,
    pub renderer: Arc<dyn ChartRenderer>,
    pub capture: Arc<SnapshotCapture>,
    pub rasterizer: Arc<VectorRasterizer>,
}

impl AppState {
    /// A record view with its own pair of chart containers.
    pub fn record_view(&self) -> RecordView {
        RecordView::new(
            self.source.clone(),
            self.builder.clone(),
            self.renderer.clone(),
            self.capture.clone(),
            ChartContainer::new(PRIMARY_CONTAINER),
            ChartContainer::new(SECONDARY_CONTAINER),
        )
    }
}
