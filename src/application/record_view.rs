// Record view - Renders the charts of a device-log record and captures snapshots
use crate::application::chart_container::ChartContainer;
use crate::application::chart_renderer::ChartRenderer;
use crate::application::dataset_builder::ChartDatasetBuilder;
use crate::application::sensor_source::{SensorSource, SourceError};
use crate::application::snapshot_service::SnapshotCapture;
use crate::domain::chart::{ChartPair, ChartSlot};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Container ids of the two chart slots.
pub const PRIMARY_CONTAINER: &str = "main_chart";
pub const SECONDARY_CONTAINER: &str = "second_chart";

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderOutcome {
    pub charts: ChartPair,
    pub snapshot_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SlotOutcome {
    Saved { field: String },
    Skipped,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub primary: SlotOutcome,
    pub secondary: SlotOutcome,
}

/// Chart pair of one record view, with its own containers.
pub struct RecordView {
    source: Arc<dyn SensorSource>,
    builder: ChartDatasetBuilder,
    renderer: Arc<dyn ChartRenderer>,
    capture: Arc<SnapshotCapture>,
    primary: ChartContainer,
    secondary: ChartContainer,
    /// Charts currently drawn in the containers.
    drawn: Mutex<ChartPair>,
}

impl RecordView {
    pub fn new(
        source: Arc<dyn SensorSource>,
        builder: ChartDatasetBuilder,
        renderer: Arc<dyn ChartRenderer>,
        capture: Arc<SnapshotCapture>,
        primary: ChartContainer,
        secondary: ChartContainer,
    ) -> Self {
        Self {
            source,
            builder,
            renderer,
            capture,
            primary,
            secondary,
            drawn: Mutex::new(ChartPair::default()),
        }
    }

    pub fn container(&self, slot: ChartSlot) -> &ChartContainer {
        match slot {
            ChartSlot::Primary => &self.primary,
            ChartSlot::Secondary => &self.secondary,
        }
    }

    fn clear_all(&self) {
        self.primary.clear();
        self.secondary.clear();
        self.set_drawn(ChartPair::default());
    }

    fn drawn(&self) -> ChartPair {
        match self.drawn.lock() {
            Ok(drawn) => drawn.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_drawn(&self, charts: ChartPair) {
        match self.drawn.lock() {
            Ok(mut drawn) => *drawn = charts,
            Err(poisoned) => *poisoned.into_inner() = charts,
        }
    }

    /// Fetch the sensor data of `record` and redraw both chart slots.
    ///
    /// An empty response clears both containers. A backend failure keeps
    /// whatever was drawn before and reports those charts again.
    pub async fn refresh(&self, record: &str) -> RenderOutcome {
        let sensors = match self.source.fetch_series(record).await {
            Ok(sensors) => sensors,
            Err(SourceError::NoData) => {
                tracing::debug!("No sensor data for {}, clearing charts", record);
                self.clear_all();
                return RenderOutcome::default();
            }
            Err(SourceError::Backend(e)) => {
                tracing::warn!("Error fetching sensor data for {}: {:#}", record, e);
                return RenderOutcome {
                    charts: self.drawn(),
                    snapshot_enabled: self.snapshot_enabled(),
                };
            }
        };

        let built = self.builder.build(&sensors);
        let mut drawn = self.drawn();
        for slot in ChartSlot::ALL {
            let container = self.container(slot);
            match built.get(slot) {
                Some(spec) => match self.renderer.render(spec, container) {
                    Ok(()) => *drawn.slot_mut(slot) = Some(spec.clone()),
                    Err(e) => {
                        tracing::warn!("Error rendering {} chart for {}: {:#}", slot, record, e);
                    }
                },
                None => {
                    container.clear();
                    *drawn.slot_mut(slot) = None;
                }
            }
        }
        self.set_drawn(drawn.clone());

        RenderOutcome {
            snapshot_enabled: self.snapshot_enabled(),
            charts: drawn,
        }
    }

    pub fn snapshot_enabled(&self) -> bool {
        self.primary.has_graphic() || self.secondary.has_graphic()
    }

    /// Capture every slot that currently holds a chart. Slots run concurrently.
    pub async fn capture_all(&self, record: &str) -> CaptureReport {
        let (primary, secondary) = futures::join!(
            self.capture_slot(record, ChartSlot::Primary),
            self.capture_slot(record, ChartSlot::Secondary)
        );
        CaptureReport { primary, secondary }
    }

    async fn capture_slot(&self, record: &str, slot: ChartSlot) -> SlotOutcome {
        let container = self.container(slot);
        if !container.has_graphic() {
            return SlotOutcome::Skipped;
        }

        match self.capture.capture(record, slot, container).await {
            Ok(field) => SlotOutcome::Saved { field },
            Err(e) => SlotOutcome::Failed {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::snapshot_service::tests::{
        CHART_SVG, MemoryFieldStore, RecordingNotifier, capture_with,
    };
    use crate::domain::chart::ChartSpec;
    use crate::domain::graphic::VectorGraphic;
    use crate::domain::sensor::SensorSeries;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    enum Response {
        Series(Vec<SensorSeries>),
        NoData,
        Failure,
    }

    struct FakeSource {
        response: Mutex<Response>,
    }

    impl FakeSource {
        fn new(response: Response) -> Self {
            Self {
                response: Mutex::new(response),
            }
        }

        fn set(&self, response: Response) {
            *self.response.lock().unwrap() = response;
        }
    }

    #[async_trait]
    impl SensorSource for FakeSource {
        async fn fetch_series(&self, _record: &str) -> Result<Vec<SensorSeries>, SourceError> {
            match &*self.response.lock().unwrap() {
                Response::Series(s) => Ok(s.clone()),
                Response::NoData => Err(SourceError::NoData),
                Response::Failure => Err(SourceError::Backend(anyhow::anyhow!("timeout"))),
            }
        }
    }

    struct FixedRenderer;

    impl ChartRenderer for FixedRenderer {
        fn render(&self, _spec: &ChartSpec, target: &ChartContainer) -> anyhow::Result<()> {
            target.clear();
            target.draw(VectorGraphic::new(CHART_SVG));
            target.mark_settled();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingRenderer {
        fail: AtomicBool,
    }

    impl ChartRenderer for FailingRenderer {
        fn render(&self, spec: &ChartSpec, target: &ChartContainer) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("layout failed");
            }
            FixedRenderer.render(spec, target)
        }
    }

    fn temp(readings: Vec<Option<f64>>) -> SensorSeries {
        let labels = (0..readings.len()).map(|i| format!("10:0{}", i)).collect();
        SensorSeries::new("Temp", "C", labels, readings)
    }

    fn view(source: Arc<FakeSource>, store: Arc<MemoryFieldStore>) -> RecordView {
        let capture = capture_with(store, Arc::new(RecordingNotifier::default()));
        RecordView::new(
            source,
            ChartDatasetBuilder::default(),
            Arc::new(FixedRenderer),
            Arc::new(capture),
            ChartContainer::new(PRIMARY_CONTAINER),
            ChartContainer::new(SECONDARY_CONTAINER),
        )
    }

    #[tokio::test]
    async fn test_refresh_renders_available_slots() {
        let source = Arc::new(FakeSource::new(Response::Series(vec![temp(vec![Some(1.0), Some(2.0)])])));
        let view = view(source, Arc::new(MemoryFieldStore::default()));

        let outcome = view.refresh("LOG-0001").await;
        assert!(outcome.charts.primary.is_some());
        assert!(outcome.charts.secondary.is_none());
        assert!(outcome.snapshot_enabled);
        assert!(view.container(ChartSlot::Primary).has_graphic());
        assert!(!view.container(ChartSlot::Secondary).has_graphic());
    }

    #[tokio::test]
    async fn test_no_data_clears_containers() {
        let source = Arc::new(FakeSource::new(Response::Series(vec![
            temp(vec![Some(1.0)]),
            temp(vec![Some(2.0)]),
        ])));
        let view = view(source.clone(), Arc::new(MemoryFieldStore::default()));
        assert!(view.refresh("LOG-0001").await.snapshot_enabled);

        source.set(Response::NoData);
        let outcome = view.refresh("LOG-0001").await;
        assert!(outcome.charts.is_empty());
        assert!(!outcome.snapshot_enabled);
        assert!(!view.container(ChartSlot::Primary).has_graphic());
        assert!(!view.container(ChartSlot::Secondary).has_graphic());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_previous_chart() {
        let source = Arc::new(FakeSource::new(Response::Series(vec![temp(vec![Some(1.0)])])));
        let view = view(source.clone(), Arc::new(MemoryFieldStore::default()));
        view.refresh("LOG-0001").await;

        source.set(Response::Failure);
        let outcome = view.refresh("LOG-0001").await;
        assert!(outcome.snapshot_enabled);
        assert!(view.container(ChartSlot::Primary).has_graphic());
    }

    #[tokio::test]
    async fn test_backend_failure_reports_drawn_charts() {
        let source = Arc::new(FakeSource::new(Response::Series(vec![temp(vec![Some(1.0)])])));
        let view = view(source.clone(), Arc::new(MemoryFieldStore::default()));
        let first = view.refresh("LOG-0001").await;

        source.set(Response::Failure);
        let outcome = view.refresh("LOG-0001").await;
        assert_eq!(outcome.charts, first.charts);
        assert!(outcome.charts.primary.is_some());
    }

    #[tokio::test]
    async fn test_render_failure_keeps_previous_spec() {
        let source = Arc::new(FakeSource::new(Response::Series(vec![temp(vec![Some(1.0)])])));
        let store = Arc::new(MemoryFieldStore::default());
        let capture = capture_with(store, Arc::new(RecordingNotifier::default()));
        let failing = Arc::new(FailingRenderer::default());
        let view = RecordView::new(
            source.clone(),
            ChartDatasetBuilder::default(),
            failing.clone(),
            Arc::new(capture),
            ChartContainer::new(PRIMARY_CONTAINER),
            ChartContainer::new(SECONDARY_CONTAINER),
        );
        let first = view.refresh("LOG-0001").await;

        failing.fail.store(true, Ordering::SeqCst);
        source.set(Response::Series(vec![temp(vec![Some(5.0), Some(7.0)])]));
        let outcome = view.refresh("LOG-0001").await;
        assert_eq!(outcome.charts.primary, first.charts.primary);
        assert!(view.container(ChartSlot::Primary).has_graphic());
    }

    #[tokio::test]
    async fn test_capture_all_skips_empty_slots() {
        let store = Arc::new(MemoryFieldStore::default());
        let source = Arc::new(FakeSource::new(Response::Series(vec![
            temp(vec![Some(1.0)]),
            temp(vec![None]),
        ])));
        let view = view(source, store.clone());
        view.refresh("LOG-0001").await;

        let report = view.capture_all("LOG-0001").await;
        assert_eq!(
            report.primary,
            SlotOutcome::Saved {
                field: "main_pic".to_string()
            }
        );
        assert_eq!(report.secondary, SlotOutcome::Skipped);
        assert_eq!(store.values.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_capture_all_runs_both_slots() {
        let store = Arc::new(MemoryFieldStore::default());
        let source = Arc::new(FakeSource::new(Response::Series(vec![
            temp(vec![Some(1.0)]),
            temp(vec![Some(3.0)]),
        ])));
        let view = view(source, store.clone());
        view.refresh("LOG-0001").await;

        let report = view.capture_all("LOG-0001").await;
        assert!(matches!(report.primary, SlotOutcome::Saved { .. }));
        assert!(matches!(report.secondary, SlotOutcome::Saved { .. }));

        let mut fields: Vec<String> = store.values.lock().unwrap().iter().map(|v| v.1.clone()).collect();
        fields.sort();
        assert_eq!(fields, vec!["main_pic", "second_pic"]);
    }
}
