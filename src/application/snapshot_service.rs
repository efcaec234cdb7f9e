// Snapshot capture - Rasterizes a rendered chart and stores it on the record
use crate::application::chart_container::ChartContainer;
use crate::application::field_store::{FieldStore, Notifier};
use crate::application::rasterizer::{OutputFormat, RasterError, RasterOptions, VectorRasterizer};
use crate::domain::chart::ChartSlot;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no rendered chart in container {0}")]
    GraphicMissing(String),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("rasterizer did not return a base64 image")]
    NotBase64,
    #[error("failed to store snapshot: {0}")]
    Persist(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    /// Upper bound on the wait for the render-complete signal.
    pub settle: Duration,
    pub primary_field: String,
    pub secondary_field: String,
    pub raster: RasterOptions,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            primary_field: "main_pic".to_string(),
            secondary_field: "second_pic".to_string(),
            raster: RasterOptions {
                quality: 1.0,
                ..Default::default()
            },
        }
    }
}

impl SnapshotSettings {
    pub fn field_for(&self, slot: ChartSlot) -> &str {
        match slot {
            ChartSlot::Primary => &self.primary_field,
            ChartSlot::Secondary => &self.secondary_field,
        }
    }
}

fn slot_caption(slot: ChartSlot) -> &'static str {
    match slot {
        ChartSlot::Primary => "main",
        ChartSlot::Secondary => "second",
    }
}

pub struct SnapshotCapture {
    rasterizer: Arc<VectorRasterizer>,
    field_store: Arc<dyn FieldStore>,
    notifier: Arc<dyn Notifier>,
    settings: SnapshotSettings,
}

impl SnapshotCapture {
    pub fn new(
        rasterizer: Arc<VectorRasterizer>,
        field_store: Arc<dyn FieldStore>,
        notifier: Arc<dyn Notifier>,
        settings: SnapshotSettings,
    ) -> Self {
        Self {
            rasterizer,
            field_store,
            notifier,
            settings,
        }
    }

    /// Capture the chart in `container` into the record field of `slot`.
    ///
    /// Failures are logged and reported through the notifier; nothing is
    /// stored unless the whole conversion succeeded.
    pub async fn capture(
        &self,
        record: &str,
        slot: ChartSlot,
        container: &ChartContainer,
    ) -> Result<String, CaptureError> {
        let field = self.settings.field_for(slot).to_string();

        match self.try_capture(record, &field, container).await {
            Ok(()) => {
                tracing::info!("Stored {} chart snapshot of {} in {}", slot, record, field);
                Ok(field)
            }
            Err(e) => {
                tracing::error!("Snapshot of {} chart for {} failed: {}", slot, record, e);
                self.notifier.error(
                    "Error",
                    &format!(
                        "Failed to convert {} chart to image: {}",
                        slot_caption(slot),
                        e
                    ),
                );
                Err(e)
            }
        }
    }

    async fn try_capture(
        &self,
        record: &str,
        field: &str,
        container: &ChartContainer,
    ) -> Result<(), CaptureError> {
        if !container.wait_settled(self.settings.settle).await {
            tracing::debug!(
                "No render-complete signal from {} within {:?}, capturing anyway",
                container.id(),
                self.settings.settle
            );
        }

        let graphic = container
            .graphic()
            .ok_or_else(|| CaptureError::GraphicMissing(container.id().to_string()))?;

        let options = RasterOptions {
            output_format: OutputFormat::Base64,
            ..self.settings.raster.clone()
        };
        let result = self.rasterizer.rasterize(&graphic, &options).await?;
        let data_uri = result.as_data_uri().ok_or(CaptureError::NotBase64)?;

        self.field_store
            .set_value(record, field, data_uri)
            .await
            .map_err(CaptureError::Persist)?;

        // Stored; a failed refresh only leaves the field display stale
        if let Err(e) = self.field_store.refresh_field(record, field).await {
            tracing::warn!("Stored {} on {} but refreshing it failed: {:#}", field, record, e);
        }

        Ok(())
    }
}
