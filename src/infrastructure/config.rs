use crate::application::dataset_builder::DEFAULT_MAX_SENSORS;
use crate::application::rasterizer::{Dimension, RasterOptions};
use crate::application::snapshot_service::SnapshotSettings;
use crate::domain::statistics::AxisScaling;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub charts: ChartSettings,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Call the chart method, which returns ready-made sensor series.
    #[default]
    Rpc,
    /// Read the record and group its log items locally.
    Record,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_chart_method")]
    pub chart_method: String,
    #[serde(default = "default_doctype")]
    pub doctype: String,
    #[serde(default)]
    pub source: SourceMode,
}

fn default_chart_method() -> String {
    "pibiconnect.pibiconnect.custom.get_chart".to_string()
}

fn default_doctype() -> String {
    "CN Device Log".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub max_sensors: usize,
    pub headroom: f64,
    pub fallback_ceiling: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        let scaling = AxisScaling::default();
        Self {
            max_sensors: DEFAULT_MAX_SENSORS,
            headroom: scaling.headroom,
            fallback_ceiling: scaling.fallback_ceiling,
            width: 800,
            height: 300,
        }
    }
}

impl ChartSettings {
    pub fn scaling(&self) -> AxisScaling {
        AxisScaling {
            headroom: self.headroom,
            fallback_ceiling: self.fallback_ceiling,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    pub settle_ms: u64,
    pub primary_field: String,
    pub secondary_field: String,
    pub mime_type: String,
    pub quality: f32,
    pub width: Dimension,
    pub height: Dimension,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let defaults = SnapshotSettings::default();
        Self {
            settle_ms: defaults.settle.as_millis() as u64,
            primary_field: defaults.primary_field,
            secondary_field: defaults.secondary_field,
            mime_type: defaults.raster.mime_type,
            quality: defaults.raster.quality,
            width: defaults.raster.width,
            height: defaults.raster.height,
        }
    }
}

impl SnapshotConfig {
    pub fn settings(&self) -> SnapshotSettings {
        SnapshotSettings {
            settle: Duration::from_millis(self.settle_ms),
            primary_field: self.primary_field.clone(),
            secondary_field: self.secondary_field.clone(),
            raster: RasterOptions {
                mime_type: self.mime_type.clone(),
                quality: self.quality,
                width: self.width,
                height: self.height,
                ..Default::default()
            },
        }
    }
}

/// Load `config/service` overlaid with `DEVICELOG__*` environment variables.
pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service").required(false))
        .add_source(config::Environment::with_prefix("DEVICELOG").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
