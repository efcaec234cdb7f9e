// Source trait for the sensor series of a device-log record
use crate::domain::sensor::SensorSeries;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Empty or non-list response. Not shown to the user.
    #[error("no sensor data for record")]
    NoData,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Fetch the sensor series of a record, ordered by priority (index 0 is primary).
    async fn fetch_series(&self, record: &str) -> Result<Vec<SensorSeries>, SourceError>;
}
