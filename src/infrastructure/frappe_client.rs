// Frappe backend adapter - Sensor data source and record field store
use crate::application::field_store::FieldStore;
use crate::application::sensor_source::{SensorSource, SourceError};
use crate::domain::sensor::{LogItem, SensorSeries, series_from_log_items};
use crate::infrastructure::config::{BackendSettings, SourceMode};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Prefix of records that have not been saved yet.
const UNSAVED_PREFIX: &str = "new-";

#[derive(Debug, Clone)]
pub struct FrappeClient {
    host: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    chart_method: String,
    doctype: String,
    source: SourceMode,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MethodResponse {
    #[serde(default)]
    message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    data: Value,
}

#[derive(Debug, Deserialize)]
struct DeviceLogRecord {
    #[serde(default)]
    log_item: Vec<LogItem>,
}

impl FrappeClient {
    pub fn new(settings: &BackendSettings) -> Self {
        Self {
            host: settings.host.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            chart_method: settings.chart_method.clone(),
            doctype: settings.doctype.clone(),
            source: settings.source,
            http: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/api/method/{}", self.host, method)
    }

    fn resource_url(&self, record: &str) -> String {
        format!(
            "{}/api/resource/{}/{}",
            self.host,
            urlencoding::encode(&self.doctype),
            urlencoding::encode(record)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => {
                request.header("Authorization", format!("token {}:{}", key, secret))
            }
            _ => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Backend request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse backend response")
    }

    async fn call_chart_method(&self, record: &str) -> Result<Option<Value>> {
        let url = self.method_url(&self.chart_method);
        tracing::debug!("Calling {} for {}", self.chart_method, record);

        let response: MethodResponse = self
            .send(self.http.post(&url).json(&serde_json::json!({ "doc": record })))
            .await?;
        Ok(response.message)
    }

    async fn get_record(&self, record: &str) -> Result<Value> {
        let url = self.resource_url(record);
        let response: ResourceResponse = self.send(self.http.get(&url)).await?;
        Ok(response.data)
    }
}

/// Sensor series from a chart method `message`.
fn series_from_message(message: Option<Value>) -> Result<Vec<SensorSeries>, SourceError> {
    let Some(Value::Array(items)) = message else {
        return Err(SourceError::NoData);
    };
    if items.is_empty() {
        return Err(SourceError::NoData);
    }

    let series: Vec<SensorSeries> = serde_json::from_value(Value::Array(items))
        .context("Malformed sensor series in chart response")?;
    Ok(series)
}

/// Sensor series grouped from the log items of a device-log record.
fn series_from_record(data: Value) -> Result<Vec<SensorSeries>, SourceError> {
    let record: DeviceLogRecord =
        serde_json::from_value(data).context("Malformed device log record")?;

    let series = series_from_log_items(&record.log_item);
    if series.is_empty() {
        return Err(SourceError::NoData);
    }
    Ok(series)
}

#[async_trait]
impl SensorSource for FrappeClient {
    async fn fetch_series(&self, record: &str) -> Result<Vec<SensorSeries>, SourceError> {
        if record.starts_with(UNSAVED_PREFIX) {
            return Err(SourceError::NoData);
        }

        let series = match self.source {
            SourceMode::Rpc => series_from_message(self.call_chart_method(record).await?)?,
            SourceMode::Record => series_from_record(self.get_record(record).await?)?,
        };

        tracing::debug!("Fetched {} sensor series for {}", series.len(), record);
        Ok(series)
    }
}

#[async_trait]
impl FieldStore for FrappeClient {
    async fn set_value(&self, record: &str, field: &str, value: &str) -> Result<()> {
        let url = self.resource_url(record);
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), Value::String(value.to_string()));

        let _: ResourceResponse = self
            .send(self.http.put(&url).json(&body))
            .await
            .with_context(|| format!("Failed to update {} on {}", field, record))?;
        Ok(())
    }

    async fn refresh_field(&self, record: &str, field: &str) -> Result<()> {
        let data = self.get_record(record).await?;
        let stored = data.get(field).and_then(Value::as_str).unwrap_or_default();
        if stored.is_empty() {
            anyhow::bail!("Field {} of {} is empty after update", field, record);
        }
        tracing::debug!("Field {} of {} holds {} bytes", field, record, stored.len());
        Ok(())
    }
}
