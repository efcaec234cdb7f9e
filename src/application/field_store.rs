// Persistence and notification collaborators for chart snapshots
use async_trait::async_trait;

#[async_trait]
pub trait FieldStore: Send + Sync {
    /// Write an image payload into a field of the record.
    async fn set_value(&self, record: &str, field: &str, value: &str) -> anyhow::Result<()>;

    /// Re-read the field so its display reflects the stored value.
    async fn refresh_field(&self, record: &str, field: &str) -> anyhow::Result<()>;
}

/// User-facing notifications raised by snapshot captures.
pub trait Notifier: Send + Sync {
    fn error(&self, title: &str, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, title: &str, message: &str) {
        tracing::error!(title, "{}", message);
    }
}
