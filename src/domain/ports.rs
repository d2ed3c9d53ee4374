use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Identifies the view that made a write, so it can skip its own change events.
pub type WriterId = u64;

/// Change notification for a single key, emitted after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: Option<WriterId>,
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`; the resulting change event carries `origin`.
    fn write(&self, key: &str, value: &str, origin: Option<WriterId>) -> Result<()>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, None)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

pub trait Notifier {
    fn notify(&self, level: NotificationLevel, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotificationLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotificationLevel::Error, message);
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// A user-chosen file, read once and asynchronously.
#[async_trait]
pub trait FileSource: Send + Sync {
    fn name(&self) -> &str;
    async fn read_text(&self) -> Result<String>;
}
