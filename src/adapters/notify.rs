use crate::domain::ports::{NotificationLevel, Notifier};
use std::sync::{Arc, Mutex};

/// 命令列使用：成功訊息寫到 stdout，錯誤寫到 stderr
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => {
                tracing::debug!("notification: {}", message);
                println!("✅ {}", message);
            }
            NotificationLevel::Error => {
                tracing::debug!("error notification: {}", message);
                eprintln!("❌ {}", message);
            }
        }
    }
}

/// Keeps every notification so tests can inspect them. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: Arc<Mutex<Vec<(NotificationLevel, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(NotificationLevel, String)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<(NotificationLevel, String)> {
        self.notifications().pop()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.notifications()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push((level, message.to_string()));
        }
    }
}
