use crate::domain::ports::{KeyValueStore, StorageEvent, WriterId};
use crate::utils::error::{DirectoryError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// In-process key-value store. Clones share the same entries and change feed,
/// so each clone behaves like another open view of the same storage.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    events: broadcast::Sender<StorageEvent>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
            quota_bytes: None,
        }
    }

    /// 模擬瀏覽器的容量上限（所有 key 與 value 的總位元組數）
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// 直接寫入原始文字，不發送變更通知
    pub fn seed(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock(key)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn lock(&self, key: &str) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| DirectoryError::StorageWriteError {
                key: key.to_string(),
                message: format!("storage lock poisoned: {}", e),
            })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| DirectoryError::StorageReadError {
                key: key.to_string(),
                message: format!("storage lock poisoned: {}", e),
            })?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str, origin: Option<WriterId>) -> Result<()> {
        {
            let mut entries = self.lock(key)?;

            if let Some(quota) = self.quota_bytes {
                let others: usize = entries
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let required = others + key.len() + value.len();
                if required > quota {
                    return Err(DirectoryError::QuotaExceededError {
                        key: key.to_string(),
                        required,
                        quota,
                    });
                }
            }

            entries.insert(key.to_string(), value.to_string());
        }

        // 沒有訂閱者時 send 會失敗，可忽略
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

/// File-backed store: one `<key>.json` file per key under `base_path`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
    events: broadcast::Sender<StorageEvent>,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            base_path: base_path.into(),
            events,
            quota_bytes: None,
        }
    }

    /// 單一 key 的大小上限
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DirectoryError::StorageReadError {
                key: key.to_string(),
                message: format!("{}: {}", path.display(), e),
            }),
        }
    }

    fn write(&self, key: &str, value: &str, origin: Option<WriterId>) -> Result<()> {
        if let Some(quota) = self.quota_bytes {
            let required = key.len() + value.len();
            if required > quota {
                return Err(DirectoryError::QuotaExceededError {
                    key: key.to_string(),
                    required,
                    quota,
                });
            }
        }

        let path = self.path_for(key);
        let write_err = |e: std::io::Error| DirectoryError::StorageWriteError {
            key: key.to_string(),
            message: format!("{}: {}", path.display(), e),
        };

        fs::create_dir_all(&self.base_path).map_err(write_err)?;

        // 先寫暫存檔再改名，避免寫到一半留下損毀的檔案
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(write_err)?;
        fs::rename(&tmp_path, &path).map_err(write_err)?;

        tracing::debug!("Persisted key '{}' to {}", key, path.display());

        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
