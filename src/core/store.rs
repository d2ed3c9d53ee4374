//! Typed value persisted under a single key of a [`KeyValueStore`].
//!
//! Reads never fail: unreadable or corrupt data falls back to the caller's
//! default. Writes update memory first; a failed persist is logged and the
//! in-memory value is kept, so memory and storage may diverge until the next
//! successful write.

use crate::domain::ports::{KeyValueStore, StorageEvent, WriterId};
use crate::utils::error::{DirectoryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Upgrade applied to the raw JSON before it is decoded.
pub type Migration = fn(Value) -> Value;

/// Turns parsed (and migrated) JSON into `T`.
pub type Decoder<T> = fn(&str, Value) -> Result<Decoded<T>>;

/// A decoded value plus the array records that could not be read as `T`.
/// Retained records are appended back unchanged on every save.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub retained: Vec<Value>,
}

static NEXT_WRITER: AtomicU64 = AtomicU64::new(1);

/// Adds `mode: "full"` to every license record stored before the field existed.
pub fn migrate_licenses(data: Value) -> Value {
    match data {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(mut record) => {
                        let missing = record.get("mode").map_or(true, Value::is_null);
                        if missing {
                            record.insert("mode".to_string(), Value::String("full".to_string()));
                        }
                        Value::Object(record)
                    }
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Decodes the whole value at once; any mismatch is a read error.
pub fn decode_whole<T: DeserializeOwned>(key: &str, data: Value) -> Result<Decoded<T>> {
    let value = serde_json::from_value(data).map_err(|e| DirectoryError::StorageReadError {
        key: key.to_string(),
        message: format!("unexpected shape: {}", e),
    })?;
    Ok(Decoded {
        value,
        retained: Vec::new(),
    })
}

/// Decodes an array record by record. Records that do not fit `R` are kept
/// aside as raw JSON instead of discarding the whole collection.
pub fn decode_records<R: DeserializeOwned>(key: &str, data: Value) -> Result<Decoded<Vec<R>>> {
    let Value::Array(items) = data else {
        return Err(DirectoryError::StorageReadError {
            key: key.to_string(),
            message: "expected an array of records".to_string(),
        });
    };

    let mut value = Vec::with_capacity(items.len());
    let mut retained = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match R::deserialize(&item) {
            Ok(record) => value.push(record),
            Err(e) => {
                tracing::warn!(
                    "Keeping unreadable record {} of \"{}\" as-is: {}",
                    index,
                    key,
                    e
                );
                retained.push(item);
            }
        }
    }
    Ok(Decoded { value, retained })
}

fn parse<T>(
    key: &str,
    raw: &str,
    migrate: Option<Migration>,
    decoder: Decoder<T>,
) -> Result<Decoded<T>> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| DirectoryError::StorageReadError {
        key: key.to_string(),
        message: format!("invalid JSON: {}", e),
    })?;
    let migrated = match migrate {
        Some(migrate) => migrate(parsed),
        None => parsed,
    };
    decoder(key, migrated)
}

fn encode<T: Serialize>(value: &T, retained: &[Value]) -> Result<String> {
    if retained.is_empty() {
        return Ok(serde_json::to_string(value)?);
    }
    let mut data = serde_json::to_value(value)?;
    if let Value::Array(items) = &mut data {
        items.extend(retained.iter().cloned());
    }
    Ok(serde_json::to_string(&data)?)
}

/// Reads `key`, falling back to `default` when absent or unreadable.
/// With a migration, the migrated value is written back immediately.
pub fn load<T, S>(backend: &S, key: &str, default: T, migrate: Option<Migration>) -> T
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore,
{
    load_with(backend, key, default, migrate, decode_whole::<T>, None).value
}

fn load_with<T, S>(
    backend: &S,
    key: &str,
    default: T,
    migrate: Option<Migration>,
    decoder: Decoder<T>,
    origin: Option<WriterId>,
) -> Decoded<T>
where
    T: Serialize,
    S: KeyValueStore,
{
    let fallback = |value: T| Decoded {
        value,
        retained: Vec::new(),
    };
    let raw = match backend.get(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return fallback(default),
        Err(e) => {
            tracing::error!("Error reading storage key \"{}\": {}", key, e);
            return fallback(default);
        }
    };

    match parse(key, &raw, migrate, decoder) {
        Ok(decoded) => {
            if migrate.is_some() {
                let written = encode(&decoded.value, &decoded.retained)
                    .and_then(|text| backend.write(key, &text, origin));
                if let Err(e) = written {
                    tracing::warn!("Could not write back migrated value for \"{}\": {}", key, e);
                }
            }
            decoded
        }
        Err(e) => {
            tracing::error!("Error reading storage key \"{}\": {}", key, e);
            fallback(default)
        }
    }
}

pub fn save<T, S>(backend: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore,
{
    backend.set(key, &encode(value, &[])?)
}

pub struct PersistentStore<T, S: KeyValueStore> {
    backend: S,
    key: String,
    value: T,
    retained: Vec<Value>,
    migrate: Option<Migration>,
    decoder: Decoder<T>,
    origin: WriterId,
    changes: broadcast::Receiver<StorageEvent>,
}

impl<T, S> PersistentStore<T, S>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore,
{
    pub fn open(backend: S, key: &str, default: T, migrate: Option<Migration>) -> Self {
        Self::open_with(backend, key, default, migrate, decode_whole::<T>)
    }

    pub fn open_with(
        backend: S,
        key: &str,
        default: T,
        migrate: Option<Migration>,
        decoder: Decoder<T>,
    ) -> Self {
        let origin = NEXT_WRITER.fetch_add(1, Ordering::Relaxed);
        let changes = backend.subscribe();
        let decoded = load_with(&backend, key, default, migrate, decoder, Some(origin));
        Self {
            backend,
            key: key.to_string(),
            value: decoded.value,
            retained: decoded.retained,
            migrate,
            decoder,
            origin,
            changes,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Stored records that could not be decoded; they are written back untouched.
    pub fn retained(&self) -> &[Value] {
        &self.retained
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Replaces the in-memory value with `updater(current)` and persists it.
    /// Returns whether the write reached storage; memory is updated either way.
    pub fn set<F>(&mut self, updater: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        self.value = updater(&self.value);
        let written = encode(&self.value, &self.retained)
            .and_then(|text| self.backend.write(&self.key, &text, Some(self.origin)));
        match written {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Error setting storage key \"{}\": {} (in-memory value kept)",
                    self.key,
                    e
                );
                false
            }
        }
    }

    /// Applies pending changes made by other writers to this key. Each change
    /// replaces the in-memory value wholesale; this store's own writes are
    /// skipped. Returns how many changes were applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.changes.try_recv() {
                Ok(event) => {
                    if event.key != self.key || event.origin == Some(self.origin) {
                        continue;
                    }
                    // 刪除事件不處理
                    let Some(raw) = event.new_value else {
                        continue;
                    };
                    match parse(&self.key, &raw, self.migrate, self.decoder) {
                        Ok(decoded) => {
                            self.value = decoded.value;
                            self.retained = decoded.retained;
                            applied += 1;
                        }
                        Err(e) => {
                            tracing::error!(
                                "Error parsing storage change for key \"{}\": {}",
                                self.key,
                                e
                            );
                        }
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Missed {} storage changes for \"{}\", reloading",
                        skipped,
                        self.key
                    );
                    if self.reload() {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        applied
    }

    fn reload(&mut self) -> bool {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("Error reloading storage key \"{}\": {}", self.key, e);
                return false;
            }
        };
        match parse(&self.key, &raw, self.migrate, self.decoder) {
            Ok(decoded) => {
                self.value = decoded.value;
                self.retained = decoded.retained;
                true
            }
            Err(e) => {
                tracing::error!("Error reloading storage key \"{}\": {}", self.key, e);
                false
            }
        }
    }
}
