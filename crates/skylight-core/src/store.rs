//! The persistent key-value store every context converges through.
//!
//! Values are JSON, one row per key, in a single SQLite table. Writes are
//! batched per call; a change event carrying only the keys whose values
//! actually changed goes out on a broadcast channel after each write.
//! Subscribers re-read full state on every event, so a lagged receiver
//! only delays convergence until the next write.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::location::{resolve_active, ActiveLocation, LocationRecord};
use crate::settings::{Settings, WidgetPosition};

/// Store keys, as persisted on the wire.
pub mod keys {
    pub const WIDGET_ENABLED: &str = "widgetEnabled";
    pub const TIME_ENABLED: &str = "timeEnabled";
    pub const IS_CELSIUS: &str = "isCelsius";
    pub const WIDGET_ANCHOR: &str = "widgetPosition";
    pub const TRANSPARENCY: &str = "transparency";
    pub const WEATHER_POSITION: &str = "weatherPosition";
    pub const TIME_POSITION: &str = "timePosition";
    pub const LAST_LOCATION: &str = "lastLocation";
    pub const CUSTOM_LOCATION: &str = "customLocation";
    pub const LAST_WEATHER_DATA: &str = "lastWeatherData";

    /// Keys that affect the active location.
    pub const LOCATION_KEYS: [&str; 2] = [LAST_LOCATION, CUSTOM_LOCATION];
}

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One key whose stored value changed.
#[derive(Debug, Clone)]
pub struct KeyChange {
    pub key: String,
    pub old: Option<Value>,
    pub new: Value,
}

/// A batch of changes from a single `set` call.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub changes: Vec<KeyChange>,
}

impl StoreEvent {
    pub fn touches(&self, key: &str) -> bool {
        self.changes.iter().any(|c| c.key == key)
    }

    pub fn touches_any(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|k| self.touches(k))
    }
}

/// Key-value store with change notifications, shared via `Arc` across
/// contexts. The SQLite handle sits behind a mutex; every operation takes
/// the lock briefly and never holds it across an await point.
pub struct SyncStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl SyncStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// An in-memory store, for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            events,
        })
    }

    /// Subscribe to change events. Every `set` that modifies at least one
    /// value produces one event.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Batch read. Absent keys are simply missing from the result map.
    pub fn get(&self, wanted: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut out = HashMap::with_capacity(wanted.len());
        for key in wanted {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            if let Some(raw) = raw {
                let value =
                    serde_json::from_str(&raw).map_err(|e| StoreError::MalformedValue {
                        key: (*key).to_string(),
                        message: e.to_string(),
                    })?;
                out.insert((*key).to_string(), value);
            }
        }
        Ok(out)
    }

    /// Read a single key.
    pub fn get_one(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(&[key])?.remove(key))
    }

    /// Batch write. All entries land in one transaction; one event goes
    /// out afterwards carrying the subset of keys whose values actually
    /// changed. A write that leaves every value as-is is silent.
    pub fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut changes = Vec::new();
        {
            let mut conn = self.conn.lock();
            let tx = conn
                .transaction()
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            for (key, new) in entries {
                let old: Option<String> = tx
                    .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
                let old: Option<Value> = match old {
                    Some(raw) => serde_json::from_str(&raw).ok(),
                    None => None,
                };
                if old.as_ref() == Some(&new) {
                    continue;
                }
                let raw = serde_json::to_string(&new)
                    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
                tx.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, raw],
                )
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
                changes.push(KeyChange { key, old, new });
            }
            tx.commit()
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        if !changes.is_empty() {
            // No subscribers is fine; the store stays the source of truth.
            let _ = self.events.send(StoreEvent { changes });
        }
        Ok(())
    }

    /// Write a single key.
    pub fn set_one(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set(vec![(key.to_string(), value)])
    }

    // ---- typed accessors -------------------------------------------------

    /// Current settings, re-derived from full persisted state with
    /// per-field defaulting.
    pub fn settings(&self) -> Result<Settings, StoreError> {
        let values = self.get(&Settings::store_keys())?;
        Ok(Settings::from_values(&values))
    }

    /// Replicate the full settings object into its per-field keys.
    pub fn set_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.set(settings.to_entries())
    }

    pub fn last_location(&self) -> Result<Option<LocationRecord>, StoreError> {
        self.location_at(keys::LAST_LOCATION)
    }

    pub fn custom_location(&self) -> Result<Option<LocationRecord>, StoreError> {
        self.location_at(keys::CUSTOM_LOCATION)
    }

    fn location_at(&self, key: &str) -> Result<Option<LocationRecord>, StoreError> {
        let Some(value) = self.get_one(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // A damaged record degrades to "absent" rather than wedging
                // every consumer of the precedence chain.
                tracing::warn!("Ignoring malformed {} record: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Active location with the custom > last > default precedence.
    pub fn active_location(&self) -> Result<ActiveLocation, StoreError> {
        let custom = self.custom_location()?;
        let last = self.last_location()?;
        Ok(resolve_active(custom.as_ref(), last.as_ref()))
    }

    /// Stored location only — `None` when neither variant is present.
    /// The background refresher uses this to skip ticks instead of
    /// inventing the default location.
    pub fn stored_location(&self) -> Result<Option<ActiveLocation>, StoreError> {
        let custom = self.custom_location()?;
        let last = self.last_location()?;
        if custom.is_none() && last.is_none() {
            return Ok(None);
        }
        Ok(Some(resolve_active(custom.as_ref(), last.as_ref())))
    }

    /// Persisted widget offset under `key`, if a drag ever completed.
    pub fn widget_position(&self, key: &str) -> Result<Option<WidgetPosition>, StoreError> {
        let Some(value) = self.get_one(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(pos) => Ok(Some(pos)),
            Err(e) => {
                tracing::warn!("Ignoring malformed {} record: {}", key, e);
                Ok(None)
            }
        }
    }

    pub fn set_widget_position(
        &self,
        key: &str,
        position: WidgetPosition,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(position)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        self.set_one(key, value)
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore").finish_non_exhaustive()
    }
}
