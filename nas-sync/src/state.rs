//! Persistence of the last successful sync time

use crate::error::{NasError, NasResult};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Key the last-sync timestamp is stored under
pub const LAST_SYNC_KEY: &str = "nas_last_sync";

/// String key-value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> NasResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> NasResult<()>;
}

/// Key-value table inside a SQLite database
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn new(conn: Connection) -> NasResult<Self> {
        init_kv_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> NasResult<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> NasResult<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> NasResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NasError::Storage("connection lock poisoned".to_string()))
    }
}

/// Creates the `kv_store` table if it does not exist yet
pub fn init_kv_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> NasResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> NasResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process store, lost when the process exits
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> NasResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| NasError::Storage("store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> NasResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| NasError::Storage("store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the last-sync timestamp. Storage errors are logged,
/// never returned.
#[derive(Clone)]
pub struct SyncStateStore {
    store: Arc<dyn KeyValueStore>,
}

impl SyncStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get_last_sync_time(&self) -> Option<DateTime<Utc>> {
        match self.store.get(LAST_SYNC_KEY) {
            Ok(Some(raw)) => {
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() {
                    log::warn!("Ignoring malformed last sync value {:?}", raw);
                }
                parsed
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Reading last sync time failed: {}", e);
                None
            }
        }
    }

    pub fn set_last_sync_time(&self, timestamp: DateTime<Utc>) {
        let value = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        if let Err(e) = self.store.set(LAST_SYNC_KEY, &value) {
            log::warn!("Storing last sync time failed: {}", e);
        }
    }
}

/// RFC 3339 or epoch milliseconds
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}
