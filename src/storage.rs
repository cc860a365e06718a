use crate::accounts::{CurrentUser, UserRegistry};
use crate::solve::SessionHistory;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const SESSION_KEY: &str = "speedcube_session";
pub const USERS_KEY: &str = "speedcube_users";
pub const CURRENT_USER_KEY: &str = "speedcube_user";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not prepare store location: {0}")]
    Io(#[from] std::io::Error),
}

/// String key to string value store. Every write replaces the whole value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`remove` calls seen so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes += 1;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.writes += 1;
        self.values.remove(key);
        Ok(())
    }
}

/// SQLite backed store holding a single key/value table
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Typed access to the three persisted values. Loads never fail: missing or
/// unreadable data comes back empty.
#[derive(Debug)]
pub struct Storage<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("reading {} failed: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring unreadable {}: {}", key, e);
                None
            }
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)?;
        log::debug!("wrote {} ({} bytes)", key, json.len());
        Ok(())
    }

    pub fn load_session_history(&self) -> SessionHistory {
        self.load(SESSION_KEY).unwrap_or_default()
    }

    pub fn save_session_history(&mut self, history: &SessionHistory) -> Result<(), StoreError> {
        self.save(SESSION_KEY, history)
    }

    pub fn load_user_registry(&self) -> UserRegistry {
        self.load(USERS_KEY).unwrap_or_default()
    }

    pub fn save_user_registry(&mut self, registry: &UserRegistry) -> Result<(), StoreError> {
        self.save(USERS_KEY, registry)
    }

    pub fn load_current_user(&self) -> Option<CurrentUser> {
        self.load(CURRENT_USER_KEY)
    }

    pub fn save_current_user(&mut self, user: &CurrentUser) -> Result<(), StoreError> {
        self.save(CURRENT_USER_KEY, user)
    }

    pub fn clear_current_user(&mut self) -> Result<(), StoreError> {
        self.store.remove(CURRENT_USER_KEY)
    }
}
