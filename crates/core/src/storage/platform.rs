//! Host key-value storage facility.
//!
//! `PlatformStorage` is the only seam that touches the underlying table.
//! Values are opaque strings; envelopes and prefixes live one layer up in
//! [`KvStore`](super::KvStore).

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_rusqlite::{params, rusqlite};

use super::connection::StorageDb;
use crate::Error;

/// Raw key-value storage provided by the host platform.
#[async_trait]
pub trait PlatformStorage: Send + Sync {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    async fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    async fn remove_item(&self, key: &str) -> Result<(), Error>;

    /// Remove every item, regardless of prefix.
    async fn clear(&self) -> Result<(), Error>;

    async fn list_keys(&self) -> Result<Vec<String>, Error>;
}

/// SQLite-backed storage that survives restarts.
#[derive(Clone, Debug)]
pub struct SqliteStorage {
    db: StorageDb,
}

impl SqliteStorage {
    pub fn new(db: StorageDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlatformStorage for SqliteStorage {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self) -> Result<(), Error> {
        self.db
            .conn
            .call(|conn| -> Result<(), Error> {
                conn.execute("DELETE FROM kv_store", [])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}

/// Process-local storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlatformStorage for MemoryStorage {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        self.items.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.items.write().await.clear();
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}
