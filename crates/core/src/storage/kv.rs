//! Prefixed key-value store with per-entry expiry.
//!
//! Every value is written as a JSON envelope `{"value": .., "expireAt": ..}`
//! under `prefix + key`. Faults never reach the caller: writes become
//! no-ops and reads become misses, with the cause logged.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::platform::PlatformStorage;
use crate::Error;

/// Default key prefix.
pub const DEFAULT_PREFIX: &str = "app_";

/// Default entry lifetime (7 days).
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry `ttl` from now, in epoch milliseconds.
pub fn expire_at_from_now(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

/// On-disk encoding of a stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEnvelope<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
}

impl<T> StorageEnvelope<T> {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }
}

/// Prefixed, expiring key-value store over a [`PlatformStorage`].
#[derive(Clone)]
pub struct KvStore {
    platform: Arc<dyn PlatformStorage>,
    prefix: String,
    default_expire: Duration,
}

impl KvStore {
    /// Create a store with the default prefix and expiry.
    pub fn new(platform: Arc<dyn PlatformStorage>) -> Self {
        Self::with_options(platform, DEFAULT_PREFIX, DEFAULT_EXPIRE)
    }

    pub fn with_options(platform: Arc<dyn PlatformStorage>, prefix: impl Into<String>, default_expire: Duration) -> Self {
        Self { platform, prefix: prefix.into(), default_expire }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_expire(&self) -> Duration {
        self.default_expire
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Store `value` for `expire` (or the default expiry).
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, expire: Option<Duration>) {
        let expire_at = expire_at_from_now(expire.unwrap_or(self.default_expire));
        self.set_until(key, value, expire_at).await;
    }

    /// Store `value` until the absolute epoch-millisecond timestamp `expire_at`.
    pub async fn set_until<T: Serialize + ?Sized>(&self, key: &str, value: &T, expire_at: i64) {
        if let Err(e) = self.try_set(key, value, expire_at).await {
            tracing::error!(key, error = %e, "storage set failed");
        }
    }

    async fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T, expire_at: i64) -> Result<(), Error> {
        let envelope = StorageEnvelope { value, expire_at: Some(expire_at) };
        let encoded = serde_json::to_string(&envelope)?;
        self.platform.set_item(&self.full_key(key), &encoded).await
    }

    /// Read a value; absent, malformed and expired entries are misses.
    ///
    /// Expired entries are removed as part of the read.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage get failed");
                None
            }
        }
    }

    /// Whether an item is stored under `key`, readable or not.
    pub async fn contains(&self, key: &str) -> bool {
        match self.platform.get_item(&self.full_key(key)).await {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                tracing::warn!(key, error = %e, "storage lookup failed");
                false
            }
        }
    }

    /// Read a value, falling back to `default` on a miss.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).await.unwrap_or(default)
    }

    async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let Some(raw) = self.platform.get_item(&self.full_key(key)).await? else {
            return Ok(None);
        };

        let envelope: StorageEnvelope<T> = serde_json::from_str(&raw)?;
        if envelope.is_expired(now_millis()) {
            tracing::debug!(key, "storage entry expired");
            self.remove(key).await;
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.platform.remove_item(&self.full_key(key)).await {
            tracing::error!(key, error = %e, "storage remove failed");
        }
    }

    /// Remove every key under this store's prefix.
    ///
    /// Entries written by other consumers of the same platform storage survive.
    pub async fn clear(&self) {
        if let Err(e) = self.try_clear().await {
            tracing::error!(prefix = %self.prefix, error = %e, "storage clear failed");
        }
    }

    async fn try_clear(&self) -> Result<(), Error> {
        if self.prefix.is_empty() {
            return self.platform.clear().await;
        }
        for key in self.platform.list_keys().await? {
            if key.starts_with(&self.prefix) {
                self.platform.remove_item(&key).await?;
            }
        }
        Ok(())
    }

    /// Keys under this store's prefix, with the prefix stripped.
    pub async fn keys(&self) -> Vec<String> {
        match self.platform.list_keys().await {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "storage keys failed");
                Vec::new()
            }
        }
    }
}
