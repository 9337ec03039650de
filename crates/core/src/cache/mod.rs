//! Two-tier cache over a process-local map and the persistent key-value store.
//!
//! - Strategy selects the tiers (`memory`, `storage`, `both`)
//! - Both tiers share one absolute expiry and version tag per write
//! - Invalid entries are evicted lazily on the read that finds them
//! - Domain wrappers (`DataCache`, `ApiCache`) fix keys and strategies

pub mod domain;
pub mod entry;
pub mod hash;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::storage::KvStore;
use crate::storage::kv::{expire_at_from_now, now_millis};

pub use domain::{ApiCache, DataCache};
pub use entry::{CacheEntry, CacheOptions, CacheStrategy};
pub use hash::fingerprint;

/// Version tag applied when neither the options nor the configuration name one.
pub const DEFAULT_CACHE_VERSION: &str = "1.0.0";

/// Memory + storage cache. Clones share the memory tier.
#[derive(Clone)]
pub struct LayeredCache {
    memory: Arc<RwLock<HashMap<String, CacheEntry<Value>>>>,
    store: KvStore,
    version: String,
}

impl LayeredCache {
    pub fn new(store: KvStore) -> Self {
        Self::with_version(store, DEFAULT_CACHE_VERSION)
    }

    pub fn with_version(store: KvStore, version: impl Into<String>) -> Self {
        Self { memory: Arc::new(RwLock::new(HashMap::new())), store, version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    fn effective_version<'a>(&'a self, options: &'a CacheOptions) -> &'a str {
        options.version.as_deref().unwrap_or(&self.version)
    }

    /// Write `value` to the tiers named by `options.strategy`.
    pub async fn set<T: Serialize + ?Sized>(&self, options: &CacheOptions, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(key = %options.key, error = %e, "cache value not serializable");
                return;
            }
        };

        let expire = options.expire.unwrap_or(self.store.default_expire());
        let expire_at = expire_at_from_now(expire);
        let entry = CacheEntry {
            data,
            expire_at: Some(expire_at),
            version: Some(self.effective_version(options).to_string()),
        };

        if options.strategy.uses_storage() {
            self.store.set_until(&options.key, &entry, expire_at).await;
        }
        if options.strategy.uses_memory() {
            self.memory.write().await.insert(options.key.clone(), entry);
        }
    }

    /// Read from memory first, then storage. Misses never error.
    pub async fn get<T: DeserializeOwned>(&self, options: &CacheOptions) -> Option<T> {
        let version = self.effective_version(options);
        let key = options.key.as_str();

        if options.strategy.uses_memory()
            && let Some(data) = self.memory_lookup(key, version).await
        {
            match serde_json::from_value(data) {
                Ok(value) => return Some(value),
                Err(e) => tracing::debug!(key, error = %e, "memory entry has unexpected shape"),
            }
        }

        if options.strategy.uses_storage() {
            match self.store.get::<CacheEntry<Value>>(key).await {
                Some(entry) if entry.is_valid(now_millis(), Some(version)) => {
                    let data = entry.data.clone();
                    if options.strategy == CacheStrategy::Both {
                        self.memory.write().await.insert(key.to_string(), entry);
                    }
                    match serde_json::from_value(data) {
                        Ok(value) => return Some(value),
                        Err(e) => tracing::debug!(key, error = %e, "storage entry has unexpected shape"),
                    }
                }
                Some(_) => {
                    tracing::debug!(key, "storage entry stale, evicting");
                    self.store.remove(key).await;
                }
                None => {
                    if self.store.contains(key).await {
                        tracing::debug!(key, "storage entry unreadable, evicting");
                        self.store.remove(key).await;
                    }
                }
            }
        }

        None
    }

    /// Read with a fallback for misses.
    pub async fn get_or<T: DeserializeOwned>(&self, options: &CacheOptions, default: T) -> T {
        self.get(options).await.unwrap_or(default)
    }

    async fn memory_lookup(&self, key: &str, version: &str) -> Option<Value> {
        let now = now_millis();
        {
            let memory = self.memory.read().await;
            match memory.get(key) {
                Some(entry) if entry.is_valid(now, Some(version)) => return Some(entry.data.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut memory = self.memory.write().await;
        // Re-check under the write lock; a concurrent set may have refreshed it.
        if memory.get(key).is_some_and(|entry| !entry.is_valid(now, Some(version))) {
            tracing::debug!(key, "memory entry stale, evicting");
            memory.remove(key);
        }
        None
    }

    pub async fn remove(&self, key: &str, strategy: CacheStrategy) {
        if strategy.uses_memory() {
            self.memory.write().await.remove(key);
        }
        if strategy.uses_storage() {
            self.store.remove(key).await;
        }
    }

    /// Clear the memory map and/or every key under the store's prefix.
    pub async fn clear(&self, strategy: CacheStrategy) {
        if strategy.uses_memory() {
            self.memory.write().await.clear();
        }
        if strategy.uses_storage() {
            self.store.clear().await;
        }
    }

    /// Drop memory entries whose key starts with `prefix`.
    pub(crate) async fn remove_memory_prefix(&self, prefix: &str) -> usize {
        let mut memory = self.memory.write().await;
        let before = memory.len();
        memory.retain(|key, _| !key.starts_with(prefix));
        before - memory.len()
    }

    /// Keys currently held in the memory tier.
    pub async fn memory_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.memory.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
