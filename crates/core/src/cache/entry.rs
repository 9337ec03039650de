//! Cache entry encoding and per-call options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which tiers a cache operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    #[serde(rename = "memory")]
    MemoryOnly,
    #[serde(rename = "storage")]
    StorageOnly,
    #[default]
    Both,
}

impl CacheStrategy {
    pub fn uses_memory(self) -> bool {
        matches!(self, CacheStrategy::MemoryOnly | CacheStrategy::Both)
    }

    pub fn uses_storage(self) -> bool {
        matches!(self, CacheStrategy::StorageOnly | CacheStrategy::Both)
    }
}

/// A cached value with its expiry (epoch ms) and version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl<T> CacheEntry<T> {
    /// Valid when not expired at `now` and, if `version` is given, tagged with it.
    pub fn is_valid(&self, now: i64, version: Option<&str>) -> bool {
        if self.expire_at.is_some_and(|at| at <= now) {
            return false;
        }
        match version {
            Some(wanted) => self.version.as_deref() == Some(wanted),
            None => true,
        }
    }
}

/// Options for a single cache operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    pub key: String,
    pub strategy: CacheStrategy,
    /// Lifetime; `None` uses the storage default.
    pub expire: Option<Duration>,
    /// Version tag; `None` uses the cache's configured version.
    pub version: Option<String>,
}

impl CacheOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), strategy: CacheStrategy::default(), expire: None, version: None }
    }

    pub fn strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
