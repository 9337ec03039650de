//! Fixed-key caches for shop data and API results.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::LayeredCache;
use super::entry::{CacheOptions, CacheStrategy};

const USER_INFO_KEY: &str = "user_info";
const CART_DATA_KEY: &str = "cart_data";
const SEARCH_HISTORY_KEY: &str = "search_history";
const BROWSE_HISTORY_KEY: &str = "browse_history";

/// Lifetime of the cached user profile.
pub const USER_INFO_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Namespace for API result keys in the memory tier.
pub const API_PREFIX: &str = "api_";

/// Default lifetime of an API result.
pub const DEFAULT_API_TTL: Duration = Duration::from_secs(5 * 60);

/// Business data: profile, cart snapshot, search and browse history.
#[derive(Clone)]
pub struct DataCache {
    cache: LayeredCache,
}

impl DataCache {
    pub fn new(cache: LayeredCache) -> Self {
        Self { cache }
    }

    fn user_options() -> CacheOptions {
        CacheOptions::new(USER_INFO_KEY).expire(USER_INFO_TTL)
    }

    fn storage_options(key: &str) -> CacheOptions {
        CacheOptions::new(key).strategy(CacheStrategy::StorageOnly)
    }

    pub async fn set_user<T: Serialize>(&self, user: &T) {
        self.cache.set(&Self::user_options(), user).await;
    }

    pub async fn user<T: DeserializeOwned>(&self) -> Option<T> {
        self.cache.get(&Self::user_options()).await
    }

    pub async fn remove_user(&self) {
        self.cache.remove(USER_INFO_KEY, CacheStrategy::Both).await;
    }

    pub async fn set_cart<T: Serialize>(&self, cart: &T) {
        self.cache.set(&Self::storage_options(CART_DATA_KEY), cart).await;
    }

    pub async fn cart<T: DeserializeOwned>(&self) -> Option<T> {
        self.cache.get(&Self::storage_options(CART_DATA_KEY)).await
    }

    pub async fn remove_cart(&self) {
        self.cache.remove(CART_DATA_KEY, CacheStrategy::StorageOnly).await;
    }

    pub async fn set_search_history(&self, keywords: &[String]) {
        self.cache.set(&Self::storage_options(SEARCH_HISTORY_KEY), keywords).await;
    }

    pub async fn search_history(&self) -> Vec<String> {
        self.cache
            .get_or(&Self::storage_options(SEARCH_HISTORY_KEY), Vec::new())
            .await
    }

    pub async fn remove_search_history(&self) {
        self.cache.remove(SEARCH_HISTORY_KEY, CacheStrategy::StorageOnly).await;
    }

    pub async fn set_browse_history<T: Serialize>(&self, items: &[T]) {
        self.cache.set(&Self::storage_options(BROWSE_HISTORY_KEY), items).await;
    }

    pub async fn browse_history<T: DeserializeOwned>(&self) -> Vec<T> {
        self.cache
            .get_or(&Self::storage_options(BROWSE_HISTORY_KEY), Vec::new())
            .await
    }

    pub async fn remove_browse_history(&self) {
        self.cache.remove(BROWSE_HISTORY_KEY, CacheStrategy::StorageOnly).await;
    }
}

/// Memory-only cache for request results, keyed under [`API_PREFIX`].
#[derive(Clone)]
pub struct ApiCache {
    cache: LayeredCache,
    ttl: Duration,
}

impl ApiCache {
    pub fn new(cache: LayeredCache) -> Self {
        Self::with_ttl(cache, DEFAULT_API_TTL)
    }

    pub fn with_ttl(cache: LayeredCache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    fn options(key: &str) -> CacheOptions {
        CacheOptions::new(format!("{API_PREFIX}{key}")).strategy(CacheStrategy::MemoryOnly)
    }

    /// Cache `value` for `expire`, or the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, expire: Option<Duration>) {
        let options = Self::options(key).expire(expire.unwrap_or(self.ttl));
        self.cache.set(&options, value).await;
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.get(&Self::options(key)).await
    }

    pub async fn remove(&self, key: &str) {
        self.cache
            .remove(&format!("{API_PREFIX}{key}"), CacheStrategy::MemoryOnly)
            .await;
    }

    /// Drop every API result; other memory entries survive.
    pub async fn clear(&self) {
        let removed = self.cache.remove_memory_prefix(API_PREFIX).await;
        tracing::debug!(removed, "api cache cleared");
    }
}
