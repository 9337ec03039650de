//! Typed helpers for session and shopping state kept in the key-value store.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::kv::KvStore;
use crate::config::StorageKeys;

/// Maximum number of remembered search keywords.
pub const SEARCH_HISTORY_LIMIT: usize = 10;

/// Login token and user profile.
#[derive(Clone)]
pub struct UserSession {
    store: KvStore,
    token_key: String,
    user_info_key: String,
}

impl UserSession {
    pub fn new(store: KvStore, keys: &StorageKeys) -> Self {
        Self { store, token_key: keys.token.clone(), user_info_key: keys.user_info.clone() }
    }

    pub async fn set_token(&self, token: &str) {
        self.store.set(&self.token_key, token, None).await;
    }

    pub async fn token(&self) -> Option<String> {
        self.store
            .get::<String>(&self.token_key)
            .await
            .filter(|token| !token.is_empty())
    }

    pub async fn remove_token(&self) {
        self.store.remove(&self.token_key).await;
    }

    pub async fn set_user_info<T: Serialize>(&self, info: &T) {
        self.store.set(&self.user_info_key, info, None).await;
    }

    pub async fn user_info<T: DeserializeOwned>(&self) -> Option<T> {
        self.store.get(&self.user_info_key).await
    }

    pub async fn remove_user_info(&self) {
        self.store.remove(&self.user_info_key).await;
    }

    /// Drop both the token and the cached profile.
    pub async fn clear(&self) {
        self.remove_token().await;
        self.remove_user_info().await;
    }

    pub async fn is_logged_in(&self) -> bool {
        self.token().await.is_some()
    }
}

/// Badge count for the cart tab.
#[derive(Clone)]
pub struct CartCounter {
    store: KvStore,
    key: String,
}

impl CartCounter {
    pub fn new(store: KvStore, keys: &StorageKeys) -> Self {
        Self { store, key: keys.cart_count.clone() }
    }

    pub async fn count(&self) -> u32 {
        self.store.get_or(&self.key, 0u32).await
    }

    pub async fn set(&self, count: u32) {
        self.store.set(&self.key, &count, None).await;
    }

    pub async fn increase(&self, by: u32) {
        let count = self.count().await;
        self.set(count.saturating_add(by)).await;
    }

    pub async fn decrease(&self, by: u32) {
        let count = self.count().await;
        self.set(count.saturating_sub(by)).await;
    }
}

/// Most-recent-first search keywords, deduplicated.
#[derive(Clone)]
pub struct SearchHistory {
    store: KvStore,
    key: String,
}

impl SearchHistory {
    pub fn new(store: KvStore, keys: &StorageKeys) -> Self {
        Self { store, key: keys.search_history.clone() }
    }

    pub async fn list(&self) -> Vec<String> {
        self.store.get_or(&self.key, Vec::new()).await
    }

    /// Move `keyword` to the front, keeping at most [`SEARCH_HISTORY_LIMIT`] entries.
    pub async fn add(&self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }

        let mut history: Vec<String> = self
            .list()
            .await
            .into_iter()
            .filter(|item| item != keyword)
            .collect();
        history.insert(0, keyword.to_string());
        history.truncate(SEARCH_HISTORY_LIMIT);

        self.store.set(&self.key, &history, None).await;
    }

    pub async fn remove(&self, keyword: &str) {
        let history: Vec<String> = self
            .list()
            .await
            .into_iter()
            .filter(|item| item != keyword)
            .collect();
        self.store.set(&self.key, &history, None).await;
    }

    pub async fn clear(&self) {
        self.store.remove(&self.key).await;
    }
}
