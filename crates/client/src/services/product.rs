//! Catalog endpoints.

use serde_json::json;
use shopfront_core::cache::fingerprint;
use shopfront_core::storage::SearchHistory;
use shopfront_core::{ApiCache, DataCache, EventBus, Topic};

use super::types::{Category, PageResult, Product, ProductQuery};
use crate::error::ApiError;
use crate::request::ApiClient;

/// Products kept in the recently viewed list.
pub const BROWSE_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
pub struct ProductService {
    api: ApiClient,
    api_cache: ApiCache,
    history: SearchHistory,
    data: DataCache,
    events: EventBus,
}

impl ProductService {
    pub fn new(
        api: ApiClient,
        api_cache: ApiCache,
        history: SearchHistory,
        data: DataCache,
        events: EventBus,
    ) -> Self {
        Self { api, api_cache, history, data, events }
    }

    pub async fn list(&self, query: &ProductQuery) -> Result<PageResult<Product>, ApiError> {
        self.api.get("/products", query).await
    }

    /// Product detail, served from the API cache while fresh.
    pub async fn detail(&self, id: &str) -> Result<Product, ApiError> {
        let path = format!("/products/{id}");
        let key = fingerprint("GET", &path, &[]);

        let product = match self.api_cache.get::<Product>(&key).await {
            Some(product) => {
                tracing::debug!(id, "product detail cache hit");
                product
            }
            None => {
                let product: Product = self.api.get(&path, &()).await?;
                self.api_cache.set(&key, &product, None).await;
                product
            }
        };

        self.record_view(&product).await;
        self.events.emit(Topic::ProductView, &json!({ "id": product.id }));
        Ok(product)
    }

    /// Recently viewed products, most recent first.
    pub async fn browse_history(&self) -> Vec<Product> {
        self.data.browse_history().await
    }

    async fn record_view(&self, product: &Product) {
        let mut viewed: Vec<Product> = self.data.browse_history().await;
        viewed.retain(|p| p.id != product.id);
        viewed.insert(0, product.clone());
        viewed.truncate(BROWSE_HISTORY_LIMIT);
        self.data.set_browse_history(&viewed).await;
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.api.get("/categories", &()).await
    }

    /// Search; a non-blank keyword is recorded in the search history first.
    pub async fn search(&self, query: &ProductQuery) -> Result<PageResult<Product>, ApiError> {
        if let Some(keyword) = query.page.keyword.as_deref() {
            self.history.add(keyword).await;
        }
        self.api.get("/products/search", query).await
    }

    pub async fn hot(&self, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
        self.api.get("/products/hot", &json!({ "limit": limit })).await
    }

    pub async fn search_history(&self) -> Vec<String> {
        self.history.list().await
    }
}
