//! Cart endpoints and the local cart badge.

use serde_json::{Value, json};
use shopfront_core::storage::CartCounter;
use shopfront_core::{DataCache, EventBus, Topic};

use super::types::{AddToCartParams, CartItem, CartSummary, UpdateCartParams};
use crate::error::ApiError;
use crate::request::ApiClient;

#[derive(Clone)]
pub struct CartService {
    api: ApiClient,
    counter: CartCounter,
    data: DataCache,
    events: EventBus,
}

impl CartService {
    pub fn new(api: ApiClient, counter: CartCounter, data: DataCache, events: EventBus) -> Self {
        Self { api, counter, data, events }
    }

    /// Fetch the cart and refresh the local snapshot and badge.
    pub async fn list(&self) -> Result<CartSummary, ApiError> {
        let summary: CartSummary = self.api.get("/cart", &()).await?;
        self.data.set_cart(&summary).await;
        self.counter.set(summary.total_count).await;
        Ok(summary)
    }

    /// Last fetched cart, without a network call.
    pub async fn cached(&self) -> Option<CartSummary> {
        self.data.cart().await
    }

    pub async fn add(&self, params: &AddToCartParams) -> Result<CartItem, ApiError> {
        let item: CartItem = self.api.post("/cart", params).await?;
        self.counter.increase(params.quantity).await;
        self.emit_item(Topic::CartItemAdd, &item);
        self.emit_update().await;
        Ok(item)
    }

    pub async fn update_item(&self, id: &str, params: &UpdateCartParams) -> Result<CartItem, ApiError> {
        let item: CartItem = self.api.put(&format!("/cart/{id}"), params).await?;
        self.emit_item(Topic::CartItemUpdate, &item);
        self.emit_update().await;
        Ok(item)
    }

    /// Delete an item. The badge drops by the item's quantity when the snapshot
    /// knows it, otherwise it is re-read from the server.
    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete::<Value, _>(&format!("/cart/{id}"), &()).await?;

        let snapshot = self.data.cart::<CartSummary>().await;
        match snapshot.and_then(|summary| without_item(summary, id)) {
            Some((summary, quantity)) => {
                self.data.set_cart(&summary).await;
                self.counter.decrease(quantity).await;
            }
            None => {
                if let Err(e) = self.count().await {
                    tracing::warn!(id, error = %e, "cart count refresh failed after remove");
                }
            }
        }

        self.events.emit(Topic::CartItemRemove, &json!({ "id": id }));
        self.emit_update().await;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ApiError> {
        self.api.delete::<Value, _>("/cart", &()).await?;
        self.counter.set(0).await;
        self.data.remove_cart().await;
        self.emit_update().await;
        Ok(())
    }

    /// Server-side item count; also refreshes the local badge.
    pub async fn count(&self) -> Result<u32, ApiError> {
        let count: u32 = self.api.get("/cart/count", &()).await?;
        self.counter.set(count).await;
        Ok(count)
    }

    /// Local badge count, without a network call.
    pub async fn badge(&self) -> u32 {
        self.counter.count().await
    }

    fn emit_item(&self, topic: Topic, item: &CartItem) {
        match serde_json::to_value(item) {
            Ok(payload) => {
                self.events.emit(topic, &payload);
            }
            Err(e) => tracing::error!(error = %e, "cart item not serializable"),
        }
    }

    async fn emit_update(&self) {
        let count = self.counter.count().await;
        self.events.emit(Topic::CartUpdate, &json!({ "count": count }));
    }
}

/// `summary` minus item `id`, with totals adjusted, and the removed quantity.
fn without_item(mut summary: CartSummary, id: &str) -> Option<(CartSummary, u32)> {
    let index = summary.items.iter().position(|item| item.id == id)?;
    let item = summary.items.remove(index);
    let price = item.price * f64::from(item.quantity);

    summary.total_count = summary.total_count.saturating_sub(item.quantity);
    summary.total_price = (summary.total_price - price).max(0.0);
    if item.selected {
        summary.selected_count = summary.selected_count.saturating_sub(item.quantity);
        summary.selected_price = (summary.selected_price - price).max(0.0);
    }
    Some((summary, item.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, harness};
    use std::sync::{Arc, Mutex};

    fn service(h: &Harness) -> CartService {
        CartService::new(
            h.client.clone(),
            CartCounter::new(h.store.clone(), &h.keys),
            DataCache::new(h.cache.clone()),
            h.events.clone(),
        )
    }

    fn record(h: &Harness, topics: &[Topic]) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in topics {
            let sink = seen.clone();
            let name = topic.as_str().to_string();
            h.events.on(*topic, move |_| sink.lock().unwrap().push(name.clone()));
        }
        seen
    }

    #[tokio::test]
    async fn test_list_refreshes_snapshot_and_badge() {
        let h = harness();
        let cart = service(&h);
        h.transport.push_ok(json!({
            "items": [{"id": "c1", "productId": "p1", "quantity": 2}],
            "totalCount": 2,
            "totalPrice": 19.0
        }));

        let summary = cart.list().await.unwrap();

        assert_eq!(summary.items[0].product_id, "p1");
        assert_eq!(cart.badge().await, 2);
        assert_eq!(cart.cached().await, Some(summary));
    }

    #[tokio::test]
    async fn test_add_emits_item_and_update() {
        let h = harness();
        let cart = service(&h);
        let seen = record(&h, &[Topic::CartItemAdd, Topic::CartUpdate]);
        h.transport.push_ok(json!({"id": "c1", "productId": "p1", "quantity": 3}));

        let params = AddToCartParams { product_id: "p1".into(), quantity: 3, specs: Vec::new() };
        cart.add(&params).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["CART_ITEM_ADD", "CART_UPDATE"]);
        assert_eq!(cart.badge().await, 3);
        assert_eq!(h.transport.requests()[0].body, Some(json!({"productId": "p1", "quantity": 3})));
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let h = harness();
        let cart = service(&h);
        let seen = record(&h, &[Topic::CartItemUpdate, Topic::CartItemRemove, Topic::CartUpdate]);
        h.transport.push_ok(json!({"id": "c1", "quantity": 5}));
        h.transport.push_ok(Value::Null);
        h.transport.push_ok(json!(2));

        let params = UpdateCartParams { quantity: Some(5), selected: None };
        let item = cart.update_item("c1", &params).await.unwrap();
        assert_eq!(item.quantity, 5);
        cart.remove("c1").await.unwrap();

        let requests = h.transport.requests();
        assert!(requests[0].url.ends_with("/cart/c1"));
        assert_eq!(requests[1].method, reqwest::Method::DELETE);
        assert!(requests[2].url.ends_with("/cart/count"));
        assert_eq!(cart.badge().await, 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["CART_ITEM_UPDATE", "CART_UPDATE", "CART_ITEM_REMOVE", "CART_UPDATE"]
        );
    }

    #[tokio::test]
    async fn test_remove_drops_quantity_from_snapshot_and_badge() {
        let h = harness();
        let cart = service(&h);
        let counts = Arc::new(Mutex::new(Vec::new()));
        let sink = counts.clone();
        h.events.on(Topic::CartUpdate, move |payload: &Value| {
            sink.lock().unwrap().push(payload["count"].clone())
        });
        h.transport.push_ok(json!({
            "items": [
                {"id": "c1", "quantity": 2, "price": 5.0, "selected": true},
                {"id": "c2", "quantity": 1, "price": 3.0}
            ],
            "totalCount": 3,
            "totalPrice": 13.0,
            "selectedCount": 2,
            "selectedPrice": 10.0
        }));
        h.transport.push_ok(Value::Null);

        cart.list().await.unwrap();
        cart.remove("c1").await.unwrap();

        assert_eq!(cart.badge().await, 1);
        assert_eq!(*counts.lock().unwrap(), vec![json!(1)]);
        let summary = cart.cached().await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.total_price, 3.0);
        assert_eq!(summary.selected_count, 0);
        assert_eq!(summary.selected_price, 0.0);
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_badge() {
        let h = harness();
        let cart = service(&h);
        CartCounter::new(h.store.clone(), &h.keys).set(4).await;
        h.transport.push_ok(Value::Null);

        cart.clear().await.unwrap();
        assert_eq!(cart.badge().await, 0);
    }

    #[tokio::test]
    async fn test_count_syncs_badge() {
        let h = harness();
        let cart = service(&h);
        h.transport.push_ok(json!(7));

        assert_eq!(cart.count().await.unwrap(), 7);
        assert_eq!(cart.badge().await, 7);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_badge() {
        let h = harness();
        let cart = service(&h);
        h.transport.push_json(200, json!({"code": 3001, "message": "out of stock"}));

        let params = AddToCartParams { product_id: "p1".into(), quantity: 1, specs: Vec::new() };
        assert!(cart.add(&params).await.is_err());
        assert_eq!(cart.badge().await, 0);
    }
}
