//! Order endpoints.

use serde_json::{Value, json};
use shopfront_core::{EventBus, Topic};

use super::types::{CreateOrderParams, CreatedOrder, Order, OrderQuery, PageResult, PayResult, PayType, RefundParams};
use crate::error::ApiError;
use crate::request::ApiClient;

#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
    events: EventBus,
}

impl OrderService {
    pub fn new(api: ApiClient, events: EventBus) -> Self {
        Self { api, events }
    }

    pub async fn create(&self, params: &CreateOrderParams) -> Result<CreatedOrder, ApiError> {
        let created: CreatedOrder = self.api.post("/orders", params).await?;
        self.events.emit(
            Topic::OrderCreate,
            &json!({ "orderId": created.order_id, "orderNo": created.order_no }),
        );
        Ok(created)
    }

    pub async fn list(&self, query: &OrderQuery) -> Result<PageResult<Order>, ApiError> {
        self.api.get("/orders", query).await
    }

    pub async fn detail(&self, id: &str) -> Result<Order, ApiError> {
        self.api.get(&format!("/orders/{id}"), &()).await
    }

    pub async fn pay(&self, id: &str, pay_type: PayType) -> Result<PayResult, ApiError> {
        let result: PayResult = self
            .api
            .post(&format!("/orders/{id}/pay"), &json!({ "payType": pay_type }))
            .await?;
        self.events
            .emit(Topic::OrderPay, &json!({ "id": id, "payType": pay_type }));
        Ok(result)
    }

    pub async fn cancel(&self, id: &str, reason: Option<&str>) -> Result<(), ApiError> {
        self.api
            .put::<Value, _>(&format!("/orders/{id}/cancel"), &json!({ "reason": reason }))
            .await?;
        self.events.emit(Topic::OrderCancel, &json!({ "id": id }));
        Ok(())
    }

    pub async fn apply_refund(&self, id: &str, params: &RefundParams) -> Result<(), ApiError> {
        self.api
            .post::<Value, _>(&format!("/orders/{id}/refund"), params)
            .await?;
        self.events.emit(Topic::OrderRefund, &json!({ "id": id }));
        Ok(())
    }
}
