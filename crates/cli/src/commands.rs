//! Subcommands and their execution.

use clap::Subcommand;
use serde::Serialize;
use serde_json::{Value, json};
use shopfront_client::services::types::{OrderQuery, OrderStatus, PageParams, ProductQuery};
use shopfront_core::CacheStrategy;

use crate::app::App;
use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Request a login verification code
    SendCode {
        #[arg(long)]
        phone: String,
    },

    /// Log in with a phone number and verification code
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user's profile
    Whoami,

    /// List products, or search them when a keyword is given
    Products {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Show one product
    Product { id: String },

    /// Show the cart
    Cart,

    /// List orders
    Orders {
        #[arg(long)]
        status: Option<OrderStatusArg>,
        #[arg(long)]
        page: Option<u32>,
    },

    /// Show one order
    Order { id: String },

    /// Inspect or clear local cache state
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Show recent search keywords
    History,

    /// Show recently viewed products
    Viewed,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List stored and in-memory keys
    Keys,
    /// Drop every cached and stored value, including the session
    Clear,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OrderStatusArg {
    PendingPayment,
    PendingShipment,
    PendingReceipt,
    Completed,
    Cancelled,
    Refunding,
    Refunded,
}

impl From<OrderStatusArg> for OrderStatus {
    fn from(arg: OrderStatusArg) -> Self {
        match arg {
            OrderStatusArg::PendingPayment => OrderStatus::PendingPayment,
            OrderStatusArg::PendingShipment => OrderStatus::PendingShipment,
            OrderStatusArg::PendingReceipt => OrderStatus::PendingReceipt,
            OrderStatusArg::Completed => OrderStatus::Completed,
            OrderStatusArg::Cancelled => OrderStatus::Cancelled,
            OrderStatusArg::Refunding => OrderStatus::Refunding,
            OrderStatusArg::Refunded => OrderStatus::Refunded,
        }
    }
}

/// Execute `command` and return its printable result.
pub async fn run(app: &App, command: Command) -> Result<Value, CliError> {
    match command {
        Command::SendCode { phone } => output(&app.users.send_code(&phone).await?),
        Command::Login { phone, code } => output(&app.users.login(&phone, &code).await?),
        Command::Logout => {
            app.users.logout().await?;
            Ok(json!({ "loggedOut": true }))
        }
        Command::Whoami => {
            if !app.users.is_logged_in().await {
                return Err(CliError::NotLoggedIn);
            }
            output(&app.users.user_info().await?)
        }
        Command::Products { page, page_size, keyword } => {
            let query = ProductQuery {
                page: PageParams { page, page_size, keyword, ..Default::default() },
                ..Default::default()
            };
            let products = &app.products;
            let query = &query;
            let page = if query.page.keyword.is_some() {
                app.network
                    .request_with_retry_default(move || products.search(query))
                    .await?
            } else {
                app.network
                    .request_with_retry_default(move || products.list(query))
                    .await?
            };
            output(&page)
        }
        Command::Product { id } => output(&app.products.detail(&id).await?),
        Command::Cart => output(&app.cart.list().await?),
        Command::Orders { status, page } => {
            let query = OrderQuery {
                page: PageParams { page, ..Default::default() },
                status: status.map(OrderStatus::from),
                ..Default::default()
            };
            output(&app.orders.list(&query).await?)
        }
        Command::Order { id } => output(&app.orders.detail(&id).await?),
        Command::Cache { action: CacheCommand::Keys } => {
            let mut storage = app.store.keys().await;
            storage.sort();
            Ok(json!({ "storage": storage, "memory": app.cache.memory_keys().await }))
        }
        Command::Cache { action: CacheCommand::Clear } => {
            app.cache.clear(CacheStrategy::Both).await;
            Ok(json!({ "cleared": true }))
        }
        Command::History => output(&app.products.search_history().await),
        Command::Viewed => output(&app.products.browse_history().await),
    }
}

fn output<T: Serialize>(value: &T) -> Result<Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shopfront_client::{ApiError, HttpRequest, HttpResponse, Transport, TransportError, UploadRequest};
    use shopfront_core::{AppConfig, MemoryStorage};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StubTransport {
        replies: Mutex<VecDeque<Value>>,
        urls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn reply(&self, data: Value) {
            self.replies
                .lock()
                .unwrap()
                .push_back(json!({"code": 0, "data": data, "message": "ok"}));
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.urls.lock().unwrap().push(request.url);
            match self.replies.lock().unwrap().pop_front() {
                Some(body) => Ok(HttpResponse::json(200, &body)),
                None => Err(TransportError::Connection("no reply".into())),
            }
        }

        async fn upload(&self, _request: UploadRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connection("no reply".into()))
        }
    }

    fn app() -> (App, Arc<StubTransport>) {
        let config = AppConfig { retry_times: 0, loading_delay_ms: 10, ..Default::default() };
        let transport = Arc::new(StubTransport::default());
        let app = App::assemble(&config, Arc::new(MemoryStorage::new()), transport.clone());
        (app, transport)
    }

    #[tokio::test]
    async fn test_launch_marks_unreachable_host_offline() {
        let config = AppConfig { retry_times: 2, retry_delay_ms: 1, ..Default::default() };
        let transport = Arc::new(StubTransport::default());
        let app = App::launch(&config, Arc::new(MemoryStorage::new()), transport.clone()).await;

        assert!(!app.network.is_online());
        assert_eq!(transport.urls.lock().unwrap().clone(), vec![config.base_url().to_string()]);

        let command = Command::Products { page: None, page_size: None, keyword: None };
        let err = run(&app, command).await.unwrap_err();
        assert!(matches!(err, CliError::Api(ApiError::Offline)));
        assert_eq!(transport.urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_launch_marks_reachable_host_online() {
        let transport = Arc::new(StubTransport::default());
        transport.reply(Value::Null);
        let config = AppConfig::default();
        let app = App::launch(&config, Arc::new(MemoryStorage::new()), transport.clone()).await;

        assert!(app.network.is_online());
    }

    #[tokio::test]
    async fn test_whoami_requires_login() {
        let (app, transport) = app();
        let err = run(&app, Command::Whoami).await.unwrap_err();
        assert!(matches!(err, CliError::NotLoggedIn));
        assert!(transport.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_then_whoami() {
        let (app, transport) = app();
        transport.reply(json!({"token": "t1", "userInfo": {"id": "u1", "nickname": "Ada"}}));
        transport.reply(json!({"id": "u1", "nickname": "Ada"}));

        let login = Command::Login { phone: "13800000000".into(), code: "1234".into() };
        let out = run(&app, login).await.unwrap();
        assert_eq!(out["token"], "t1");

        let out = run(&app, Command::Whoami).await.unwrap();
        assert_eq!(out["nickname"], "Ada");
    }

    #[tokio::test]
    async fn test_products_with_keyword_searches_and_records_history() {
        let (app, transport) = app();
        transport.reply(json!({"list": [], "total": 0, "page": 1, "pageSize": 10}));

        let command = Command::Products { page: Some(1), page_size: None, keyword: Some("socks".into()) };
        run(&app, command).await.unwrap();

        assert!(transport.urls.lock().unwrap()[0].ends_with("/products/search"));
        assert_eq!(run(&app, Command::History).await.unwrap(), json!(["socks"]));
    }

    #[tokio::test]
    async fn test_viewed_lists_product_details() {
        let (app, transport) = app();
        assert_eq!(run(&app, Command::Viewed).await.unwrap(), json!([]));
        transport.reply(json!({"id": "p1", "name": "Sock"}));
        run(&app, Command::Product { id: "p1".into() }).await.unwrap();

        let viewed = run(&app, Command::Viewed).await.unwrap();
        assert_eq!(viewed[0]["id"], "p1");
        assert_eq!(viewed[0]["name"], "Sock");
    }

    #[tokio::test]
    async fn test_cache_keys_and_clear() {
        let (app, transport) = app();
        transport.reply(json!({"id": "p1", "name": "Sock"}));
        run(&app, Command::Product { id: "p1".into() }).await.unwrap();

        let keys = run(&app, Command::Cache { action: CacheCommand::Keys }).await.unwrap();
        assert_eq!(keys["memory"].as_array().unwrap().len(), 1);

        run(&app, Command::Cache { action: CacheCommand::Clear }).await.unwrap();
        let keys = run(&app, Command::Cache { action: CacheCommand::Keys }).await.unwrap();
        assert_eq!(keys, json!({"storage": [], "memory": []}));
    }

    #[tokio::test]
    async fn test_orders_status_filter() {
        let (app, transport) = app();
        transport.reply(json!({"list": [], "total": 0, "page": 1, "pageSize": 10}));

        let command = Command::Orders { status: Some(OrderStatusArg::PendingShipment), page: None };
        run(&app, command).await.unwrap();
        assert!(transport.urls.lock().unwrap()[0].ends_with("/orders"));
    }
}
