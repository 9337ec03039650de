//! Process-wide service graph.

use std::sync::Arc;

use serde_json::Value;
use shopfront_client::{
    ApiClient, CartService, LogPresenter, OrderService, PipelineConfig, ProductService, ReachabilitySource,
    ReqwestTransport, Transport, TransportConfig, UserService,
};
use shopfront_core::storage::{CartCounter, SearchHistory, UserSession};
use shopfront_core::{
    ApiCache, AppConfig, DataCache, EventBus, KvStore, LayeredCache, NetworkTracker, PlatformStorage, SqliteStorage,
    StorageDb, Topic,
};

use crate::error::CliError;

/// Every handle a command may need, built once at start-up.
pub struct App {
    pub store: KvStore,
    pub cache: LayeredCache,
    pub network: NetworkTracker,
    pub users: UserService,
    pub products: ProductService,
    pub cart: CartService,
    pub orders: OrderService,
}

impl App {
    /// Open the SQLite store named by `config.db_path` and wire the services over it.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, CliError> {
        let db = StorageDb::open(&config.db_path).await?;
        tracing::debug!(path = %config.db_path.display(), "storage opened");

        let transport = ReqwestTransport::new(TransportConfig::from_app_config(&config))?;
        Ok(Self::launch(&config, Arc::new(SqliteStorage::new(db)), Arc::new(transport)).await)
    }

    /// Assemble the graph, then check the API host and keep following its reachability.
    pub async fn launch(
        config: &AppConfig,
        platform: Arc<dyn PlatformStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let app = Self::assemble(config, platform, Arc::clone(&transport));

        let reachability = ReachabilitySource::new(transport, config.base_url(), config.connectivity_interval());
        // Detached; the checks run until the process exits.
        let _ = app.network.watch(reachability).await;
        tracing::debug!(is_online = app.network.is_online(), "connectivity checked");

        app
    }

    /// Wire the service graph over an existing storage backend and transport.
    pub fn assemble(config: &AppConfig, platform: Arc<dyn PlatformStorage>, transport: Arc<dyn Transport>) -> Self {
        let store = KvStore::with_options(platform, config.storage_prefix.clone(), config.default_expire());
        let cache = LayeredCache::with_version(store.clone(), config.cache_version.clone());
        let keys = &config.storage_keys;

        let events = EventBus::new();
        for topic in Topic::ALL {
            events.on(topic, move |payload: &Value| tracing::debug!(event = %topic, %payload, "event"));
        }
        let network = NetworkTracker::from_config(events.clone(), config);
        let session = UserSession::new(store.clone(), keys);

        let api = ApiClient::new(
            transport,
            session.clone(),
            events.clone(),
            network.clone(),
            Arc::new(LogPresenter),
            PipelineConfig::from_app_config(config),
        );

        let data = DataCache::new(cache.clone());
        let users = UserService::new(api.clone(), session, data.clone(), events.clone());
        let products = ProductService::new(
            api.clone(),
            ApiCache::with_ttl(cache.clone(), config.api_cache_ttl()),
            SearchHistory::new(store.clone(), keys),
            data.clone(),
            events.clone(),
        );
        let cart = CartService::new(api.clone(), CartCounter::new(store.clone(), keys), data, events.clone());
        let orders = OrderService::new(api, events);

        Self { store, cache, network, users, products, cart, orders }
    }
}
