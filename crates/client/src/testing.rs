//! Fakes shared by the crate's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use shopfront_core::config::StorageKeys;
use shopfront_core::storage::UserSession;
use shopfront_core::{EventBus, KvStore, LayeredCache, MemoryStorage, NetworkTracker};

use crate::error::TransportError;
use crate::presenter::Presenter;
use crate::request::{ApiClient, PipelineConfig};
use crate::transport::{HttpRequest, HttpResponse, Transport, UploadRequest};

pub const BASE_URL: &str = "http://api.test";

/// Records every presenter call as a string, in order.
#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Presenter for RecordingPresenter {
    fn show_loading(&self, text: &str) {
        self.record(format!("show:{text}"));
    }

    fn hide_loading(&self) {
        self.record("hide".to_string());
    }

    fn toast(&self, message: &str) {
        self.record(format!("toast:{message}"));
    }

    fn navigate_to(&self, path: &str) {
        self.record(format!("navigate:{path}"));
    }
}

/// Scripted transport: replies in push order and records what it was sent.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    uploads: Mutex<Vec<UploadRequest>>,
    delay: Mutex<Duration>,
}

impl FakeTransport {
    /// Queue a success envelope carrying `data`.
    pub fn push_ok(&self, data: Value) {
        self.push_json(200, json!({"code": 0, "data": data, "message": "ok"}));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::json(status, &body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().unwrap().clone()
    }

    async fn reply(&self) -> Result<HttpResponse, TransportError> {
        let delay = *self.delay.lock().unwrap();
        let reply = self.replies.lock().unwrap().pop_front();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.unwrap_or_else(|| Err(TransportError::Connection("no scripted reply".into())))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.reply().await
    }

    async fn upload(&self, request: UploadRequest) -> Result<HttpResponse, TransportError> {
        self.uploads.lock().unwrap().push(request);
        self.reply().await
    }
}

/// A pipeline wired to fakes and in-memory storage.
pub struct Harness {
    pub client: ApiClient,
    pub transport: Arc<FakeTransport>,
    pub presenter: Arc<RecordingPresenter>,
    pub session: UserSession,
    pub events: EventBus,
    pub network: NetworkTracker,
    pub store: KvStore,
    pub cache: LayeredCache,
    pub keys: StorageKeys,
}

pub fn harness() -> Harness {
    let store = KvStore::new(Arc::new(MemoryStorage::new()));
    let keys = StorageKeys::default();
    let session = UserSession::new(store.clone(), &keys);
    let events = EventBus::new();
    let network = NetworkTracker::new(events.clone());
    let transport = Arc::new(FakeTransport::default());
    let presenter = Arc::new(RecordingPresenter::default());

    let config = PipelineConfig {
        base_url: BASE_URL.to_string(),
        loading_delay: Duration::from_millis(20),
        loading_text: "Loading...".to_string(),
        login_path: "/pages/login/index".to_string(),
        unauthorized_redirect: Duration::from_millis(20),
    };

    let client = ApiClient::new(
        transport.clone(),
        session.clone(),
        events.clone(),
        network.clone(),
        presenter.clone(),
        config,
    );

    Harness {
        client,
        transport,
        presenter,
        session,
        events,
        network,
        cache: LayeredCache::new(store.clone()),
        store,
        keys,
    }
}
