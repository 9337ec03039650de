//! Central side effects for failed requests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use shopfront_core::storage::UserSession;
use shopfront_core::{EventBus, NetworkTracker, Topic};

use crate::error::{ApiError, TransportError};
use crate::presenter::Presenter;

pub const NOTICE_NETWORK_UNAVAILABLE: &str = "Network unavailable, please check your network settings";
pub const NOTICE_CONNECTION_LOST: &str = "Connection lost, please check your network settings";
pub const NOTICE_TIMEOUT: &str = "Request timed out, please try again";
pub const NOTICE_LOGIN_REQUIRED: &str = "Please log in first";
pub const NOTICE_FORBIDDEN: &str = "Access denied";
pub const NOTICE_NOT_FOUND: &str = "The requested resource does not exist";
pub const NOTICE_SERVER_ERROR: &str = "Server error";
pub const NOTICE_REQUEST_FAILED: &str = "Request failed";

/// Maps a failure to its notice and session side effects.
#[derive(Clone)]
pub struct ErrorHandler {
    session: UserSession,
    events: EventBus,
    network: NetworkTracker,
    presenter: Arc<dyn Presenter>,
    login_path: String,
    redirect_delay: Duration,
}

impl ErrorHandler {
    pub fn new(
        session: UserSession,
        events: EventBus,
        network: NetworkTracker,
        presenter: Arc<dyn Presenter>,
        login_path: impl Into<String>,
        redirect_delay: Duration,
    ) -> Self {
        Self { session, events, network, presenter, login_path: login_path.into(), redirect_delay }
    }

    /// Show the notice for `error` and apply its side effects.
    ///
    /// Returns the notice text. The caller still owns and returns the error.
    pub async fn handle(&self, error: &ApiError) -> String {
        let notice = match error {
            ApiError::Transport(TransportError::Timeout) => {
                self.emit_network_error(error);
                NOTICE_TIMEOUT.to_string()
            }
            ApiError::Transport(_) | ApiError::Offline => {
                self.emit_network_error(error);
                if self.network.is_online() {
                    NOTICE_NETWORK_UNAVAILABLE.to_string()
                } else {
                    NOTICE_CONNECTION_LOST.to_string()
                }
            }
            ApiError::Http { status: 401, .. } => {
                self.handle_unauthorized().await;
                NOTICE_LOGIN_REQUIRED.to_string()
            }
            ApiError::Http { status: 403, .. } => NOTICE_FORBIDDEN.to_string(),
            ApiError::Http { status: 404, .. } => NOTICE_NOT_FOUND.to_string(),
            ApiError::Http { status: 500, .. } => NOTICE_SERVER_ERROR.to_string(),
            _ => error
                .server_message()
                .unwrap_or(NOTICE_REQUEST_FAILED)
                .to_string(),
        };

        tracing::warn!(error = %error, notice = %notice, "request failed");
        self.presenter.toast(&notice);
        notice
    }

    fn emit_network_error(&self, error: &ApiError) {
        self.events
            .emit(Topic::NetworkError, &json!({ "message": error.to_string() }));
    }

    async fn handle_unauthorized(&self) {
        self.session.clear().await;
        self.events.emit(Topic::Unauthorized, &Value::Null);

        let presenter = Arc::clone(&self.presenter);
        let path = self.login_path.clone();
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            presenter.navigate_to(&path);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPresenter;
    use shopfront_core::config::StorageKeys;
    use shopfront_core::{KvStore, MemoryStorage, NetworkType};
    use std::sync::Mutex;

    struct Fixture {
        handler: ErrorHandler,
        presenter: Arc<RecordingPresenter>,
        session: UserSession,
        events: EventBus,
        network: NetworkTracker,
    }

    fn fixture() -> Fixture {
        let presenter = Arc::new(RecordingPresenter::default());
        let session = UserSession::new(KvStore::new(Arc::new(MemoryStorage::new())), &StorageKeys::default());
        let events = EventBus::new();
        let network = NetworkTracker::new(events.clone());
        let handler = ErrorHandler::new(
            session.clone(),
            events.clone(),
            network.clone(),
            presenter.clone(),
            "/pages/login/index",
            Duration::from_millis(20),
        );
        Fixture { handler, presenter, session, events, network }
    }

    fn record(events: &EventBus, topic: Topic) -> Arc<Mutex<Vec<Value>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.on(topic, move |payload: &Value| sink.lock().unwrap().push(payload.clone()));
        seen
    }

    #[tokio::test]
    async fn test_transport_failure_online() {
        let f = fixture();
        let seen = record(&f.events, Topic::NetworkError);

        let err = ApiError::Transport(TransportError::Connection("refused".into()));
        let notice = f.handler.handle(&err).await;

        assert_eq!(notice, NOTICE_NETWORK_UNAVAILABLE);
        assert_eq!(f.presenter.calls(), vec![format!("toast:{NOTICE_NETWORK_UNAVAILABLE}")]);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_offline() {
        let f = fixture();
        f.network.update(NetworkType::None, false);

        let notice = f.handler.handle(&ApiError::Transport(TransportError::Connection("x".into()))).await;
        assert_eq!(notice, NOTICE_CONNECTION_LOST);
    }

    #[tokio::test]
    async fn test_timeout_notice() {
        let f = fixture();
        let notice = f.handler.handle(&ApiError::Transport(TransportError::Timeout)).await;
        assert_eq!(notice, NOTICE_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects() {
        let f = fixture();
        f.session.set_token("stale").await;
        f.session.set_user_info(&serde_json::json!({"id": "u1"})).await;
        let seen = record(&f.events, Topic::Unauthorized);

        let notice = f.handler.handle(&ApiError::Http { status: 401, body: Value::Null }).await;

        assert_eq!(notice, NOTICE_LOGIN_REQUIRED);
        assert!(f.session.token().await.is_none());
        assert!(f.session.user_info::<Value>().await.is_none());
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(f.presenter.count("navigate:"), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            f.presenter.calls(),
            vec![format!("toast:{NOTICE_LOGIN_REQUIRED}"), "navigate:/pages/login/index".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fixed_status_notices() {
        let f = fixture();
        for (status, expected) in [(403, NOTICE_FORBIDDEN), (404, NOTICE_NOT_FOUND), (500, NOTICE_SERVER_ERROR)] {
            let notice = f
                .handler
                .handle(&ApiError::Http { status, body: json!({"message": "ignored"}) })
                .await;
            assert_eq!(notice, expected);
        }
    }

    #[tokio::test]
    async fn test_other_failures_use_server_message() {
        let f = fixture();

        let err = ApiError::Http { status: 409, body: json!({"message": "duplicate order"}) };
        assert_eq!(f.handler.handle(&err).await, "duplicate order");

        let err = ApiError::Http { status: 502, body: Value::Null };
        assert_eq!(f.handler.handle(&err).await, NOTICE_REQUEST_FAILED);

        let err = ApiError::Business { code: 1001, message: "out of stock".into(), body: Value::Null };
        assert_eq!(f.handler.handle(&err).await, "out of stock");

        let err = ApiError::Decode("missing field".into());
        assert_eq!(f.handler.handle(&err).await, NOTICE_REQUEST_FAILED);
    }
}
