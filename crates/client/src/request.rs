//! Request pipeline.
//!
//! ### Flow
//! - Resolve the URL from the per-request base override or the environment base
//! - Attach `Authorization: Bearer <token>` when a session token exists
//! - Hold a loading guard for the duration of the transport call
//! - Normalize the response: HTTP 200 + `code == 0` yields `data`
//! - Route every failure through [`ErrorHandler`], then return it to the caller

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shopfront_core::storage::UserSession;
use shopfront_core::{AppConfig, EventBus, NetworkTracker};

use crate::error::ApiError;
use crate::handler::ErrorHandler;
use crate::loading::LoadingTracker;
use crate::presenter::Presenter;
use crate::services::types::Envelope;
use crate::transport::{HttpRequest, HttpResponse, Transport, UploadRequest};

const AUTHORIZATION: &str = "Authorization";

/// Pipeline settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_url: String,
    pub loading_delay: Duration,
    pub loading_text: String,
    pub login_path: String,
    pub unauthorized_redirect: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            loading_delay: config.loading_delay(),
            loading_text: config.loading_text.clone(),
            login_path: config.login_path.clone(),
            unauthorized_redirect: config.unauthorized_redirect(),
        }
    }
}

/// One logical request before URL resolution and token injection.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub base_url: Option<String>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub show_loading: bool,
    pub loading_text: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            base_url: None,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            show_loading: true,
            loading_text: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append the fields of `params` as query pairs.
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self, ApiError> {
        let value = serde_json::to_value(params).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.query.extend(query_pairs(&value)?);
        Ok(self)
    }

    /// Set the JSON body; `null` means no body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = (!value.is_null()).then_some(value);
        Ok(self)
    }

    /// Query pairs for GET, JSON body otherwise.
    pub fn payload<P: Serialize + ?Sized>(self, payload: &P) -> Result<Self, ApiError> {
        if self.method == Method::GET { self.params(payload) } else { self.json(payload) }
    }

    pub fn show_loading(mut self, show: bool) -> Self {
        self.show_loading = show;
        self
    }

    pub fn loading_text(mut self, text: impl Into<String>) -> Self {
        self.loading_text = Some(text.into());
        self
    }
}

/// Flatten a JSON object into query pairs.
///
/// `null` fields are skipped; array fields repeat the key once per element;
/// nested objects are sent as JSON text.
pub fn query_pairs(value: &Value) -> Result<Vec<(String, String)>, ApiError> {
    let object = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(object) => object,
        other => return Err(ApiError::InvalidRequest(format!("query parameters must be an object, got {other}"))),
    };

    let mut pairs = Vec::with_capacity(object.len());
    for (name, value) in object {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((name.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((name.clone(), scalar_text(other))),
        }
    }
    Ok(pairs)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extra settings for [`ApiClient::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub base_url: Option<String>,
    /// Caller headers; an `Authorization` header here replaces the session token.
    pub headers: Vec<(String, String)>,
    pub form_data: Vec<(String, String)>,
}

/// Normalize a raw response into the envelope's `data`.
pub fn normalize<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    if response.status != 200 {
        let body = if response.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&response.body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&response.body).into_owned()))
        };
        return Err(ApiError::Http { status: response.status, body });
    }

    let raw: Value = serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))?;
    let envelope: Envelope<Value> =
        serde_json::from_value(raw.clone()).map_err(|e| ApiError::Decode(format!("malformed envelope: {e}")))?;

    if envelope.code != 0 {
        return Err(ApiError::Business { code: envelope.code, message: envelope.message, body: raw });
    }

    serde_json::from_value(envelope.data).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Shared request pipeline. Clones share transport, session and loading state.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: UserSession,
    loading: LoadingTracker,
    handler: ErrorHandler,
    config: PipelineConfig,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: UserSession,
        events: EventBus,
        network: NetworkTracker,
        presenter: Arc<dyn Presenter>,
        config: PipelineConfig,
    ) -> Self {
        let loading = LoadingTracker::new(Arc::clone(&presenter), config.loading_delay);
        let handler = ErrorHandler::new(
            session.clone(),
            events,
            network,
            presenter,
            config.login_path.clone(),
            config.unauthorized_redirect,
        );
        Self { transport, session, loading, handler, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    fn resolve_url(&self, base_url: Option<&str>, path: &str) -> String {
        format!("{}{}", base_url.unwrap_or(&self.config.base_url), path)
    }

    async fn bearer(&self) -> Option<(String, String)> {
        self.session
            .token()
            .await
            .map(|token| (AUTHORIZATION.to_string(), format!("Bearer {token}")))
    }

    /// Run `descriptor` through the pipeline.
    pub async fn request<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let method = descriptor.method.clone();
        let path = descriptor.path.clone();

        let result = self.execute(descriptor).await;
        match &result {
            Ok(_) => tracing::debug!(%method, path = %path, "request succeeded"),
            Err(error) => {
                self.handler.handle(error).await;
            }
        }
        result
    }

    async fn execute<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let url = self.resolve_url(descriptor.base_url.as_deref(), &descriptor.path);

        let mut headers = descriptor.headers;
        if let Some(bearer) = self.bearer().await {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
            headers.push(bearer);
        }

        let response = {
            let _loading = descriptor.show_loading.then(|| {
                self.loading
                    .acquire(descriptor.loading_text.as_deref().unwrap_or(&self.config.loading_text))
            });

            self.transport
                .send(HttpRequest { method: descriptor.method, url, headers, query: descriptor.query, body: descriptor.body })
                .await?
        };

        normalize(response)
    }

    async fn call<T, P, F>(&self, method: Method, path: &str, payload: &P, customize: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
        F: FnOnce(RequestDescriptor) -> RequestDescriptor,
    {
        match RequestDescriptor::new(method, path).payload(payload) {
            Ok(descriptor) => self.request(customize(descriptor)).await,
            Err(error) => {
                self.handler.handle(&error).await;
                Err(error)
            }
        }
    }

    pub async fn get<T, P>(&self, path: &str, params: &P) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::GET, path, params, |d| d).await
    }

    pub async fn get_with<T, P, F>(&self, path: &str, params: &P, customize: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
        F: FnOnce(RequestDescriptor) -> RequestDescriptor,
    {
        self.call(Method::GET, path, params, customize).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::POST, path, body, |d| d).await
    }

    pub async fn post_with<T, B, F>(&self, path: &str, body: &B, customize: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        F: FnOnce(RequestDescriptor) -> RequestDescriptor,
    {
        self.call(Method::POST, path, body, customize).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::PUT, path, body, |d| d).await
    }

    pub async fn put_with<T, B, F>(&self, path: &str, body: &B, customize: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        F: FnOnce(RequestDescriptor) -> RequestDescriptor,
    {
        self.call(Method::PUT, path, body, customize).await
    }

    pub async fn delete<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::DELETE, path, body, |d| d).await
    }

    pub async fn delete_with<T, B, F>(&self, path: &str, body: &B, customize: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        F: FnOnce(RequestDescriptor) -> RequestDescriptor,
    {
        self.call(Method::DELETE, path, body, customize).await
    }

    /// Upload a local file as multipart field `field_name`.
    ///
    /// Same token injection, normalization and failure handling as
    /// [`request`](Self::request); no loading indicator is shown.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file_path: impl AsRef<Path>,
        field_name: &str,
        options: UploadOptions,
    ) -> Result<T, ApiError> {
        let url = self.resolve_url(options.base_url.as_deref(), path);

        let mut headers = Vec::with_capacity(options.headers.len() + 1);
        let caller_auth = options
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION));
        if !caller_auth && let Some(bearer) = self.bearer().await {
            headers.push(bearer);
        }
        headers.extend(options.headers);

        let request = UploadRequest {
            url,
            headers,
            file_path: file_path.as_ref().to_path_buf(),
            field_name: field_name.to_string(),
            form_data: options.form_data,
        };

        let result = match self.transport.upload(request).await {
            Ok(response) => normalize(response),
            Err(e) => Err(ApiError::from(e)),
        };

        if let Err(error) = &result {
            self.handler.handle(error).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::handler::{NOTICE_CONNECTION_LOST, NOTICE_LOGIN_REQUIRED, NOTICE_NETWORK_UNAVAILABLE};
    use crate::testing::{BASE_URL, harness};
    use serde_json::json;
    use shopfront_core::{NetworkType, Topic};
    use std::sync::Mutex;

    fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({"page": 1, "keyword": "shoe", "tags": ["a", "b"], "skip": null})).unwrap();
        assert!(pairs.contains(&("page".to_string(), "1".to_string())));
        assert!(pairs.contains(&("keyword".to_string(), "shoe".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "tags").count(), 2);
        assert!(!pairs.iter().any(|(k, _)| k == "skip"));

        assert!(query_pairs(&Value::Null).unwrap().is_empty());
        assert!(matches!(query_pairs(&json!(3)), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn test_normalize_success() {
        let response = HttpResponse::json(200, &json!({"code": 0, "data": {"n": 5}, "message": "ok"}));
        let data: Value = normalize(response).unwrap();
        assert_eq!(data, json!({"n": 5}));
    }

    #[test]
    fn test_normalize_business_error() {
        let response = HttpResponse::json(200, &json!({"code": 1001, "data": null, "message": "out of stock"}));
        let err = normalize::<Value>(response).unwrap_err();
        match err {
            ApiError::Business { code, message, body } => {
                assert_eq!(code, 1001);
                assert_eq!(message, "out of stock");
                assert_eq!(body["code"], 1001);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_normalize_http_error_keeps_body() {
        let err = normalize::<Value>(HttpResponse::json(404, &json!({"message": "gone"}))).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some(&json!({"message": "gone"})));

        let err = normalize::<Value>(HttpResponse::new(502, "Bad Gateway")).unwrap_err();
        assert_eq!(err.body(), Some(&json!("Bad Gateway")));
    }

    #[test]
    fn test_normalize_decode_errors() {
        let err = normalize::<Value>(HttpResponse::new(200, "<html>")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        let response = HttpResponse::json(200, &json!({"code": 0, "data": "text"}));
        assert!(matches!(normalize::<u32>(response), Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_url_resolution_and_query() {
        let h = harness();
        h.transport.push_ok(json!([]));
        h.transport.push_ok(json!([]));

        let _: Value = h.client.get("/products", &json!({"page": 2})).await.unwrap();
        let _: Value = h
            .client
            .get_with("/products", &(), |d| d.base_url("https://other.test"))
            .await
            .unwrap();

        let requests = h.transport.requests();
        assert_eq!(requests[0].url, format!("{BASE_URL}/products"));
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].query, vec![("page".to_string(), "2".to_string())]);
        assert!(requests[0].body.is_none());
        assert_eq!(requests[1].url, "https://other.test/products");
    }

    #[tokio::test]
    async fn test_body_for_non_get() {
        let h = harness();
        h.transport.push_ok(Value::Null);

        let _: () = h.client.post("/cart", &json!({"productId": "p1", "quantity": 2})).await.unwrap();

        let request = &h.transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!({"productId": "p1", "quantity": 2})));
        assert!(request.query.is_empty());
    }

    #[tokio::test]
    async fn test_bearer_header_follows_session() {
        let h = harness();
        h.transport.push_ok(Value::Null);
        h.transport.push_ok(Value::Null);

        let _: Value = h.client.get("/user/info", &()).await.unwrap();
        h.session.set_token("abc").await;
        let _: Value = h
            .client
            .get_with("/user/info", &(), |d| d.header("authorization", "Bearer stale"))
            .await
            .unwrap();

        let requests = h.transport.requests();
        assert_eq!(header(&requests[0], "Authorization"), None);
        assert_eq!(header(&requests[1], "Authorization"), Some("Bearer abc"));
        assert_eq!(requests[1].headers.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_flow() {
        let h = harness();
        h.session.set_token("expired").await;
        h.session.set_user_info(&json!({"id": "u1"})).await;
        h.transport.push_json(401, json!({"message": "token expired"}));

        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        h.events.on(Topic::Unauthorized, move |_| *counter.lock().unwrap() += 1);

        let err = h.client.get::<Value, _>("/orders", &()).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(h.session.token().await.is_none());
        assert!(h.session.user_info::<Value>().await.is_none());
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(h.presenter.count(&format!("toast:{NOTICE_LOGIN_REQUIRED}")), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(h.presenter.count("navigate:/pages/login/index"), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned_and_noticed() {
        let h = harness();
        h.transport.push_error(TransportError::Connection("refused".into()));

        let err = h.client.get::<Value, _>("/products", &()).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status(), None);
        assert_eq!(h.presenter.count(&format!("toast:{NOTICE_NETWORK_UNAVAILABLE}")), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_while_offline_reports_lost_connection() {
        let h = harness();
        h.network.update(NetworkType::None, false);
        h.transport.push_error(TransportError::Connection("refused".into()));

        let err = h.client.get::<Value, _>("/products", &()).await.unwrap_err();

        assert!(err.is_network());
        assert_eq!(h.presenter.count(&format!("toast:{NOTICE_CONNECTION_LOST}")), 1);
        assert_eq!(h.presenter.count(&format!("toast:{NOTICE_NETWORK_UNAVAILABLE}")), 0);
    }

    #[tokio::test]
    async fn test_business_error_notice_uses_server_message() {
        let h = harness();
        h.transport.push_json(200, json!({"code": 2001, "data": null, "message": "coupon expired"}));

        let err = h.client.post::<Value, _>("/orders", &json!({})).await.unwrap_err();

        assert!(matches!(err, ApiError::Business { code: 2001, .. }));
        assert_eq!(h.presenter.count("toast:coupon expired"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_indicator() {
        let h = harness();
        h.transport.set_delay(Duration::from_millis(80));
        h.transport.push_ok(json!(1));
        h.transport.push_ok(json!(2));

        let first = h.client.get::<u32, _>("/a", &());
        let second = h.client.get::<u32, _>("/b", &());
        let (a, b) = tokio::join!(first, second);
        assert!(a.is_ok() && b.is_ok());

        assert_eq!(h.presenter.count("show:"), 1);
        assert_eq!(h.presenter.count("hide"), 1);
        assert_eq!(h.presenter.calls().last().map(String::as_str), Some("hide"));
        assert_eq!(h.client.loading().pending(), 0);
    }

    #[tokio::test]
    async fn test_indicator_hidden_once_when_one_concurrent_request_fails() {
        let h = harness();
        h.transport.set_delay(Duration::from_millis(80));
        h.transport.push_ok(json!(1));
        h.transport.push_json(500, Value::Null);

        let first = h.client.get::<u32, _>("/a", &());
        let second = h.client.get::<u32, _>("/b", &());
        let (a, b) = tokio::join!(first, second);
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

        assert_eq!(h.presenter.count("show:"), 1);
        assert_eq!(h.presenter.count("hide"), 1);
        assert_eq!(h.presenter.count("toast:"), 1);
        assert_eq!(h.client.loading().pending(), 0);
        assert!(!h.client.loading().is_visible());
    }

    #[tokio::test]
    async fn test_loading_suppressed_and_custom_text() {
        let h = harness();
        h.transport.set_delay(Duration::from_millis(60));
        h.transport.push_ok(json!(1));
        h.transport.push_ok(json!(2));

        let _: u32 = h.client.get_with("/a", &(), |d| d.show_loading(false)).await.unwrap();
        assert!(h.presenter.calls().is_empty());

        let _: u32 = h.client.get_with("/b", &(), |d| d.loading_text("Fetching")).await.unwrap();
        assert_eq!(h.presenter.calls(), vec!["show:Fetching".to_string(), "hide".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_injects_token_without_loading() {
        let h = harness();
        h.session.set_token("abc").await;
        h.transport.set_delay(Duration::from_millis(60));
        h.transport.push_ok(json!({"url": "https://cdn.test/a.png"}));

        let result: Value = h
            .client
            .upload("/user/avatar", "/tmp/a.png", "avatar", UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(result["url"], "https://cdn.test/a.png");
        let upload = &h.transport.uploads()[0];
        assert_eq!(upload.url, format!("{BASE_URL}/user/avatar"));
        assert_eq!(upload.field_name, "avatar");
        assert_eq!(upload.headers, vec![("Authorization".to_string(), "Bearer abc".to_string())]);
        assert!(h.presenter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_caller_authorization_wins() {
        let h = harness();
        h.session.set_token("abc").await;
        h.transport.push_ok(Value::Null);

        let options = UploadOptions {
            headers: vec![("Authorization".into(), "Token custom".into())],
            ..Default::default()
        };
        let _: Value = h.client.upload("/files", "/tmp/x", "file", options).await.unwrap();

        let upload = &h.transport.uploads()[0];
        assert_eq!(upload.headers, vec![("Authorization".to_string(), "Token custom".to_string())]);
    }

    #[test]
    fn test_pipeline_config_from_app_config() {
        let app = AppConfig { loading_delay_ms: 100, login_path: "/login".into(), ..Default::default() };
        let config = PipelineConfig::from_app_config(&app);
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.loading_delay, Duration::from_millis(100));
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.unauthorized_redirect, Duration::from_millis(1500));
    }
}
