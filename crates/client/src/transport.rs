//! HTTP transport seam and its reqwest implementation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::Value;
use shopfront_core::AppConfig;

use crate::error::TransportError;

/// A fully resolved request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A multipart file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub file_path: PathBuf,
    pub field_name: String,
    pub form_data: Vec<(String, String)>,
}

/// Raw response: status plus body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// Host networking facility.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    async fn upload(&self, request: UploadRequest) -> Result<HttpResponse, TransportError>;
}

/// Configuration for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent string (default: "shopfront/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { user_agent: "shopfront/0.1".to_string(), timeout: Duration::from_millis(20000) }
    }
}

impl TransportConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// [`Transport`] over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(TransportError::from)?;

        Ok(Self { http })
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self.http.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        Self::into_response(response).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<HttpResponse, TransportError> {
        let bytes = tokio::fs::read(&request.file_path)
            .await
            .map_err(|e| TransportError::File(format!("{}: {}", request.file_path.display(), e)))?;

        let file_name = request
            .file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.field_name.clone());

        tracing::debug!(url = %request.url, file = %file_name, bytes = bytes.len(), "uploading file");

        let mut form = Form::new().part(request.field_name.clone(), Part::bytes(bytes).file_name(file_name));
        for (name, value) in request.form_data {
            form = form.text(name, value);
        }

        let mut builder = self.http.post(&request.url).multipart(form);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        Self::into_response(response).await
    }
}
