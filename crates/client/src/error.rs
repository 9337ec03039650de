//! Request pipeline error types.

use std::sync::Arc;

use serde_json::Value;
use shopfront_core::NetworkOffline;

/// Transport-level failures: the request never produced an HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Host unreachable or connection refused.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Other network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Upload source could not be read.
    #[error("file error: {0}")]
    File(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Network(Arc::new(err))
        }
    }
}

/// Caller-facing failure of a pipeline request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No HTTP response was received.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(#[from] TransportError),

    /// Skipped because the network tracker reports offline.
    #[error("NETWORK_OFFLINE: network is offline")]
    Offline,

    /// Non-200 HTTP status.
    #[error("HTTP_ERROR: status {status}")]
    Http { status: u16, body: Value },

    /// HTTP 200 with a non-zero business code.
    #[error("BUSINESS_ERROR: code {code}: {message}")]
    Business { code: i64, message: String, body: Value },

    /// HTTP 200 whose payload did not match the expected shape.
    #[error("DECODE_ERROR: {0}")]
    Decode(String),

    /// Request parameters could not be encoded.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status of the response; `None` when no response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Business { .. } | ApiError::Decode(_) => Some(200),
            ApiError::Transport(_) | ApiError::Offline | ApiError::InvalidRequest(_) => None,
        }
    }

    /// Response body, when one was received and parsed.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Http { body, .. } | ApiError::Business { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The server's `message` field, if it sent a non-empty one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Business { message, .. } if !message.is_empty() => Some(message),
            ApiError::Http { body, .. } => body
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty()),
            _ => None,
        }
    }

    /// True for failures that never reached the server.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Offline)
    }
}

impl From<NetworkOffline> for ApiError {
    fn from(_: NetworkOffline) -> Self {
        ApiError::Offline
    }
}
