//! Failures surfaced by the command line front-end.

use shopfront_client::{ApiError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("STORAGE_ERROR: {0}")]
    Storage(#[from] shopfront_core::Error),

    #[error("TRANSPORT_ERROR: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("NOT_LOGGED_IN: run `shopfront login` first")]
    NotLoggedIn,

    #[error("OUTPUT_ERROR: {0}")]
    Output(#[from] serde_json::Error),
}
