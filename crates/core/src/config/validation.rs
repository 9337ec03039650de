//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `default_expire_ms` is 0
    /// - `connectivity_interval_ms` is below one second
    /// - `user_agent` or `cache_version` is empty
    /// - `base_url` override is not an http(s) URL
    ///
    /// Returns `ConfigError::Missing` if the token storage key is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.default_expire_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "default_expire_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.connectivity_interval_ms < 1000 {
            return Err(ConfigError::Invalid {
                field: "connectivity_interval_ms".into(),
                reason: "must be at least 1000ms".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if let Some(base_url) = &self.base_url
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "base_url".into(),
                reason: format!("must be an http(s) URL, got {base_url}"),
            });
        }

        if self.storage_keys.token.is_empty() {
            return Err(ConfigError::Missing {
                field: "storage_keys.token".into(),
                hint: "Set SHOPFRONT_STORAGE_KEYS__TOKEN or remove the override".into(),
            });
        }

        if self.storage_prefix.is_empty() {
            tracing::warn!("storage_prefix is empty; persistent keys share the table with other consumers");
        }

        Ok(())
    }
}
