//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHOPFRONT_*)
//! 2. TOML config file (if SHOPFRONT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Deployment environment the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Static endpoint table for one deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub base_url: &'static str,
    pub upload_url: &'static str,
    pub cdn_url: &'static str,
    pub ws_url: &'static str,
}

const DEVELOPMENT: Endpoints = Endpoints {
    base_url: "http://localhost:3000/api",
    upload_url: "http://localhost:3000/upload",
    cdn_url: "http://localhost:3000/static",
    ws_url: "ws://localhost:3000",
};

const PRODUCTION: Endpoints = Endpoints {
    base_url: "https://api.example.com",
    upload_url: "https://api.example.com/upload",
    cdn_url: "https://cdn.example.com",
    ws_url: "wss://api.example.com",
};

impl Environment {
    /// Endpoint table selected by this environment.
    pub fn endpoints(self) -> &'static Endpoints {
        match self {
            Environment::Development => &DEVELOPMENT,
            Environment::Production => &PRODUCTION,
        }
    }
}

/// Storage keys for session and shopping state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    pub token: String,
    pub user_info: String,
    pub cart_count: String,
    pub search_history: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token: "TOKEN".into(),
            user_info: "USER_INFO".into(),
            cart_count: "CART_COUNT".into(),
            search_history: "SEARCH_HISTORY".into(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHOPFRONT_*)
/// 2. TOML config file (if SHOPFRONT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment selecting the endpoint table.
    ///
    /// Set via SHOPFRONT_ENVIRONMENT environment variable.
    #[serde(default)]
    pub environment: Environment,

    /// Overrides the environment's API base URL when set.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path to the SQLite database backing persistent storage.
    ///
    /// Set via SHOPFRONT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix namespacing every persistent key.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,

    /// Default expiry for persistent and cached entries in milliseconds.
    #[serde(default = "default_expire_ms")]
    pub default_expire_ms: u64,

    /// Version tag stamped on cache entries; bumping it invalidates them.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// TTL for memoized API responses in milliseconds.
    #[serde(default = "default_api_cache_ttl_ms")]
    pub api_cache_ttl_ms: u64,

    /// Debounce before the loading indicator appears, in milliseconds.
    #[serde(default = "default_loading_delay_ms")]
    pub loading_delay_ms: u64,

    /// Default loading indicator text.
    #[serde(default = "default_loading_text")]
    pub loading_text: String,

    /// Screen path the client is redirected to after a 401.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Delay between the 401 notice and the login redirect, in milliseconds.
    #[serde(default = "default_unauthorized_redirect_ms")]
    pub unauthorized_redirect_ms: u64,

    /// Additional attempts made by the retry wrapper.
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    /// Initial retry backoff in milliseconds (doubled after each failure).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHOPFRONT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How often the connectivity check re-reads the API host, in milliseconds.
    #[serde(default = "default_connectivity_interval_ms")]
    pub connectivity_interval_ms: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub storage_keys: StorageKeys,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shopfront.sqlite")
}

fn default_storage_prefix() -> String {
    "app_".into()
}

fn default_expire_ms() -> u64 {
    7 * 24 * 60 * 60 * 1000
}

fn default_cache_version() -> String {
    "1.0.0".into()
}

fn default_api_cache_ttl_ms() -> u64 {
    5 * 60 * 1000
}

fn default_loading_delay_ms() -> u64 {
    300
}

fn default_loading_text() -> String {
    "Loading...".into()
}

fn default_login_path() -> String {
    "/pages/login/index".into()
}

fn default_unauthorized_redirect_ms() -> u64 {
    1500
}

fn default_retry_times() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_connectivity_interval_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "shopfront/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            db_path: default_db_path(),
            storage_prefix: default_storage_prefix(),
            default_expire_ms: default_expire_ms(),
            cache_version: default_cache_version(),
            api_cache_ttl_ms: default_api_cache_ttl_ms(),
            loading_delay_ms: default_loading_delay_ms(),
            loading_text: default_loading_text(),
            login_path: default_login_path(),
            unauthorized_redirect_ms: default_unauthorized_redirect_ms(),
            retry_times: default_retry_times(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            connectivity_interval_ms: default_connectivity_interval_ms(),
            user_agent: default_user_agent(),
            storage_keys: StorageKeys::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHOPFRONT_`
    /// 2. TOML file from `SHOPFRONT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("SHOPFRONT_CONFIG_FILE").ok().map(PathBuf::from);
        Self::load_from(config_path)
    }

    /// Load configuration with an explicit TOML file instead of `SHOPFRONT_CONFIG_FILE`.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("SHOPFRONT_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// API base URL: the explicit override, else the environment's table entry.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.environment.endpoints().base_url)
    }

    pub fn default_expire(&self) -> Duration {
        Duration::from_millis(self.default_expire_ms)
    }

    pub fn api_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.api_cache_ttl_ms)
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }

    pub fn unauthorized_redirect(&self) -> Duration {
        Duration::from_millis(self.unauthorized_redirect_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connectivity_interval(&self) -> Duration {
        Duration::from_millis(self.connectivity_interval_ms)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
