//! Connectivity state and retry policy.
//!
//! `NetworkTracker` holds the last known link type and online flag, announces
//! transitions on the event bus, and gates retried requests on connectivity.

pub mod retry;
pub mod source;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::events::{EventBus, Topic};

pub use retry::NetworkOffline;
pub use source::{ChannelSource, ConnectivityChange, ConnectivitySource};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Link type as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkType {
    Wifi,
    Cellular4g,
    Cellular3g,
    Cellular2g,
    None,
    #[default]
    Unknown,
}

impl NetworkType {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkType::Wifi => "wifi",
            NetworkType::Cellular4g => "4g",
            NetworkType::Cellular3g => "3g",
            NetworkType::Cellular2g => "2g",
            NetworkType::None => "none",
            NetworkType::Unknown => "unknown",
        }
    }

    /// Parse a platform string; anything unrecognised is `Unknown`.
    pub fn from_platform(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "wifi" => NetworkType::Wifi,
            "4g" => NetworkType::Cellular4g,
            "3g" => NetworkType::Cellular3g,
            "2g" => NetworkType::Cellular2g,
            "none" => NetworkType::None,
            _ => NetworkType::Unknown,
        }
    }
}

impl Serialize for NetworkType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NetworkType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(NetworkType::from_platform(&name))
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of connectivity; also the `NETWORK_STATUS_CHANGE` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    pub is_online: bool,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self { network_type: NetworkType::Unknown, is_online: true }
    }
}

/// Shared connectivity state. Clones observe the same state.
#[derive(Clone)]
pub struct NetworkTracker {
    status: Arc<RwLock<NetworkStatus>>,
    events: EventBus,
    retry_times: u32,
    retry_delay: Duration,
}

impl NetworkTracker {
    /// Start at `{unknown, online}` with the default retry policy.
    pub fn new(events: EventBus) -> Self {
        Self {
            status: Arc::new(RwLock::new(NetworkStatus::default())),
            events,
            retry_times: DEFAULT_RETRY_TIMES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn from_config(events: EventBus, config: &AppConfig) -> Self {
        Self::new(events).with_retry_policy(config.retry_times, config.retry_delay())
    }

    pub fn with_retry_policy(mut self, retry_times: u32, retry_delay: Duration) -> Self {
        self.retry_times = retry_times;
        self.retry_delay = retry_delay;
        self
    }

    pub fn retry_times(&self) -> u32 {
        self.retry_times
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Apply a platform report and announce it.
    ///
    /// `NETWORK_STATUS_CHANGE` fires on every update; `NETWORK_ONLINE` or
    /// `NETWORK_OFFLINE` fires only when the online flag flipped.
    pub fn update(&self, network_type: NetworkType, is_connected: bool) -> NetworkStatus {
        let (previous, current) = {
            let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
            let previous = *status;
            status.network_type = network_type;
            status.is_online = network_type != NetworkType::None && is_connected;
            (previous, *status)
        };

        tracing::debug!(
            network_type = %current.network_type,
            is_online = current.is_online,
            "network status updated"
        );

        match serde_json::to_value(current) {
            Ok(payload) => {
                self.events.emit(Topic::NetworkStatusChange, &payload);
            }
            Err(e) => tracing::error!(error = %e, "network status not serializable"),
        }

        if previous.is_online != current.is_online {
            let topic = if current.is_online { Topic::NetworkOnline } else { Topic::NetworkOffline };
            self.events.emit(topic, &serde_json::Value::Null);
        }

        current
    }

    pub fn status(&self) -> NetworkStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online
    }

    pub fn is_wifi(&self) -> bool {
        self.status().network_type == NetworkType::Wifi
    }

    /// Follow `source` for the rest of the process.
    ///
    /// The current type is queried and applied as connected before this
    /// returns; each later change is applied on a spawned task until the source
    /// closes. A failed initial query is logged and leaves the state untouched.
    pub async fn watch<S: ConnectivitySource>(&self, mut source: S) -> JoinHandle<()> {
        match source.current_type().await {
            Ok(network_type) => {
                self.update(network_type, true);
            }
            Err(e) => tracing::error!(error = %e, "failed to query network type"),
        }

        let tracker = self.clone();
        tokio::spawn(async move {
            while let Some(change) = source.next_change().await {
                tracker.update(change.network_type, change.is_connected);
            }

            tracing::debug!("connectivity source closed");
        })
    }
}
