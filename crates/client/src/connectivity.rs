//! Connectivity detection by checking the API host.
//!
//! Headless runs have no platform network callback, so reachability of the
//! configured base URL stands in for it. Any HTTP response counts as
//! connected; a transport failure counts as disconnected.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use shopfront_core::Error;
use shopfront_core::network::{ConnectivityChange, ConnectivitySource, NetworkType};

use crate::transport::{HttpRequest, Transport};

/// [`ConnectivitySource`] that sends a `HEAD` to `url` every `interval`.
pub struct ReachabilitySource {
    transport: Arc<dyn Transport>,
    url: String,
    interval: Duration,
    last: Option<bool>,
}

impl ReachabilitySource {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>, interval: Duration) -> Self {
        Self { transport, url: url.into(), interval, last: None }
    }

    async fn check(&self) -> bool {
        let request = HttpRequest {
            method: Method::HEAD,
            url: self.url.clone(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        };
        match self.transport.send(request).await {
            Ok(response) => {
                tracing::debug!(url = %self.url, status = response.status, "api host reachable");
                true
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "api host unreachable");
                false
            }
        }
    }
}

fn network_type(reachable: bool) -> NetworkType {
    if reachable { NetworkType::Unknown } else { NetworkType::None }
}

#[async_trait]
impl ConnectivitySource for ReachabilitySource {
    async fn current_type(&mut self) -> Result<NetworkType, Error> {
        let reachable = self.check().await;
        self.last = Some(reachable);
        Ok(network_type(reachable))
    }

    /// Re-check on the interval and report only transitions. Never closes.
    async fn next_change(&mut self) -> Option<ConnectivityChange> {
        loop {
            tokio::time::sleep(self.interval).await;
            let reachable = self.check().await;
            if self.last != Some(reachable) {
                self.last = Some(reachable);
                return Some(ConnectivityChange::new(network_type(reachable), reachable));
            }
        }
    }
}
