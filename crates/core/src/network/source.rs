//! Connectivity feeds from the host platform.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::NetworkType;
use crate::Error;

/// One platform notification: the new link type and whether it carries traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityChange {
    pub network_type: NetworkType,
    pub is_connected: bool,
}

impl ConnectivityChange {
    pub fn new(network_type: NetworkType, is_connected: bool) -> Self {
        Self { network_type, is_connected }
    }
}

/// Host connectivity facility.
#[async_trait]
pub trait ConnectivitySource: Send + 'static {
    /// Query the current link type once.
    async fn current_type(&mut self) -> Result<NetworkType, Error>;

    /// Wait for the next change; `None` once the platform stops reporting.
    async fn next_change(&mut self) -> Option<ConnectivityChange>;
}

/// Source fed through an mpsc channel by platform glue code.
pub struct ChannelSource {
    initial: Option<NetworkType>,
    changes: mpsc::Receiver<ConnectivityChange>,
}

impl ChannelSource {
    /// Create a source reporting `initial` as the current type, plus the sender for changes.
    pub fn new(initial: NetworkType, buffer: usize) -> (Self, mpsc::Sender<ConnectivityChange>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { initial: Some(initial), changes: rx }, tx)
    }
}

#[async_trait]
impl ConnectivitySource for ChannelSource {
    async fn current_type(&mut self) -> Result<NetworkType, Error> {
        self.initial
            .take()
            .ok_or_else(|| Error::Platform("current network type already consumed".into()))
    }

    async fn next_change(&mut self) -> Option<ConnectivityChange> {
        self.changes.recv().await
    }
}
