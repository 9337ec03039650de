//! Core state layer for the shopfront client.
//!
//! This crate provides:
//! - Persistent key-value storage with SQLite backend and expiry envelopes
//! - Layered memory + storage cache with versioning
//! - Connectivity tracking and retry with backoff
//! - Event bus for cross-component notifications
//! - Configuration loading and the unified storage error

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod storage;

pub use cache::{ApiCache, CacheOptions, CacheStrategy, DataCache, LayeredCache};
pub use config::{AppConfig, ConfigError, Environment};
pub use error::Error;
pub use events::{EventBus, SubscriptionId, Topic};
pub use network::{NetworkOffline, NetworkStatus, NetworkTracker, NetworkType};
pub use storage::{KvStore, MemoryStorage, PlatformStorage, SqliteStorage, StorageDb};
