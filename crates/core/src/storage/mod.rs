//! Persistent key-value storage.
//!
//! - `PlatformStorage` is the host facility (SQLite via tokio-rusqlite, or memory)
//! - `KvStore` adds key prefixing and expiry envelopes with a silent-fail policy
//! - Session helpers give typed access to token, profile, cart count and search history

pub mod connection;
pub mod kv;
pub mod migrations;
pub mod platform;
pub mod session;

pub use connection::StorageDb;
pub use kv::{DEFAULT_EXPIRE, DEFAULT_PREFIX, KvStore, StorageEnvelope};
pub use platform::{MemoryStorage, PlatformStorage, SqliteStorage};
pub use session::{CartCounter, SearchHistory, UserSession};
