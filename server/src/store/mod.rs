//! Key-Value Storage
//!
//! The broker persists two kinds of records, both as JSON strings:
//! workspace records (no TTL) and OAuth flow states (short TTL, consumed once).
//! Core logic only sees the [`KvStore`] trait.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal get/put/delete-by-key interface.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value, `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a value, replacing any previous one. `ttl = None` never expires.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically fetch and remove a value (single-use records).
    async fn take(&self, key: &str) -> StoreResult<Option<String>>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}
