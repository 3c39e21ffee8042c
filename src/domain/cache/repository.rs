//! Cache backend capability

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::CacheAsideError;

/// Byte-oriented key/value store with a per-entry expiry hint
///
/// Implementations are free to evict earlier than `ttl`; callers treat a
/// missing key and an evicted key identically.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Gets the raw bytes stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheAsideError>;

    /// Stores `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheAsideError>;
}
