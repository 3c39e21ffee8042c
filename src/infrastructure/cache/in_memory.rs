//! Process-local backend on moka

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use serde::Deserialize;

use crate::domain::{CacheAsideError, CacheBackend};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InMemoryCacheConfig {
    /// Entry count bound; moka evicts past it
    pub max_capacity: u64,
    /// Evict entries untouched for this long, independent of their hard TTL
    pub time_to_idle_secs: Option<u64>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_idle_secs: None,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_time_to_idle(mut self, idle: Duration) -> Self {
        self.time_to_idle_secs = Some(idle.as_secs());
        self
    }
}

#[derive(Debug, Clone)]
struct ExpiringBytes {
    bytes: Vec<u8>,
    deadline_ms: i64,
}

impl ExpiringBytes {
    fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.deadline_ms
    }
}

/// Bytes held in process memory until their hard TTL passes
///
/// moka's own expiry is cache-wide, so each value carries its own deadline
/// and is dropped lazily on read.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: MokaCache<String, ExpiringBytes>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(idle_secs) = config.time_to_idle_secs {
            builder = builder.time_to_idle(Duration::from_secs(idle_secs));
        }

        Self {
            entries: builder.build(),
        }
    }

    /// Number of stored values, expired ones included until read
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheAsideError> {
        let Some(value) = self.entries.get(key).await else {
            return Ok(None);
        };

        if value.is_expired_at(now_ms()) {
            self.entries.invalidate(key).await;
            return Ok(None);
        }

        Ok(Some(value.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheAsideError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let stored = ExpiringBytes {
            bytes: value,
            deadline_ms: now_ms().saturating_add(ttl_ms),
        };

        self.entries.insert(key.to_string(), stored).await;
        Ok(())
    }
}
