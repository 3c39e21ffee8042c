//! Detached cache writes and soft-hit refreshes

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{BoxError, CacheAsideError, CacheBackend, CacheEntry, EntryCodec, TtlPolicy};

/// Predicate deciding whether a remote response may be cached
pub type WriteGuard<Resp> = Arc<dyn Fn(&Resp) -> bool + Send + Sync>;

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs cache work on tasks that outlive the triggering request
///
/// Every failure inside a detached task is logged and dropped. The returned
/// handles are only useful to tests; callers normally discard them.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    backend: Arc<dyn CacheBackend>,
    codec: EntryCodec,
    refresh_timeout: Duration,
    write_timeout: Duration,
}

impl RefreshScheduler {
    pub fn new(backend: Arc<dyn CacheBackend>, codec: EntryCodec) -> Self {
        Self {
            backend,
            codec,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Bounds the remote call made by a background refresh
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Bounds each backend write
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Re-runs `remote` in the background and stores its result with the hard TTL
    pub fn schedule_refresh<Resp, F, Fut, E>(
        &self,
        key: String,
        identity: String,
        ttl: TtlPolicy,
        write_guard: WriteGuard<Resp>,
        remote: F,
    ) -> Option<JoinHandle<()>>
    where
        Resp: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let handle = current_runtime(&identity, &key)?;

        let backend = self.backend.clone();
        let codec = self.codec;
        let refresh_timeout = self.refresh_timeout;
        let write_timeout = self.write_timeout;

        Some(handle.spawn(async move {
            let response = match tokio::time::timeout(refresh_timeout, remote()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let e: BoxError = e.into();
                    warn!(call = %identity, key = %key, error = %e, "Background refresh failed");
                    return;
                }
                Err(_) => {
                    warn!(
                        call = %identity,
                        key = %key,
                        timeout_secs = refresh_timeout.as_secs(),
                        "Background refresh timed out"
                    );
                    return;
                }
            };

            if !write_guard(&response) {
                debug!(call = %identity, key = %key, "Refreshed response rejected by write guard");
                return;
            }

            let entry = match CacheEntry::from_response(&response, ttl.soft_ttl()) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(call = %identity, key = %key, error = %e, "Unable to build refreshed entry");
                    return;
                }
            };

            match write_entry(
                backend.as_ref(),
                codec,
                write_timeout,
                &key,
                &entry,
                ttl.hard_ttl(),
            )
            .await
            {
                Ok(()) => debug!(call = %identity, key = %key, "Cache entry refreshed"),
                Err(e) => warn!(call = %identity, key = %key, error = %e, "Refresh write failed"),
            }
        }))
    }

    /// Persists an already-built entry without blocking the caller
    pub fn schedule_write(
        &self,
        key: String,
        identity: String,
        entry: CacheEntry,
        hard_ttl: Duration,
    ) -> Option<JoinHandle<()>> {
        let handle = current_runtime(&identity, &key)?;

        let backend = self.backend.clone();
        let codec = self.codec;
        let write_timeout = self.write_timeout;

        Some(handle.spawn(async move {
            match write_entry(backend.as_ref(), codec, write_timeout, &key, &entry, hard_ttl).await
            {
                Ok(()) => debug!(call = %identity, key = %key, "Cache entry stored"),
                Err(e) => warn!(call = %identity, key = %key, error = %e, "Cache write failed"),
            }
        }))
    }
}

fn current_runtime(identity: &str, key: &str) -> Option<Handle> {
    match Handle::try_current() {
        Ok(handle) => Some(handle),
        Err(_) => {
            warn!(call = %identity, key = %key, "No async runtime available, skipping background cache work");
            None
        }
    }
}

/// Encodes `entry` and stores it under `key`
pub(crate) async fn write_entry(
    backend: &dyn CacheBackend,
    codec: EntryCodec,
    timeout: Duration,
    key: &str,
    entry: &CacheEntry,
    hard_ttl: Duration,
) -> Result<(), CacheAsideError> {
    let bytes = codec.encode(entry)?;

    tokio::time::timeout(timeout, backend.set(key, bytes, hard_ttl))
        .await
        .map_err(|_| {
            CacheAsideError::timeout(format!("cache write exceeded {}ms", timeout.as_millis()))
        })?
}
