//! Stale-while-revalidate cache-aside orchestration

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CacheAsideConfig;
use crate::domain::{
    generate_cache_key, BoxError, CacheAsideError, CacheBackend, CacheEntry, CacheMetrics,
    CompressionType, EntryCodec, TtlPolicy,
};
use crate::infrastructure::cache::{CacheFactory, InMemoryCache};
use crate::infrastructure::metrics::{MetricsType, RecorderMetrics};

use super::refresh_scheduler::{RefreshScheduler, WriteGuard};

/// Predicate deciding whether a call may be served from the cache
pub type ReadGuard = Arc<dyn Fn() -> bool + Send + Sync>;

const DEFAULT_CACHE_OPERATION_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call overrides
pub struct CallOptions<Resp> {
    ttl: Option<TtlPolicy>,
    read_guard: ReadGuard,
    write_guard: WriteGuard<Resp>,
}

impl<Resp> CallOptions<Resp> {
    /// Default TTLs, always read, always write
    pub fn new() -> Self {
        Self {
            ttl: None,
            read_guard: Arc::new(|| true),
            write_guard: Arc::new(|_: &Resp| true),
        }
    }

    pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returning false skips the cache read and goes straight to the remote call
    pub fn with_read_guard(mut self, guard: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.read_guard = Arc::new(guard);
        self
    }

    /// Returning false keeps a remote response out of the cache
    pub fn with_write_guard(
        mut self,
        guard: impl Fn(&Resp) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.write_guard = Arc::new(guard);
        self
    }
}

impl<Resp> Default for CallOptions<Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Resp> Clone for CallOptions<Resp> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            read_guard: self.read_guard.clone(),
            write_guard: self.write_guard.clone(),
        }
    }
}

/// Caller-supplied capabilities used by the `custom` providers
#[derive(Clone, Default)]
pub struct CustomProviders {
    pub cache: Option<Arc<dyn CacheBackend>>,
    pub metrics: Option<Arc<dyn CacheMetrics>>,
}

impl CustomProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl fmt::Debug for CustomProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomProviders")
            .field("cache", &self.cache)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Wraps remote calls with a stale-while-revalidate cache
///
/// A fresh entry is returned as is. A stale entry (older than its soft TTL) is
/// still returned, and a background task re-runs the remote call to replace
/// it. Anything else, including every cache failure, falls through to the
/// remote call. The only errors a caller sees are the remote call's own error
/// and a cached payload that no longer fits the response type.
pub struct CacheAsideService {
    backend: Arc<dyn CacheBackend>,
    metrics: Option<Arc<dyn CacheMetrics>>,
    codec: EntryCodec,
    scheduler: RefreshScheduler,
    default_ttl: TtlPolicy,
    version: String,
    cache_operation_timeout: Duration,
    refresh_timeout: Duration,
    skip_cache: AtomicBool,
}

impl CacheAsideService {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: TtlPolicy) -> Self {
        let codec = EntryCodec::default();
        let scheduler = RefreshScheduler::new(backend.clone(), codec)
            .with_refresh_timeout(DEFAULT_REFRESH_TIMEOUT)
            .with_write_timeout(DEFAULT_CACHE_OPERATION_TIMEOUT);

        Self {
            backend,
            metrics: None,
            codec,
            scheduler,
            default_ttl,
            version: String::new(),
            cache_operation_timeout: DEFAULT_CACHE_OPERATION_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            skip_cache: AtomicBool::new(false),
        }
    }

    /// Builds the service described by `config`
    ///
    /// With `skip_cache` set the configuration is not validated and no
    /// networked backend is contacted; an in-process cache stands in so the
    /// toggle can be flipped later.
    pub async fn from_config(
        config: &CacheAsideConfig,
        providers: CustomProviders,
    ) -> Result<Self, CacheAsideError> {
        let (backend, default_ttl) = if config.skip_cache {
            let soft = config.default_soft_ttl();
            let ttl = TtlPolicy::new(soft, config.default_hard_ttl().max(soft))?;
            let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
            (backend, ttl)
        } else {
            config.validate()?;
            let ttl = config.default_ttl_policy()?;
            let backend = CacheFactory::new()
                .create(&config.cache, providers.cache)
                .await?;
            (backend, ttl)
        };

        let metrics: Option<Arc<dyn CacheMetrics>> = if config.metrics.enabled {
            match config.metrics.provider {
                MetricsType::Recorder => {
                    Some(Arc::new(RecorderMetrics::new()) as Arc<dyn CacheMetrics>)
                }
                MetricsType::Custom => Some(providers.metrics.ok_or_else(|| {
                    CacheAsideError::configuration(
                        "custom metrics provider selected but no sink was supplied",
                    )
                })?),
            }
        } else {
            None
        };

        let mut service = Self::new(backend, default_ttl)
            .with_compression(config.compression)
            .with_version(config.version.clone())
            .with_cache_operation_timeout(config.timeouts.cache_operation())
            .with_refresh_timeout(config.timeouts.background_refresh())
            .with_skip_cache(config.skip_cache);

        if let Some(metrics) = metrics {
            service = service.with_metrics(metrics);
        }

        debug!(
            provider = %config.cache.provider,
            compression = %config.compression,
            skip_cache = config.skip_cache,
            "Cache-aside service initialized"
        );

        Ok(service)
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.codec = EntryCodec::new(compression);
        self.rebuild_scheduler();
        self
    }

    /// Tag appended to every key
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Bounds each backend read and write
    pub fn with_cache_operation_timeout(mut self, timeout: Duration) -> Self {
        self.cache_operation_timeout = timeout;
        self.rebuild_scheduler();
        self
    }

    /// Bounds the remote call made by a background refresh
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self.rebuild_scheduler();
        self
    }

    pub fn with_skip_cache(self, skip: bool) -> Self {
        self.set_skip_cache(skip);
        self
    }

    /// Turns the cache off (or back on) for every subsequent call
    pub fn set_skip_cache(&self, skip: bool) {
        self.skip_cache.store(skip, Ordering::Relaxed);
    }

    pub fn is_cache_skipped(&self) -> bool {
        self.skip_cache.load(Ordering::Relaxed)
    }

    pub fn default_ttl(&self) -> TtlPolicy {
        self.default_ttl
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn compression(&self) -> CompressionType {
        self.codec.compression()
    }

    fn rebuild_scheduler(&mut self) {
        self.scheduler = RefreshScheduler::new(self.backend.clone(), self.codec)
            .with_refresh_timeout(self.refresh_timeout)
            .with_write_timeout(self.cache_operation_timeout);
    }

    /// Cached call using the default TTLs
    pub async fn call<Req, Resp, F, Fut, E>(
        &self,
        identity: &str,
        request: Option<&Req>,
        remote: F,
    ) -> Result<Resp, CacheAsideError>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.get(identity, request, CallOptions::new(), remote).await
    }

    /// Cached call with explicit TTLs; a soft TTL above the hard TTL is rejected
    pub async fn call_with_ttl<Req, Resp, F, Fut, E>(
        &self,
        identity: &str,
        request: Option<&Req>,
        soft_ttl: Duration,
        hard_ttl: Duration,
        remote: F,
    ) -> Result<Resp, CacheAsideError>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let ttl = TtlPolicy::new(soft_ttl, hard_ttl)?;
        self.get(identity, request, CallOptions::new().with_ttl(ttl), remote)
            .await
    }

    /// Serves `identity` + `request` from the cache, falling back to `remote`
    ///
    /// `remote` must already capture the request it sends; `request` only
    /// contributes to the cache key. When the cached entry is stale, `remote`
    /// runs on a detached task that keeps going even if this future is dropped.
    pub async fn get<Req, Resp, F, Fut, E>(
        &self,
        identity: &str,
        request: Option<&Req>,
        options: CallOptions<Resp>,
        remote: F,
    ) -> Result<Resp, CacheAsideError>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Resp, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        if self.is_cache_skipped() {
            return invoke_remote(remote).await;
        }

        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let key = match generate_cache_key(
            request,
            identity,
            ttl.soft_ttl(),
            ttl.hard_ttl(),
            &self.version,
        ) {
            Ok(key) => key,
            Err(e) => {
                warn!(call = %identity, error = %e, "Unable to derive cache key, calling remote uncached");
                return invoke_remote(remote).await;
            }
        };

        let cached = if (options.read_guard)() {
            self.probe(identity, &key).await
        } else {
            debug!(call = %identity, key = %key, "Cache read bypassed");
            None
        };

        let Some(entry) = cached else {
            return self
                .handle_miss(identity, key, ttl, options.write_guard, remote)
                .await;
        };

        if entry.is_stale() {
            debug!(call = %identity, key = %key, "Cache soft hit, refreshing in background");
            self.emit(|m| m.increment_soft_hit(identity));
            self.scheduler.schedule_refresh(
                key,
                identity.to_string(),
                ttl,
                options.write_guard,
                remote,
            );
        } else {
            debug!(call = %identity, key = %key, "Cache hit");
        }

        self.emit(|m| m.increment_hit(identity));
        entry.to_response()
    }

    /// Reads and decodes the entry at `key`; every failure reads as a miss
    async fn probe(&self, identity: &str, key: &str) -> Option<CacheEntry> {
        let bytes =
            match tokio::time::timeout(self.cache_operation_timeout, self.backend.get(key)).await {
                Ok(Ok(Some(bytes))) => bytes,
                Ok(Ok(None)) => {
                    debug!(call = %identity, key = %key, "Cache miss");
                    return None;
                }
                Ok(Err(e)) => {
                    warn!(call = %identity, key = %key, error = %e, "Cache read failed, treating as miss");
                    return None;
                }
                Err(_) => {
                    warn!(
                        call = %identity,
                        key = %key,
                        timeout_ms = self.cache_operation_timeout.as_millis() as u64,
                        "Cache read timed out, treating as miss"
                    );
                    return None;
                }
            };

        match self.codec.decode(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(call = %identity, key = %key, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    async fn handle_miss<Resp, F, Fut, E>(
        &self,
        identity: &str,
        key: String,
        ttl: TtlPolicy,
        write_guard: WriteGuard<Resp>,
        remote: F,
    ) -> Result<Resp, CacheAsideError>
    where
        Resp: Serialize + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
        E: Into<BoxError>,
    {
        self.emit(|m| m.increment_miss(identity));

        let response = invoke_remote(remote).await?;

        if !write_guard(&response) {
            debug!(call = %identity, key = %key, "Response rejected by write guard");
            return Ok(response);
        }

        match CacheEntry::from_response(&response, ttl.soft_ttl()) {
            Ok(entry) => {
                self.scheduler
                    .schedule_write(key, identity.to_string(), entry, ttl.hard_ttl());
            }
            Err(e) => {
                warn!(call = %identity, key = %key, error = %e, "Unable to cache response");
            }
        }

        Ok(response)
    }

    fn emit(&self, record: impl FnOnce(&dyn CacheMetrics)) {
        if let Some(metrics) = &self.metrics {
            record(metrics.as_ref());
        }
    }
}

async fn invoke_remote<Resp, F, Fut, E>(remote: F) -> Result<Resp, CacheAsideError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Resp, E>>,
    E: Into<BoxError>,
{
    remote().await.map_err(CacheAsideError::remote_call)
}

impl fmt::Debug for CacheAsideService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAsideService")
            .field("backend", &self.backend)
            .field("metrics", &self.metrics.is_some())
            .field("compression", &self.codec.compression())
            .field("default_ttl", &self.default_ttl)
            .field("version", &self.version)
            .field("skip_cache", &self.is_cache_skipped())
            .finish_non_exhaustive()
    }
}
