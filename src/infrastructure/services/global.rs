//! Process-wide service instance

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::CacheAsideConfig;
use crate::domain::CacheAsideError;

use super::cache_aside_service::{CacheAsideService, CustomProviders};

static SERVICE: OnceCell<Arc<CacheAsideService>> = OnceCell::const_new();

/// Builds the shared service once
///
/// The first successful call wins. Later calls return the existing instance
/// and ignore their arguments. A failed call leaves nothing behind, so
/// initialization can be retried.
pub async fn init(
    config: &CacheAsideConfig,
    providers: CustomProviders,
) -> Result<Arc<CacheAsideService>, CacheAsideError> {
    if let Some(service) = SERVICE.get() {
        debug!("Cache-aside service already initialized, ignoring new configuration");
        return Ok(service.clone());
    }

    let service = SERVICE
        .get_or_try_init(|| async move {
            CacheAsideService::from_config(config, providers)
                .await
                .map(Arc::new)
        })
        .await?;

    Ok(service.clone())
}

/// Returns the shared service
pub fn instance() -> Result<Arc<CacheAsideService>, CacheAsideError> {
    SERVICE.get().cloned().ok_or_else(|| {
        CacheAsideError::configuration("cache-aside service has not been initialized")
    })
}
