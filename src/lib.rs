//! Stale-while-revalidate cache-aside for remote calls
//!
//! Wraps any async remote call with a cache that:
//! - serves fresh entries without calling the remote
//! - serves stale entries immediately and refreshes them in the background
//! - falls back to the remote on any cache failure
//!
//! ```no_run
//! use swr_cache::{CacheAsideConfig, CacheAsideService, CustomProviders};
//!
//! # async fn example() -> Result<(), swr_cache::CacheAsideError> {
//! let config = CacheAsideConfig::load()?;
//! let service = CacheAsideService::from_config(&config, CustomProviders::new()).await?;
//!
//! let greeting: String = service
//!     .call("Greeter/Hello", Some(&"world"), || async {
//!         Ok::<_, std::io::Error>("hello world".to_string())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::CacheAsideConfig;
pub use domain::{
    generate_cache_key, BoxError, CacheAsideError, CacheBackend, CacheEntry, CacheMetrics,
    CompressionType, EntryCodec, TtlPolicy,
};
pub use infrastructure::services::{global, CacheAsideService, CallOptions, CustomProviders};
