//! Domain layer - entries, keys, codecs and the capabilities the core consumes

pub mod cache;
pub mod codec;
pub mod error;
pub mod metrics;

pub use cache::{generate_cache_key, CacheBackend, CacheEntry, CacheKeyParams, TtlPolicy};
pub use codec::{CompressionType, EntryCodec};
pub use error::{BoxError, CacheAsideError};
pub use metrics::CacheMetrics;
