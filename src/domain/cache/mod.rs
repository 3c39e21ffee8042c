//! Cache domain - entries, keys and the backend capability

mod entry;
mod key;
mod repository;

pub use entry::{CacheEntry, TtlPolicy};
pub use key::{canonical_json, generate_cache_key, CacheKeyParams};
pub use repository::CacheBackend;

#[cfg(test)]
pub use repository::mock::MockCache;
