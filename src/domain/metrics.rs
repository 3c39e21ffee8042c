//! Cache metrics capability

#[cfg(test)]
use mockall::automock;

/// Counter sink for cache outcomes, keyed by call identity
#[cfg_attr(test, automock)]
pub trait CacheMetrics: Send + Sync {
    fn increment_hit(&self, name: &str);

    fn increment_miss(&self, name: &str);

    fn increment_soft_hit(&self, name: &str);
}
