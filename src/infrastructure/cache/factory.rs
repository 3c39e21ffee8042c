//! Cache factory for runtime selection

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{CacheAsideError, CacheBackend};

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Caller-supplied backend
    Custom,
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis, single node or cluster
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::Custom => write!(f, "custom"),
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = CacheAsideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "custom" => Ok(CacheType::Custom),
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(CacheAsideError::configuration(format!(
                "Unknown cache type: {}. Valid types: custom, in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub provider: CacheType,
    pub in_memory: InMemoryCacheConfig,
    /// Required for the Redis provider
    pub redis: Option<RedisCacheConfig>,
}

impl CacheConfig {
    pub fn custom() -> Self {
        Self {
            provider: CacheType::Custom,
            ..Default::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            provider: CacheType::InMemory,
            ..Default::default()
        }
    }

    pub fn redis(config: RedisCacheConfig) -> Self {
        Self {
            provider: CacheType::Redis,
            redis: Some(config),
            ..Default::default()
        }
    }

    pub fn with_in_memory(mut self, config: InMemoryCacheConfig) -> Self {
        self.in_memory = config;
        self
    }

    /// Checks that the selected provider has what it needs
    pub fn validate(&self) -> Result<(), CacheAsideError> {
        match self.provider {
            CacheType::Custom | CacheType::InMemory => Ok(()),
            CacheType::Redis => match &self.redis {
                Some(redis) => redis.validate(),
                None => Err(CacheAsideError::configuration("redis configuration is missing")),
            },
        }
    }
}

/// Factory for creating cache backends
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the configured backend; `custom` is used only for the custom provider
    pub async fn create(
        &self,
        config: &CacheConfig,
        custom: Option<Arc<dyn CacheBackend>>,
    ) -> Result<Arc<dyn CacheBackend>, CacheAsideError> {
        config.validate()?;

        match config.provider {
            CacheType::Custom => custom.ok_or_else(|| {
                CacheAsideError::configuration(
                    "custom cache provider selected but no backend was supplied",
                )
            }),
            CacheType::InMemory => Ok(Arc::new(InMemoryCache::with_config(
                config.in_memory.clone(),
            ))),
            CacheType::Redis => {
                let redis_config = config.redis.clone().ok_or_else(|| {
                    CacheAsideError::configuration("redis configuration is missing")
                })?;

                let cache = RedisCache::new(redis_config).await?;
                Ok(Arc::new(cache))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use std::time::Duration;

    #[test]
    fn test_cache_type_from_str() {
        assert_eq!("in_memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("redis".parse::<CacheType>().unwrap(), CacheType::Redis);
        assert_eq!("CUSTOM".parse::<CacheType>().unwrap(), CacheType::Custom);
    }

    #[test]
    fn test_cache_type_from_str_invalid() {
        let result = "memcached".parse::<CacheType>();
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_type_display() {
        assert_eq!(CacheType::InMemory.to_string(), "in_memory");
        assert_eq!(CacheType::Redis.to_string(), "redis");
        assert_eq!(CacheType::Custom.to_string(), "custom");
    }

    #[test]
    fn test_validate_redis_requires_settings() {
        let config = CacheConfig {
            provider: CacheType::Redis,
            redis: None,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheAsideError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let factory = CacheFactory::new();
        let cache = factory.create(&CacheConfig::in_memory(), None).await.unwrap();

        cache
            .set("test", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("test").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_factory_create_custom() {
        let factory = CacheFactory::new();
        let custom: Arc<dyn CacheBackend> = Arc::new(MockCache::new());

        let cache = factory
            .create(&CacheConfig::custom(), Some(custom.clone()))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&cache, &custom));
    }

    #[tokio::test]
    async fn test_factory_create_custom_missing_backend() {
        let factory = CacheFactory::new();

        let result = factory.create(&CacheConfig::custom(), None).await;
        assert!(matches!(result, Err(CacheAsideError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_factory_create_redis_missing_config() {
        let factory = CacheFactory::new();
        let config = CacheConfig {
            provider: CacheType::Redis,
            redis: None,
            ..Default::default()
        };

        let result = factory.create(&config, None).await;
        assert!(result.is_err());
    }
}
