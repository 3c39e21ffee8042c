use std::time::Duration;

use serde::Deserialize;

use crate::domain::{CacheAsideError, CompressionType, TtlPolicy};
use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::metrics::MetricsConfig;

/// Process-wide cache-aside configuration
///
/// Sample (TOML):
///
/// ```toml
/// default_soft_ttl_secs = 10
/// default_hard_ttl_secs = 40
/// compression = "gzip"
/// version = "v1"
///
/// [cache]
/// provider = "redis"
///
/// [cache.redis]
/// topology = "single"
/// nodes = ["localhost:6379"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheAsideConfig {
    /// Soft TTL used when a call does not specify one. Must not exceed the hard TTL.
    pub default_soft_ttl_secs: u64,
    /// Hard TTL used when a call does not specify one; becomes the backend expiry.
    pub default_hard_ttl_secs: u64,
    /// Bypass the cache entirely
    pub skip_cache: bool,
    pub compression: CompressionType,
    /// Appended to every key; bump it to orphan all previously stored entries
    pub version: String,
    pub cache: CacheConfig,
    pub metrics: MetricsConfig,
    pub timeouts: TimeoutConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on each backend get/set; a timed-out read counts as a miss
    pub cache_operation_ms: u64,
    /// Bound on the remote call made by a background refresh
    pub background_refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for CacheAsideConfig {
    fn default() -> Self {
        Self {
            default_soft_ttl_secs: 10,
            default_hard_ttl_secs: 40,
            skip_cache: false,
            compression: CompressionType::None,
            version: String::new(),
            cache: CacheConfig::default(),
            metrics: MetricsConfig::default(),
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cache_operation_ms: 1_000,
            background_refresh_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TimeoutConfig {
    pub fn cache_operation(&self) -> Duration {
        Duration::from_millis(self.cache_operation_ms.max(1))
    }

    pub fn background_refresh(&self) -> Duration {
        Duration::from_secs(self.background_refresh_secs.max(1))
    }
}

impl CacheAsideConfig {
    /// Loads `config/default`, `config/local`, then `SWR_CACHE__*` environment variables
    pub fn load() -> Result<Self, CacheAsideError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SWR_CACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads a single file (format inferred from its extension)
    pub fn load_from(path: &str) -> Result<Self, CacheAsideError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn default_soft_ttl(&self) -> Duration {
        Duration::from_secs(self.default_soft_ttl_secs)
    }

    pub fn default_hard_ttl(&self) -> Duration {
        Duration::from_secs(self.default_hard_ttl_secs)
    }

    pub fn default_ttl_policy(&self) -> Result<TtlPolicy, CacheAsideError> {
        TtlPolicy::new(self.default_soft_ttl(), self.default_hard_ttl())
    }

    pub fn validate(&self) -> Result<(), CacheAsideError> {
        if self.skip_cache {
            return Ok(());
        }

        if self.default_hard_ttl_secs == 0 {
            return Err(CacheAsideError::configuration(
                "hard ttl is not set, if you want to disable cache, set skip_cache to true",
            ));
        }

        if self.default_hard_ttl_secs < self.default_soft_ttl_secs {
            return Err(CacheAsideError::configuration(
                "hard ttl is less than soft ttl, if you want to disable soft ttl behavior, \
                 set the soft ttl to the hard ttl",
            ));
        }

        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{CacheType, RedisTopology};

    fn from_toml(toml: &str) -> Result<CacheAsideConfig, CacheAsideError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CacheAsideConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_soft_ttl(), Duration::from_secs(10));
        assert_eq!(config.default_hard_ttl(), Duration::from_secs(40));
        assert_eq!(config.cache.provider, CacheType::InMemory);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_zero_hard_ttl_is_rejected() {
        let config = CacheAsideConfig {
            default_soft_ttl_secs: 0,
            default_hard_ttl_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheAsideError::Configuration { .. })
        ));
    }

    #[test]
    fn test_inverted_ttls_are_rejected() {
        let config = CacheAsideConfig {
            default_soft_ttl_secs: 50,
            default_hard_ttl_secs: 40,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.default_ttl_policy().is_err());
    }

    #[test]
    fn test_skip_cache_skips_validation() {
        let config = CacheAsideConfig {
            default_soft_ttl_secs: 50,
            default_hard_ttl_secs: 0,
            skip_cache: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let config = from_toml(
            r#"
            default_soft_ttl_secs = 5
            default_hard_ttl_secs = 60
            compression = "zstd"
            version = "v2"

            [cache]
            provider = "redis"

            [cache.redis]
            topology = "cluster"
            nodes = ["10.0.0.1:7000", "10.0.0.2:7000"]
            password = "secret"

            [metrics]
            enabled = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_soft_ttl_secs, 5);
        assert_eq!(config.compression, CompressionType::Zstd);
        assert_eq!(config.version, "v2");
        assert_eq!(config.cache.provider, CacheType::Redis);

        let redis = config.cache.redis.as_ref().unwrap();
        assert_eq!(redis.topology, RedisTopology::Cluster);
        assert_eq!(redis.nodes.len(), 2);
        assert_eq!(redis.password.as_deref(), Some("secret"));

        assert!(config.metrics.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.timeouts.background_refresh_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_compression_is_configuration_error() {
        let result = from_toml(r#"compression = "snappy""#);
        assert!(matches!(result, Err(CacheAsideError::Configuration { .. })));
    }

    #[test]
    fn test_unsupported_provider_is_configuration_error() {
        let result = from_toml(
            r#"
            [cache]
            provider = "memcached"
            "#,
        );
        assert!(matches!(result, Err(CacheAsideError::Configuration { .. })));
    }

    #[test]
    fn test_redis_provider_without_settings_is_rejected() {
        let config = from_toml(
            r#"
            [cache]
            provider = "redis"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
