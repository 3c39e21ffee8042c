//! Redis cache implementation (single node or cluster)

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo,
};
use serde::Deserialize;

use crate::domain::{CacheAsideError, CacheBackend};

const DEFAULT_REDIS_PORT: u16 = 6379;

/// Redis deployment shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisTopology {
    #[default]
    Single,
    Cluster,
}

/// Configuration for Redis cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    pub topology: RedisTopology,
    /// `host:port` pairs or full `redis://` URLs; only the first is used for a single node
    pub nodes: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Database index (single node only)
    pub db: i64,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    pub connection_timeout_secs: u64,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            topology: RedisTopology::Single,
            nodes: vec!["127.0.0.1:6379".to_string()],
            username: None,
            password: None,
            db: 0,
            key_prefix: None,
            connection_timeout_secs: 5,
        }
    }
}

impl RedisCacheConfig {
    /// Creates a single-node configuration
    pub fn single(node: impl Into<String>) -> Self {
        Self {
            topology: RedisTopology::Single,
            nodes: vec![node.into()],
            ..Default::default()
        }
    }

    /// Creates a cluster configuration from seed nodes
    pub fn cluster<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topology: RedisTopology::Cluster,
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_secs = timeout.as_secs();
        self
    }

    pub fn validate(&self) -> Result<(), CacheAsideError> {
        if self.nodes.iter().all(|n| n.trim().is_empty()) {
            return Err(CacheAsideError::configuration(
                "redis configuration has no nodes",
            ));
        }
        Ok(())
    }

    /// Connection settings for a node
    ///
    /// `host:port` nodes get the configured credentials and db as-is, so
    /// passwords need no URL escaping. Full `redis://` URLs are used verbatim.
    pub fn connection_info(
        &self,
        node: &str,
        with_db: bool,
    ) -> Result<ConnectionInfo, CacheAsideError> {
        let node = node.trim();

        if node.starts_with("redis://") || node.starts_with("rediss://") {
            return node.into_connection_info().map_err(|e| {
                CacheAsideError::configuration(format!("Invalid Redis URL {}: {}", node, e))
            });
        }

        let (host, port) = match node.rsplit_once(':') {
            Some((host, port)) if !host.ends_with(':') => {
                let port = port.parse::<u16>().map_err(|_| {
                    CacheAsideError::configuration(format!("Invalid Redis port in {}", node))
                })?;
                (host, port)
            }
            _ => (node, DEFAULT_REDIS_PORT),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if host.is_empty() {
            return Err(CacheAsideError::configuration(format!(
                "Invalid Redis node: {}",
                node
            )));
        }

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db: if with_db { self.db } else { 0 },
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }
}

#[derive(Clone)]
enum RedisConnection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

/// Redis cache implementation
#[derive(Clone)]
pub struct RedisCache {
    connection: RedisConnection,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connection = match self.connection {
            RedisConnection::Single(_) => "<ConnectionManager>",
            RedisConnection::Cluster(_) => "<ClusterConnection>",
        };

        f.debug_struct("RedisCache")
            .field("topology", &self.config.topology)
            .field("nodes", &self.config.nodes)
            .field("key_prefix", &self.config.key_prefix)
            .field("connection", &connection)
            .finish()
    }
}

impl RedisCache {
    /// Connects and verifies reachability with PING
    pub async fn new(config: RedisCacheConfig) -> Result<Self, CacheAsideError> {
        config.validate()?;

        let timeout = Duration::from_secs(config.connection_timeout_secs.max(1));
        let connection = tokio::time::timeout(timeout, Self::connect(&config))
            .await
            .map_err(|_| {
                CacheAsideError::backend(format!(
                    "Timed out connecting to Redis after {}s",
                    timeout.as_secs()
                ))
            })??;

        let cache = Self { connection, config };
        cache.ping().await?;

        tracing::info!(
            topology = ?cache.config.topology,
            nodes = cache.config.nodes.len(),
            "Redis cache connected"
        );

        Ok(cache)
    }

    async fn connect(config: &RedisCacheConfig) -> Result<RedisConnection, CacheAsideError> {
        match config.topology {
            RedisTopology::Single => {
                let node = config
                    .nodes
                    .iter()
                    .find(|n| !n.trim().is_empty())
                    .ok_or_else(|| CacheAsideError::configuration("redis node is empty"))?;

                let client = Client::open(config.connection_info(node, true)?).map_err(|e| {
                    CacheAsideError::configuration(format!("Failed to create Redis client: {}", e))
                })?;

                let manager = ConnectionManager::new(client).await.map_err(|e| {
                    CacheAsideError::backend(format!("Failed to connect to Redis: {}", e))
                })?;

                Ok(RedisConnection::Single(manager))
            }
            RedisTopology::Cluster => {
                let nodes = config
                    .nodes
                    .iter()
                    .filter(|n| !n.trim().is_empty())
                    .map(|n| config.connection_info(n, false))
                    .collect::<Result<Vec<_>, _>>()?;

                let client = ClusterClientBuilder::new(nodes).build().map_err(|e| {
                    CacheAsideError::configuration(format!(
                        "Failed to create Redis cluster client: {}",
                        e
                    ))
                })?;

                let connection = client.get_async_connection().await.map_err(|e| {
                    CacheAsideError::backend(format!("Failed to connect to Redis cluster: {}", e))
                })?;

                Ok(RedisConnection::Cluster(connection))
            }
        }
    }

    async fn ping(&self) -> Result<(), CacheAsideError> {
        let result = match self.connection.clone() {
            RedisConnection::Single(mut conn) => {
                redis::cmd("PING").query_async::<String>(&mut conn).await
            }
            RedisConnection::Cluster(mut conn) => {
                redis::cmd("PING").query_async::<String>(&mut conn).await
            }
        };

        result
            .map(|_| ())
            .map_err(|e| CacheAsideError::backend(format!("Redis is not reachable: {}", e)))
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheAsideError> {
        let prefixed_key = self.prefix_key(key);

        let result: redis::RedisResult<Option<Vec<u8>>> = match self.connection.clone() {
            RedisConnection::Single(mut conn) => conn.get(&prefixed_key).await,
            RedisConnection::Cluster(mut conn) => conn.get(&prefixed_key).await,
        };

        result.map_err(|e| CacheAsideError::backend(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheAsideError> {
        let prefixed_key = self.prefix_key(key);
        let ttl_secs = ttl.as_secs().max(1);

        let result: redis::RedisResult<()> = match self.connection.clone() {
            RedisConnection::Single(mut conn) => conn.set_ex(&prefixed_key, value, ttl_secs).await,
            RedisConnection::Cluster(mut conn) => {
                conn.set_ex(&prefixed_key, value, ttl_secs).await
            }
        };

        result.map_err(|e| CacheAsideError::backend(format!("Failed to set key '{}': {}", key, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: the ignored tests require a running Redis instance
    // Run with: cargo test -- --ignored

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::single("127.0.0.1:6379").with_key_prefix("swr-test")
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        cache
            .set("key1", b"value1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get("key1").await.unwrap();
        assert_eq!(result, Some(b"value1".to_vec()));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_get_missing() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        let result = cache.get("definitely-missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_hard_ttl_expiry() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        cache
            .set("short", b"value".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;

        assert!(cache.get("short").await.unwrap().is_none());
    }

    #[test]
    fn test_connection_info_without_credentials() {
        let config = RedisCacheConfig::single("localhost:6379").with_db(2);

        let info = config.connection_info("localhost:6379", true).unwrap();
        assert_eq!(info.addr, ConnectionAddr::Tcp("localhost".to_string(), 6379));
        assert_eq!(info.redis.db, 2);
        assert!(info.redis.password.is_none());

        let info = config.connection_info("localhost:6379", false).unwrap();
        assert_eq!(info.redis.db, 0);
    }

    #[test]
    fn test_connection_info_keeps_reserved_characters_in_password() {
        let config = RedisCacheConfig::single("cache.internal:6379")
            .with_credentials(Some("svc".to_string()), "pa/ss#w?rd:@");

        let info = config.connection_info("cache.internal:6379", true).unwrap();
        assert_eq!(
            info.addr,
            ConnectionAddr::Tcp("cache.internal".to_string(), 6379)
        );
        assert_eq!(info.redis.username.as_deref(), Some("svc"));
        assert_eq!(info.redis.password.as_deref(), Some("pa/ss#w?rd:@"));

        assert!(Client::open(info).is_ok());
    }

    #[test]
    fn test_connection_info_cluster_nodes_carry_credentials() {
        let config = RedisCacheConfig::cluster(["10.0.0.1:7000", "10.0.0.2:7001"])
            .with_credentials(None, "s3cr#t/");

        let nodes = config
            .nodes
            .iter()
            .map(|n| config.connection_info(n, false))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(nodes[1].addr, ConnectionAddr::Tcp("10.0.0.2".to_string(), 7001));
        assert!(nodes.iter().all(|n| n.redis.password.as_deref() == Some("s3cr#t/")));
        assert!(ClusterClientBuilder::new(nodes).build().is_ok());
    }

    #[test]
    fn test_connection_info_defaults_port_and_strips_brackets() {
        let config = RedisCacheConfig::default();

        let info = config.connection_info("cache", true).unwrap();
        assert_eq!(info.addr, ConnectionAddr::Tcp("cache".to_string(), 6379));

        let info = config.connection_info("[::1]:6380", true).unwrap();
        assert_eq!(info.addr, ConnectionAddr::Tcp("::1".to_string(), 6380));
    }

    #[test]
    fn test_connection_info_parses_full_urls() {
        let config = RedisCacheConfig::single("redis://example.com:6380/1");

        let info = config
            .connection_info("redis://example.com:6380/1", true)
            .unwrap();
        assert_eq!(info.addr, ConnectionAddr::Tcp("example.com".to_string(), 6380));
        assert_eq!(info.redis.db, 1);
    }

    #[test]
    fn test_connection_info_rejects_bad_port() {
        let config = RedisCacheConfig::default();
        assert!(matches!(
            config.connection_info("cache:notaport", true),
            Err(CacheAsideError::Configuration { .. })
        ));
    }

    #[test]
    fn test_cluster_config() {
        let config = RedisCacheConfig::cluster(["10.0.0.1:7000", "10.0.0.2:7000"]);
        assert_eq!(config.topology, RedisTopology::Cluster);
        assert_eq!(config.nodes.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_nodes() {
        let config = RedisCacheConfig::cluster(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(CacheAsideError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_backend_error() {
        let config = RedisCacheConfig::single("127.0.0.1:1")
            .with_connection_timeout(Duration::from_secs(1));

        let result = RedisCache::new(config).await;
        assert!(result.is_err());
    }
}
