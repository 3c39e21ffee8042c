//! Cache key derivation

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha512};

use crate::domain::CacheAsideError;

/// Representation of an absent request in the unhashed key
const NULL_REQUEST: &str = "null";

/// Everything that makes two cached calls distinct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyParams {
    /// Stable name of the remote operation
    pub identity: String,
    /// Canonical JSON of the request (sorted object keys)
    pub request: String,
    pub soft_ttl: Duration,
    pub hard_ttl: Duration,
    /// Schema version tag
    pub version: String,
}

impl CacheKeyParams {
    /// Creates parameters for an identity with no request payload
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            request: NULL_REQUEST.to_string(),
            soft_ttl: Duration::ZERO,
            hard_ttl: Duration::ZERO,
            version: String::new(),
        }
    }

    /// Sets the request payload, canonicalizing it
    pub fn with_request<T: Serialize + ?Sized>(
        mut self,
        request: Option<&T>,
    ) -> Result<Self, CacheAsideError> {
        self.request = match request {
            Some(request) => canonical_json(request)?,
            None => NULL_REQUEST.to_string(),
        };
        Ok(self)
    }

    pub fn with_ttls(mut self, soft_ttl: Duration, hard_ttl: Duration) -> Self {
        self.soft_ttl = soft_ttl;
        self.hard_ttl = hard_ttl;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// `identity:request:soft_secs:hard_secs:version`
    pub fn unhashed(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.identity,
            self.request,
            self.soft_ttl.as_secs(),
            self.hard_ttl.as_secs(),
            self.version
        )
    }

    /// Backend key: SHA-512 of the unhashed key, URL-safe base64 with padding
    pub fn hashed(&self) -> String {
        URL_SAFE.encode(Sha512::digest(self.unhashed().as_bytes()))
    }
}

/// Derives the backend key for a cached call
pub fn generate_cache_key<T: Serialize + ?Sized>(
    request: Option<&T>,
    identity: &str,
    soft_ttl: Duration,
    hard_ttl: Duration,
    version: &str,
) -> Result<String, CacheAsideError> {
    let params = CacheKeyParams::new(identity)
        .with_request(request)?
        .with_ttls(soft_ttl, hard_ttl)
        .with_version(version);

    Ok(params.hashed())
}

/// Serializes a value to JSON with every object's keys in sorted order
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheAsideError> {
    let value = serde_json::to_value(value).map_err(|e| {
        CacheAsideError::serialization(format!("unable to canonicalize request: {}", e))
    })?;

    Ok(sort_keys(value).to_string())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
