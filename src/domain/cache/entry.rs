//! Cache entry and TTL policy

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::CacheAsideError;

/// Soft/hard TTL pair
///
/// The soft TTL bounds how long an entry is served without a background
/// refresh; the hard TTL is handed to the backend as its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    soft_ttl: Duration,
    hard_ttl: Duration,
}

impl TtlPolicy {
    /// Creates a policy, rejecting a soft TTL greater than the hard TTL
    pub fn new(soft_ttl: Duration, hard_ttl: Duration) -> Result<Self, CacheAsideError> {
        if hard_ttl < soft_ttl {
            return Err(CacheAsideError::configuration(format!(
                "hard ttl ({}s) is less than soft ttl ({}s)",
                hard_ttl.as_secs(),
                soft_ttl.as_secs()
            )));
        }

        Ok(Self { soft_ttl, hard_ttl })
    }

    pub fn soft_ttl(&self) -> Duration {
        self.soft_ttl
    }

    pub fn hard_ttl(&self) -> Duration {
        self.hard_ttl
    }
}

/// A cached response plus the metadata needed to judge staleness
///
/// Entries are never mutated: a refresh writes a brand-new entry over the
/// old one at the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unix timestamp (seconds) of when the payload was produced
    pub updated_at: i64,
    /// Age after which the entry is stale but still served
    pub soft_ttl: Duration,
    /// JSON form of the response
    pub payload: String,
}

impl CacheEntry {
    /// Builds an entry stamped with the current time
    pub fn from_response<T: Serialize + ?Sized>(
        response: &T,
        soft_ttl: Duration,
    ) -> Result<Self, CacheAsideError> {
        Self::from_response_at(response, soft_ttl, now_unix())
    }

    /// Builds an entry stamped with an explicit timestamp
    pub fn from_response_at<T: Serialize + ?Sized>(
        response: &T,
        soft_ttl: Duration,
        updated_at: i64,
    ) -> Result<Self, CacheAsideError> {
        let payload = serde_json::to_string(response).map_err(|e| {
            CacheAsideError::serialization(format!("unable to marshal response: {}", e))
        })?;

        Ok(Self {
            updated_at,
            soft_ttl,
            payload,
        })
    }

    /// Whole-second staleness check: `updated_at + soft_ttl < now`
    pub fn is_stale_at(&self, now: i64) -> bool {
        let soft_secs = i64::try_from(self.soft_ttl.as_secs()).unwrap_or(i64::MAX);
        self.updated_at.saturating_add(soft_secs) < now
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(now_unix())
    }

    /// Decodes the payload into the caller's response type
    pub fn to_response<T: DeserializeOwned>(&self) -> Result<T, CacheAsideError> {
        serde_json::from_str(&self.payload)
            .map_err(|e| CacheAsideError::deserialization(e.to_string()))
    }
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        user_name: String,
        age: u32,
    }

    #[test]
    fn test_ttl_policy_accepts_equal_ttls() {
        let policy = TtlPolicy::new(Duration::from_secs(10), Duration::from_secs(10)).unwrap();
        assert_eq!(policy.soft_ttl(), Duration::from_secs(10));
        assert_eq!(policy.hard_ttl(), Duration::from_secs(10));
    }

    #[test]
    fn test_ttl_policy_rejects_inverted_ttls() {
        let result = TtlPolicy::new(Duration::from_secs(40), Duration::from_secs(10));
        assert!(matches!(result, Err(CacheAsideError::Configuration { .. })));
    }

    #[test]
    fn test_from_response_keeps_soft_ttl_and_payload() {
        let profile = Profile {
            user_name: "test".to_string(),
            age: 3,
        };

        let entry = CacheEntry::from_response(&profile, Duration::from_secs(3600)).unwrap();
        assert_eq!(entry.soft_ttl, Duration::from_secs(3600));
        assert_eq!(entry.payload, r#"{"user_name":"test","age":3}"#);
    }

    #[test]
    fn test_from_response_preserves_numeric_precision() {
        let entry = CacheEntry::from_response(&10.1_f64, Duration::from_secs(10)).unwrap();
        let value: f64 = entry.to_response().unwrap();
        assert_eq!(value, 10.1);

        let entry = CacheEntry::from_response(&i64::MAX, Duration::from_secs(10)).unwrap();
        let value: i64 = entry.to_response().unwrap();
        assert_eq!(value, i64::MAX);
    }

    #[test]
    fn test_from_response_rejects_non_string_map_keys() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");

        let result = CacheEntry::from_response(&map, Duration::from_secs(10));
        assert!(matches!(result, Err(CacheAsideError::Serialization { .. })));
    }

    #[test]
    fn test_staleness_uses_whole_seconds() {
        let entry = CacheEntry {
            updated_at: 1_000,
            soft_ttl: Duration::from_millis(5_900),
            payload: "null".to_string(),
        };

        // 5.9s truncates to 5s
        assert!(!entry.is_stale_at(1_005));
        assert!(entry.is_stale_at(1_006));
    }

    #[test]
    fn test_entry_ten_seconds_old_with_five_second_soft_ttl_is_stale() {
        let now = now_unix();
        let entry =
            CacheEntry::from_response_at(&"value", Duration::from_secs(5), now - 10).unwrap();
        assert!(entry.is_stale_at(now));
    }

    #[test]
    fn test_fresh_entry_is_not_stale() {
        let entry = CacheEntry::from_response(&"value", Duration::from_secs(5)).unwrap();
        assert!(!entry.is_stale());
    }

    #[test]
    fn test_to_response_type_mismatch_is_deserialization_error() {
        let entry = CacheEntry::from_response(&"just a string", Duration::from_secs(5)).unwrap();
        let result: Result<Profile, _> = entry.to_response();
        assert!(matches!(result, Err(CacheAsideError::Deserialization { .. })));
    }

    #[test]
    fn test_to_response_map() {
        let entry = CacheEntry {
            updated_at: 123,
            soft_ttl: Duration::from_secs(1),
            payload: r#"{"response": "response"}"#.to_string(),
        };

        let value: HashMap<String, String> = entry.to_response().unwrap();
        assert_eq!(value.get("response"), Some(&"response".to_string()));
    }
}
