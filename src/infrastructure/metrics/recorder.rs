//! Cache metrics emitted through the `metrics` facade

use metrics::counter;
use serde::Deserialize;

use crate::domain::CacheMetrics;

pub const CACHE_HITS_TOTAL: &str = "swr_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "swr_cache_misses_total";
pub const CACHE_SOFT_HITS_TOTAL: &str = "swr_cache_soft_hits_total";

/// Supported metrics providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsType {
    /// Caller-supplied sink
    Custom,
    /// Global `metrics` recorder
    #[default]
    Recorder,
}

/// Metrics emission settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub provider: MetricsType,
}

/// Emits hit/miss/soft-hit counters labelled by call identity
///
/// Whatever recorder the host process installed (Prometheus exporter,
/// debugging recorder) receives the counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

impl RecorderMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl CacheMetrics for RecorderMetrics {
    fn increment_hit(&self, name: &str) {
        counter!(CACHE_HITS_TOTAL, "call" => name.to_string()).increment(1);
    }

    fn increment_miss(&self, name: &str) {
        counter!(CACHE_MISSES_TOTAL, "call" => name.to_string()).increment(1);
    }

    fn increment_soft_hit(&self, name: &str) {
        counter!(CACHE_SOFT_HITS_TOTAL, "call" => name.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn counter_value(
        snapshot: &[(metrics_util::CompositeKey, DebugValue)],
        name: &str,
        call: &str,
    ) -> Option<u64> {
        snapshot.iter().find_map(|(key, value)| {
            let key = key.key();
            let matches_call = key
                .labels()
                .any(|label| label.key() == "call" && label.value() == call);

            match value {
                DebugValue::Counter(n) if key.name() == name && matches_call => Some(*n),
                _ => None,
            }
        })
    }

    #[test]
    fn test_recorder_metrics_emit_counters() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let sink = RecorderMetrics::new();
            sink.increment_hit("GetUser");
            sink.increment_hit("GetUser");
            sink.increment_miss("GetUser");
            sink.increment_soft_hit("ListOrders");
        });

        let snapshot: Vec<_> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| (key, value))
            .collect();

        assert_eq!(counter_value(&snapshot, CACHE_HITS_TOTAL, "GetUser"), Some(2));
        assert_eq!(counter_value(&snapshot, CACHE_MISSES_TOTAL, "GetUser"), Some(1));
        assert_eq!(
            counter_value(&snapshot, CACHE_SOFT_HITS_TOTAL, "ListOrders"),
            Some(1)
        );
        assert_eq!(counter_value(&snapshot, CACHE_SOFT_HITS_TOTAL, "GetUser"), None);
    }

    #[test]
    fn test_metrics_config_defaults() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.provider, MetricsType::Recorder);
    }
}
