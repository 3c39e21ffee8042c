//! Metrics infrastructure

mod recorder;

pub use recorder::{
    MetricsConfig, MetricsType, RecorderMetrics, CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL,
    CACHE_SOFT_HITS_TOTAL,
};
