mod app_config;

pub use app_config::{CacheAsideConfig, LogFormat, LoggingConfig, TimeoutConfig};
