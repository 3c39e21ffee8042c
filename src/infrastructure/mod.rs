//! Infrastructure layer - backends, metrics, logging and orchestration

pub mod cache;
pub mod logging;
pub mod metrics;
pub mod services;
