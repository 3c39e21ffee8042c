//! Services - request orchestration and background refresh

mod cache_aside_service;
pub mod global;
mod refresh_scheduler;

pub use cache_aside_service::{CacheAsideService, CallOptions, CustomProviders, ReadGuard};
pub use refresh_scheduler::{RefreshScheduler, WriteGuard};
