//! CLI module for the swr-cache demo binary
//!
//! - `demo`: runs a simulated slow remote call through the cache
//! - `key`: prints the cache key derived for a call

pub mod demo;
pub mod key;

use clap::{Parser, Subcommand};

/// Stale-while-revalidate cache-aside toolkit
#[derive(Parser)]
#[command(name = "swr-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show miss, hit and soft-hit behavior against a simulated remote
    Demo(demo::DemoArgs),

    /// Print the cache key for an identity and request
    Key(key::KeyArgs),
}
