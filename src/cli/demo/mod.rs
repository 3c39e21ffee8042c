//! Demo command - drives a simulated slow remote through the cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CacheAsideConfig;
use crate::domain::CompressionType;
use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::logging;
use crate::infrastructure::services::{CacheAsideService, CustomProviders};

const IDENTITY: &str = "QuoteService/GetQuote";

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Number of calls to make
    #[arg(long, default_value_t = 6)]
    pub rounds: u32,

    /// Pause between calls
    #[arg(long, default_value_t = 1500)]
    pub interval_ms: u64,

    /// Simulated remote latency
    #[arg(long, default_value_t = 300)]
    pub latency_ms: u64,

    #[arg(long, default_value_t = 2)]
    pub soft_ttl_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub hard_ttl_secs: u64,

    #[arg(long, default_value = "none")]
    pub compression: CompressionType,

    /// Config file to use instead of `config/default` + `config/local` + env
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuoteRequest {
    symbol: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Quote {
    symbol: String,
    price_cents: u64,
    generated_at: i64,
}

/// Run the demo against an in-process cache
pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => CacheAsideConfig::load_from(path)?,
        None => CacheAsideConfig::load()?,
    };
    logging::init_logging(&config.logging);

    config.default_soft_ttl_secs = args.soft_ttl_secs;
    config.default_hard_ttl_secs = args.hard_ttl_secs;
    config.compression = args.compression;
    config.skip_cache = false;
    config.cache = CacheConfig::in_memory();

    let service = CacheAsideService::from_config(&config, CustomProviders::new()).await?;
    let remote_calls = Arc::new(AtomicUsize::new(0));
    let request = QuoteRequest {
        symbol: "ACME".to_string(),
    };

    for round in 1..=args.rounds {
        let started = Instant::now();
        let symbol = request.symbol.clone();
        let latency = Duration::from_millis(args.latency_ms);
        let calls = remote_calls.clone();

        let quote: Quote = service
            .call(IDENTITY, Some(&request), move || {
                fetch_quote(symbol, latency, calls)
            })
            .await?;

        info!(
            round,
            symbol = %quote.symbol,
            elapsed_ms = started.elapsed().as_millis() as u64,
            price_cents = quote.price_cents,
            generated_at = quote.generated_at,
            "Quote served"
        );

        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }

    info!(
        rounds = args.rounds,
        remote_calls = remote_calls.load(Ordering::SeqCst),
        "Demo finished"
    );

    Ok(())
}

/// Simulated remote: slow, and a new price every call
async fn fetch_quote(
    symbol: String,
    latency: Duration,
    calls: Arc<AtomicUsize>,
) -> anyhow::Result<Quote> {
    tokio::time::sleep(latency).await;
    let n = calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;

    Ok(Quote {
        symbol,
        price_cents: 10_000 + n * 25,
        generated_at: chrono::Utc::now().timestamp(),
    })
}
