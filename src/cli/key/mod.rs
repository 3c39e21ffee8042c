//! Key command - prints the derived cache key

use std::time::Duration;

use clap::Args;

use crate::domain::CacheKeyParams;

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Call identity, e.g. the RPC method name
    #[arg(long)]
    pub identity: String,

    /// Request as JSON; omitted means no request
    #[arg(long)]
    pub request: Option<String>,

    #[arg(long, default_value_t = 10)]
    pub soft_ttl_secs: u64,

    #[arg(long, default_value_t = 40)]
    pub hard_ttl_secs: u64,

    /// Version tag appended to the key
    #[arg(long = "schema-version", default_value = "")]
    pub version: String,

    /// Also print the unhashed key
    #[arg(long)]
    pub verbose: bool,
}

pub fn run(args: KeyArgs) -> anyhow::Result<()> {
    let (unhashed, key) = derive(&args)?;

    if args.verbose {
        println!("{}", unhashed);
    }
    println!("{}", key);

    Ok(())
}

fn derive(args: &KeyArgs) -> anyhow::Result<(String, String)> {
    let request: Option<serde_json::Value> = args
        .request
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    let params = CacheKeyParams::new(&args.identity)
        .with_request(request.as_ref())?
        .with_ttls(
            Duration::from_secs(args.soft_ttl_secs),
            Duration::from_secs(args.hard_ttl_secs),
        )
        .with_version(&args.version);

    Ok((params.unhashed(), params.hashed()))
}
