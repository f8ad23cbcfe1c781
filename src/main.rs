use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedsync::{
    HttpStore, JsonFileRegistry, NoopReporter, ReqwestClient, SharedSyncReporter, SyncOptions,
    TracingReporter, sync_all,
};

/// Incrementally synchronize podcast RSS feeds into a downstream store
#[derive(Parser, Debug)]
#[command(name = "feedsync")]
#[command(about = "Incrementally synchronize podcast RSS feeds into a downstream store")]
#[command(version)]
struct Args {
    /// Path to the feed registry JSON file
    #[arg(short, long, default_value = "feeds.json")]
    registry: PathBuf,

    /// Base URL of the downstream data-store API
    #[arg(short, long)]
    api: String,

    /// Bearer token for the data-store API
    #[arg(long, env = "FEEDSYNC_TOKEN", hide_env_values = true)]
    token: String,

    /// User-Agent sent with every feed request
    #[arg(long, default_value = concat!("feedsync/", env!("CARGO_PKG_VERSION")))]
    user_agent: String,

    /// Maximum number of feeds synchronized concurrently
    #[arg(short = 'c', long, default_value = "4")]
    concurrent: usize,

    /// Maximum relocation hops followed per pass
    #[arg(long, default_value = "1")]
    max_redirects: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Keep crawling on an interval instead of exiting after one cycle
    #[arg(short, long)]
    daemon: bool,

    /// Seconds between crawl cycles in daemon mode
    #[arg(long, default_value = "900")]
    interval: u64,

    /// Suppress per-feed event logging
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()
        .context("failed to build HTTP client")?;

    let client = ReqwestClient::with_client(http.clone());
    let store = HttpStore::new(&args.api, &args.token, http).context("invalid data-store URL")?;
    let registry = JsonFileRegistry::new(&args.registry);

    let reporter: SharedSyncReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        TracingReporter::shared()
    };

    let options = SyncOptions {
        user_agent: args.user_agent,
        max_redirects: args.max_redirects,
        max_concurrent: args.concurrent,
    };

    loop {
        let summary = sync_all(&client, &store, &registry, &options, &reporter)
            .await
            .context("crawl cycle failed")?;

        tracing::info!(
            feeds = summary.feeds,
            synced = summary.synced,
            failed = summary.failed,
            published = summary.episodes_published,
            publish_failures = summary.episodes_failed,
            "crawl cycle finished"
        );

        if !args.daemon {
            if summary.feeds > 0 && summary.synced == 0 {
                std::process::exit(1);
            }
            break;
        }

        tokio::time::sleep(Duration::from_secs(args.interval)).await;
    }

    Ok(())
}
