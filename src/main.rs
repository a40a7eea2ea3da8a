use anyhow::{Context, Result};
use clap::Parser;
use linkharvest::config::Config;
use linkharvest::crawl::Crawler;
use linkharvest::feed::HttpFeedClient;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "linkharvest",
    version,
    about = "Harvest share links and magnet URIs from RSS feeds"
)]
struct Args {
    /// Config file (TOML, or JSON when the name ends in .json)
    #[arg(long, short, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Keep crawling every `interval` seconds until Ctrl-C
    #[arg(long)]
    continuous: bool,

    /// Override the configured interval between cycles, in seconds
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate().context("Invalid configuration")?;

    let client =
        HttpFeedClient::new(config.request_timeout()).context("Failed to build HTTP client")?;
    let mut crawler = Crawler::new(&config, client, config.retry_policy())
        .context("Failed to open link store")?;

    if crawler.source_count() == 0 {
        tracing::warn!(config = %args.config.display(), "No valid feed sources configured");
    }

    if args.continuous {
        let cycles = crawler.run_continuous(shutdown_signal()).await;
        println!("Stopped after {cycles} cycle(s)");
        return Ok(());
    }

    let report = crawler.run_cycle().await;
    println!(
        "New links: {} (found {} across {} feeds)",
        report.new_count(),
        report.found,
        report.feeds
    );
    if !report.failed_sources.is_empty() {
        println!(
            "Failed feeds: {} (see {})",
            report.failed_sources.len(),
            config.failed_log.display()
        );
    }
    if let Some(path) = &report.snapshot {
        println!("Snapshot: {}", path.display());
    }

    if !report.is_clean() {
        anyhow::bail!(
            "Crawl finished with {} write error(s): {}",
            report.errors.len(),
            report.errors.join("; ")
        );
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
