//! CLI entry point for the catalog spider.

use anyhow::{Context, Result, bail};
use catalog_spider::CrawlConfig;
use chrono::Local;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let plan = args.plan(Local::now().date_naive())?;
    resolve_host(&plan.start_url).await?;

    let config = CrawlConfig::new(plan.start_url)
        .with_output_dir(plan.output_dir)
        .with_concurrency(usize::from(args.concurrency))
        .with_limit(plan.limit)
        .with_max_pages(plan.max_pages)
        .with_modifiers(args.cookies.clone());

    info!(
        start_url = %config.start_url,
        output_dir = %config.output_dir.display(),
        concurrency = config.concurrency,
        limit = ?config.limit,
        max_pages = ?config.max_pages,
        "Catalog spider starting"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, draining queued artifacts");
            interrupt.cancel();
        }
    });

    let stats = config.run(&cancel).await?;

    info!(
        queued = stats.queued(),
        completed = stats.completed(),
        failed = stats.failed(),
        "Crawl complete"
    );

    Ok(())
}

/// Fails fast when the target host does not resolve.
async fn resolve_host(url: &Url) -> Result<()> {
    let Some(host) = url.host_str() else {
        bail!("URL has no host: {url}");
    };
    let port = url.port_or_known_default().unwrap_or(443);

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("unknown host `{host}`"))?;
    let Some(addr) = addrs.next() else {
        bail!("unknown host `{host}`: no addresses");
    };
    debug!(host, %addr, "host resolved");
    Ok(())
}
