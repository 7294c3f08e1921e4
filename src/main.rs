//! # regwatch
//!
//! Collects regulatory and technical news from agency feeds and landing
//! pages, keeps what is recent and relevant, sorts it into industry sections
//! and writes a single JSON digest for a rendering widget.
//!
//! ## Usage
//!
//! ```sh
//! regwatch --config regwatch.yml --out-dir ./out
//! ```
//!
//! ## Architecture
//!
//! The application is a single-pass batch pipeline:
//! 1. **Discovery**: landing pages are scanned for RSS/Atom links
//! 2. **Harvesting**: every feed is fetched and parsed (bounded concurrency, log-and-skip)
//! 3. **Filtering**: recency window with fallback, then negative/positive keyword checks
//! 4. **Classification**: keyword scoring with source hints as tie-breaker
//! 5. **Output**: `regwatch.json` plus a dated snapshot

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod classify;
mod cli;
mod config;
mod digest;
mod discovery;
mod feeds;
mod fetch;
mod filters;
mod harvest;
mod models;
mod outputs;
mod utils;

use cli::Cli;
use config::Config;
use fetch::{HttpFetcher, RetryFetch};
use harvest::HarvestOptions;
use outputs::json;
use utils::ensure_writable_dir;

const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("regwatch starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Configuration problems are fatal and must surface before any network I/O
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Cannot start without a valid configuration");
            return Err(e.into());
        }
    };

    if let Err(e) = ensure_writable_dir(&args.out_dir).await {
        error!(
            path = %args.out_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Harvest ----
    let fetcher = RetryFetch::new(
        HttpFetcher::new(&args.fetch_config())?,
        args.retries,
        RETRY_BASE_DELAY,
    );
    let options = HarvestOptions::from_config(&config, args.concurrency);
    let items = harvest::harvest(&config.sources, &fetcher, &options).await;
    info!(items = items.len(), "Harvested items");

    // ---- Filter, classify, assemble ----
    let digest = digest::build_digest(items, &config, Utc::now())?;
    if digest.is_empty() {
        warn!("No items survived filtering; writing a digest with no sections");
    }

    // ---- Output ----
    let written = json::write_digest(&digest, &args.out_dir).await?;

    // configured sections first (empty ones report 0), then hint-only sections
    let order = config.section_order();
    let extra: Vec<_> = digest
        .sections
        .iter()
        .map(|(section, _)| section)
        .filter(|section| !order.contains(section))
        .cloned()
        .collect();
    for section in order.iter().chain(&extra) {
        let count = digest.section(section.as_str()).map_or(0, |entries| entries.len());
        info!(%section, count, "Section summary");
    }
    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        total = digest.len(),
        path = %written.latest.display(),
        snapshot = ?written.snapshot,
        "Execution complete"
    );

    Ok(())
}
