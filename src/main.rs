//! # Term Crawler
//!
//! A time-budgeted crawler that walks a list of news sites in parallel and
//! collects recent articles matching a configured vocabulary.
//!
//! ## Features
//!
//! - Depth-first, same-site crawling with a global wall-clock deadline
//! - Shared token-bucket rate limiting, retries with jitter and backoff
//! - Recency check over many date notations (ISO, zones, relative, Spanish)
//! - Near-duplicate removal, headline selection and a dominant-term label
//! - Links are remembered between cycles so old pages are not re-reported
//!
//! ## Usage
//!
//! ```sh
//! term_crawler -c ./crawl.yaml -j ./json --links-file ./state/links.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Crawling**: one lane per CPU, each crawling its share of the sites
//! 2. **Filtering**: optional topic relevance check
//! 3. **Aggregation**: dedupe, top articles, dominant term
//! 4. **Output**: JSON report and the updated link set

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod crawler;
mod cycle;
mod dates;
mod fetcher;
mod limiter;
mod models;
mod outputs;
mod pool;
mod scoring;
mod topics;
mod utils;

use cli::Cli;
use cycle::{CycleOptions, run_cycle};
use models::CrawlBudget;
use outputs::{json, links};
use utils::ensure_writable_dir;

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
    info!("term_crawler starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let config = config::load_config(&args.config).await?;

    let previous_links = match &args.links_file {
        Some(path) => links::load_links(path).await?,
        None => Vec::new(),
    };

    let deadline =
        deadline_after(Utc::now(), args.duration_secs).ok_or("duration is out of range")?;
    let budget = CrawlBudget::new(deadline, args.max_depth);
    let lanes = args.lanes.unwrap_or_else(pool::default_lanes);
    info!(
        deadline = %budget.deadline,
        max_depth = budget.max_depth,
        lanes,
        previous_links = previous_links.len(),
        "Starting crawl cycle"
    );

    let outcome = run_cycle(
        &config,
        CycleOptions {
            budget,
            lanes,
            previous_links,
        },
    )
    .await?;

    let path = json::write_report(&outcome.report, &args.json_output_dir).await?;

    if let Some(links_path) = &args.links_file {
        if let Err(e) = links::save_links(links_path, &outcome.visited).await {
            error!(path = %links_path, error = %e, "Failed to save visited links");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        report = %path.display(),
        articles = outcome.report.results.total_articles(),
        most_common_term = %outcome.report.most_common_term,
        elapsed_secs = elapsed.as_secs_f64(),
        "term_crawler finished"
    );
    Ok(())
}

/// `now + secs`, or `None` when the sum leaves chrono's representable range.
fn deadline_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let duration = i64::try_from(secs).ok().and_then(ChronoDuration::try_seconds)?;
    now.checked_add_signed(duration)
}
