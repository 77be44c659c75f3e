//! Crawler module for page loading and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Page loading through the [`PageLoader`] seam
//! - Link discovery
//! - The per-page state machine
//! - Frontier scheduling with bounded concurrency and page-level retries

mod fetcher;
mod orchestrator;
mod parser;
mod scheduler;

pub use fetcher::{build_http_client, HttpPageLoader, LoadedPage, PageLoader};
pub use orchestrator::{Collaborators, Orchestrator, PageOutcome};
pub use parser::extract_links;
pub use scheduler::Scheduler;

use crate::config::Config;
use crate::output::CrawlingStats;
use crate::url::CrawlTarget;
use crate::ScribeError;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs a complete crawl with the default collaborators
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP page loader and open the dataset sink
/// 2. Seed the frontier with the start URLs at depth 0
/// 3. Visit pages concurrently until the frontier or the budget runs out
/// 4. Flush the sink and finish the statistics
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Arc<CrawlingStats>)` - Final statistics of the run
/// * `Err(ScribeError)` - Initialization failed; page failures never end up here
///
/// # Example
///
/// ```no_run
/// use sumi_scribe::config::load_config;
/// use sumi_scribe::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let stats = run_crawl(&config).await?;
/// println!("success rate: {:.2}%", stats.success_rate());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<Arc<CrawlingStats>, ScribeError> {
    let collaborators = Collaborators::from_config(config)?;
    run_crawl_with(config, collaborators).await
}

/// Runs a complete crawl with the given collaborators
///
/// Start URLs are enqueued as given (normalized, depth 0); only discovered
/// links go through the frontier filter.
pub async fn run_crawl_with(
    config: &Config,
    collaborators: Collaborators,
) -> Result<Arc<CrawlingStats>, ScribeError> {
    let stats = Arc::new(CrawlingStats::new());
    let sink = Arc::clone(&collaborators.sink);

    let orchestrator = Orchestrator::new(config, collaborators, Arc::clone(&stats))?;
    let mut scheduler = Scheduler::new(Arc::new(orchestrator), &config.crawler, &config.timeouts);

    for start_url in &config.crawler.start_urls {
        scheduler.enqueue(CrawlTarget::start(start_url)?);
    }

    info!(
        start_urls = config.crawler.start_urls.len(),
        max_depth = config.crawler.max_crawl_depth,
        max_concurrency = config.crawler.max_concurrency,
        max_requests = config.crawler.max_requests_per_crawl,
        "Starting crawl"
    );

    scheduler.run().await;

    if let Err(e) = sink.flush().await {
        warn!("Failed to flush result sink: {}", e);
        stats.add_error(format!("Failed to flush result sink: {}", e), "-", None);
    }

    stats.finish();
    orchestrator::log_run_summary(&stats);

    Ok(stats)
}
