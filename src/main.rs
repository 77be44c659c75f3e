//! Sumi-Scribe main entry point
//!
//! This is the command-line interface for the Sumi-Scribe documentation crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_scribe::config::{load_config_with_hash, Config};
use sumi_scribe::crawler::run_crawl;
use sumi_scribe::output::{write_markdown_report, ReportContext, StatsSnapshot};
use tracing_subscriber::EnvFilter;

/// Sumi-Scribe: a documentation-site crawler
///
/// Sumi-Scribe visits documentation pages, extracts their main text, splits
/// it into chunks and writes structured records, recovering from transient
/// failures without aborting the run.
#[derive(Parser, Debug)]
#[command(name = "sumi-scribe")]
#[command(version = "1.0.0")]
#[command(about = "A documentation-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Print the final statistics as JSON instead of a text summary
    #[arg(long, conflicts_with = "dry_run")]
    stats_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(&config, config_hash, cli.stats_json).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scribe=info,warn"),
            1 => EnvFilter::new("sumi_scribe=debug,info"),
            2 => EnvFilter::new("sumi_scribe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Scribe Dry Run ===\n");

    println!("Start URLs ({}):", config.crawler.start_urls.len());
    for url in &config.crawler.start_urls {
        println!("  - {}", url);
    }

    println!("\nCrawler Configuration:");
    println!("  Max crawl depth: {}", config.crawler.max_crawl_depth);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!(
        "  Max requests per crawl: {}",
        config.crawler.max_requests_per_crawl
    );
    println!(
        "  Max request retries: {}",
        config.crawler.max_request_retries
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);

    println!("\nInclude globs:");
    for pattern in &config.crawler.include_url_globs {
        println!("  + {}", pattern);
    }
    println!("Exclude globs:");
    for pattern in &config.crawler.exclude_url_globs {
        println!("  - {}", pattern);
    }

    println!("\nRetries:");
    println!(
        "  {} retries, {:?} backoff from {}ms",
        config.error_handling.max_retries,
        config.error_handling.strategy,
        config.error_handling.base_delay_ms
    );

    println!("\nProxies ({}):", config.proxy.urls.len());
    for proxy in &config.proxy.urls {
        println!("  - {}", proxy);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  Report: {}", config.output.report_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: String,
    stats_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = match run_crawl(config).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Crawl failed to start: {}", e);
            return Err(e.into());
        }
    };
    let snapshot = stats.snapshot();

    let context = ReportContext {
        config_hash,
        start_urls: config.crawler.start_urls.clone(),
        dataset_path: config.output.dataset_path.clone(),
    };
    let report_path = Path::new(&config.output.report_path);
    match write_markdown_report(&snapshot, &context, report_path) {
        Ok(()) => tracing::info!("Report written to {}", report_path.display()),
        Err(e) => tracing::error!("Failed to write report: {}", e),
    }

    if stats_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_summary(&snapshot);
    }

    Ok(())
}

/// Prints a short text summary of the run
fn print_summary(snapshot: &StatsSnapshot) {
    println!("=== Crawl Summary ===\n");
    println!("  Total requests:      {}", snapshot.total_requests);
    println!("  Successful:          {}", snapshot.successful_requests);
    println!("  Failed:              {}", snapshot.failed_requests);
    println!("  Success rate:        {:.2}%", snapshot.success_rate);
    println!("  Filtered URLs:       {}", snapshot.filtered_urls);
    println!("  Depth exceeded:      {}", snapshot.depth_exceeded_urls);
    println!("  Processed pages:     {}", snapshot.processed_pages);
    println!("  Extracted chunks:    {}", snapshot.extracted_chunks);
    println!("  Total tokens:        {}", snapshot.total_tokens);
    println!("  Errors / warnings:   {} / {}", snapshot.errors.len(), snapshot.warnings.len());
    println!("  Duration:            {:.1}s", snapshot.duration_ms as f64 / 1000.0);
}
