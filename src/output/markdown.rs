//! Markdown run report generation
//!
//! Renders a stats snapshot as a human-readable report: run information,
//! counters, error and warning tallies, and the most recent errors.

use crate::output::stats::{StatsEntry, StatsSnapshot};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// How many of the most recent errors and warnings are listed in full
const RECENT_ENTRIES: usize = 20;

/// Run information shown at the top of the report
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub config_hash: String,
    pub start_urls: Vec<String>,
    pub dataset_path: String,
}

/// Writes the markdown report for a run
///
/// # Arguments
///
/// * `snapshot` - Final statistics of the run
/// * `context` - Run information shown in the header
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(std::io::Error)` - Failed to write the report
pub fn write_markdown_report(
    snapshot: &StatsSnapshot,
    context: &ReportContext,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(snapshot, context);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a stats snapshot as markdown
pub fn format_markdown_report(snapshot: &StatsSnapshot, context: &ReportContext) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Scribe Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", snapshot.start_time.to_rfc3339()));
    if let Some(finished) = snapshot.end_time {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        snapshot.duration_ms as f64 / 1000.0
    ));
    if !context.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", context.config_hash));
    }
    if !context.dataset_path.is_empty() {
        md.push_str(&format!("- **Dataset**: {}\n", context.dataset_path));
    }
    if !context.start_urls.is_empty() {
        md.push_str("- **Start URLs**:\n");
        for url in &context.start_urls {
            md.push_str(&format!("  - {}\n", url));
        }
    }
    md.push('\n');

    // Counters
    md.push_str("## Statistics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Total Requests | {} |\n", snapshot.total_requests));
    md.push_str(&format!(
        "| Successful Requests | {} |\n",
        snapshot.successful_requests
    ));
    md.push_str(&format!("| Failed Requests | {} |\n", snapshot.failed_requests));
    md.push_str(&format!("| Success Rate | {:.2}% |\n", snapshot.success_rate));
    md.push_str(&format!("| Filtered URLs | {} |\n", snapshot.filtered_urls));
    md.push_str(&format!(
        "| Depth Exceeded URLs | {} |\n",
        snapshot.depth_exceeded_urls
    ));
    md.push_str(&format!("| Processed Pages | {} |\n", snapshot.processed_pages));
    md.push_str(&format!(
        "| Extracted Chunks | {} |\n",
        snapshot.extracted_chunks
    ));
    md.push_str(&format!("| Estimated Tokens | {} |\n", snapshot.total_tokens));
    md.push_str(&format!("| Errors | {} |\n", snapshot.errors.len()));
    md.push_str(&format!("| Warnings | {} |\n\n", snapshot.warnings.len()));

    if !snapshot.errors_by_category.is_empty() || !snapshot.warnings_by_category.is_empty() {
        md.push_str("## Issues by Category\n\n");
        md.push_str("| Category | Errors | Warnings |\n");
        md.push_str("|----------|--------|----------|\n");

        let mut categories: Vec<&String> = snapshot
            .errors_by_category
            .keys()
            .chain(snapshot.warnings_by_category.keys())
            .collect();
        categories.sort();
        categories.dedup();

        for category in categories {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                category,
                snapshot.errors_by_category.get(category).unwrap_or(&0),
                snapshot.warnings_by_category.get(category).unwrap_or(&0)
            ));
        }
        md.push('\n');
    }

    push_recent(&mut md, "Recent Errors", &snapshot.errors);
    push_recent(&mut md, "Recent Warnings", &snapshot.warnings);

    md
}

fn push_recent(md: &mut String, heading: &str, entries: &[StatsEntry]) {
    if entries.is_empty() {
        return;
    }

    md.push_str(&format!("## {}\n\n", heading));
    md.push_str("| Time | URL | Message |\n");
    md.push_str("|------|-----|---------|\n");

    let skip = entries.len().saturating_sub(RECENT_ENTRIES);
    for entry in entries.iter().skip(skip) {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            entry.timestamp.format("%H:%M:%S"),
            entry.url,
            escape_cell(&entry.message)
        ));
    }

    if skip > 0 {
        md.push_str(&format!("\n... and {} earlier\n", skip));
    }
    md.push('\n');
}

/// Keeps table rows intact when messages contain pipes or newlines
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
