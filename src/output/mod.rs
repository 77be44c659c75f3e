//! Output module for crawl records, statistics and reports
//!
//! This module handles:
//! - Aggregating run statistics (`CrawlingStats`)
//! - Storing crawl records through a `ResultSink` (JSON lines, SQLite, memory)
//! - Generating the markdown run report

mod jsonl;
mod markdown;
mod memory;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonlSink;
pub use markdown::{format_markdown_report, write_markdown_report, ReportContext};
pub use memory::MemorySink;
pub use sqlite_output::SqliteSink;
pub use stats::{CrawlingStats, StatsEntry, StatsSnapshot};
pub use traits::{RecordStatus, ResultRecord, ResultSink};

use crate::ScribeError;
use std::path::Path;
use std::sync::Arc;

/// Opens the sink matching the dataset path's extension
///
/// `.db`, `.sqlite` and `.sqlite3` open a [`SqliteSink`]; anything else is
/// written as JSON lines.
///
/// # Returns
///
/// * `Ok(Arc<dyn ResultSink>)` - The opened sink
/// * `Err(ScribeError)` - The dataset could not be opened
pub fn open_sink(path: &Path) -> Result<Arc<dyn ResultSink>, ScribeError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("db") | Some("sqlite") | Some("sqlite3") => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(Arc::new(SqliteSink::open(path)?))
        }
        _ => Ok(Arc::new(JsonlSink::create(path)?)),
    }
}
