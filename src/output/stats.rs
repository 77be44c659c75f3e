//! Run statistics shared by every component of a crawl
//!
//! Counters are atomics so concurrent page visits never contend on a lock;
//! the error and warning lists sit behind a mutex and are append-only.

use crate::errors::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

/// One entry of the error or warning list
#[derive(Debug, Clone, Serialize)]
pub struct StatsEntry {
    pub message: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

/// Aggregate statistics for one crawl run
///
/// Shared as `Arc<CrawlingStats>`. After [`finish`](Self::finish) the stats are
/// read-only and further updates are ignored.
#[derive(Debug)]
pub struct CrawlingStats {
    start_time: DateTime<Utc>,
    end_time: OnceLock<DateTime<Utc>>,

    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    filtered_urls: AtomicU64,
    depth_exceeded_urls: AtomicU64,
    processed_pages: AtomicU64,
    extracted_chunks: AtomicU64,
    total_tokens: AtomicU64,

    errors: Mutex<Vec<StatsEntry>>,
    warnings: Mutex<Vec<StatsEntry>>,
}

impl CrawlingStats {
    /// Creates empty stats with `start_time = now`
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: OnceLock::new(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            filtered_urls: AtomicU64::new(0),
            depth_exceeded_urls: AtomicU64::new(0),
            processed_pages: AtomicU64::new(0),
            extracted_chunks: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
            errors: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    fn bump(&self, counter: &AtomicU64, by: u64) {
        if !self.is_finished() {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }

    pub fn record_request(&self) {
        self.bump(&self.total_requests, 1);
    }

    pub fn record_success(&self) {
        self.bump(&self.successful_requests, 1);
    }

    pub fn record_failure(&self) {
        self.bump(&self.failed_requests, 1);
    }

    pub fn record_filtered(&self) {
        self.bump(&self.filtered_urls, 1);
    }

    pub fn record_depth_exceeded(&self) {
        self.bump(&self.depth_exceeded_urls, 1);
    }

    /// Records a processed page and the chunks it produced
    pub fn record_processed_page(&self, chunks: u64, tokens: u64) {
        self.bump(&self.processed_pages, 1);
        self.bump(&self.extracted_chunks, chunks);
        self.bump(&self.total_tokens, tokens);
    }

    /// Appends an entry to the error list
    pub fn add_error(
        &self,
        message: impl Into<String>,
        url: impl Into<String>,
        category: Option<ErrorCategory>,
    ) {
        self.push(&self.errors, message.into(), url.into(), category);
    }

    /// Appends an entry to the warning list
    pub fn add_warning(
        &self,
        message: impl Into<String>,
        url: impl Into<String>,
        category: Option<ErrorCategory>,
    ) {
        self.push(&self.warnings, message.into(), url.into(), category);
    }

    fn push(
        &self,
        list: &Mutex<Vec<StatsEntry>>,
        message: String,
        url: String,
        category: Option<ErrorCategory>,
    ) {
        if self.is_finished() {
            return;
        }
        list.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(StatsEntry {
                message,
                url,
                timestamp: Utc::now(),
                category,
            });
    }

    /// Sets `end_time`; only the first call has an effect
    pub fn finish(&self) {
        let _ = self.end_time.set(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.get().is_some()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time.get().copied()
    }

    /// Elapsed run time: `now - start` while running, `end - start` once finished
    pub fn duration(&self) -> chrono::Duration {
        let end = self.end_time().unwrap_or_else(Utc::now);
        end - self.start_time
    }

    /// Percentage of dispatched requests that succeeded; 0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (self.successful_requests() as f64 / total as f64) * 100.0
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn filtered_urls(&self) -> u64 {
        self.filtered_urls.load(Ordering::Relaxed)
    }

    pub fn depth_exceeded_urls(&self) -> u64 {
        self.depth_exceeded_urls.load(Ordering::Relaxed)
    }

    pub fn processed_pages(&self) -> u64 {
        self.processed_pages.load(Ordering::Relaxed)
    }

    pub fn extracted_chunks(&self) -> u64 {
        self.extracted_chunks.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> Vec<StatsEntry> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn warnings(&self) -> Vec<StatsEntry> {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Takes a consistent, serializable copy of the current values
    pub fn snapshot(&self) -> StatsSnapshot {
        let errors = self.errors();
        let warnings = self.warnings();

        StatsSnapshot {
            start_time: self.start_time,
            end_time: self.end_time(),
            duration_ms: self.duration().num_milliseconds().max(0) as u64,
            total_requests: self.total_requests(),
            successful_requests: self.successful_requests(),
            failed_requests: self.failed_requests(),
            filtered_urls: self.filtered_urls(),
            depth_exceeded_urls: self.depth_exceeded_urls(),
            processed_pages: self.processed_pages(),
            extracted_chunks: self.extracted_chunks(),
            total_tokens: self.total_tokens(),
            success_rate: self.success_rate(),
            errors_by_category: count_by_category(&errors),
            warnings_by_category: count_by_category(&warnings),
            errors,
            warnings,
        }
    }
}

impl Default for CrawlingStats {
    fn default() -> Self {
        Self::new()
    }
}

fn count_by_category(entries: &[StatsEntry]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        let key = entry
            .category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| "uncategorized".to_string());
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Point-in-time copy of [`CrawlingStats`]
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub filtered_urls: u64,
    pub depth_exceeded_urls: u64,
    pub processed_pages: u64,
    pub extracted_chunks: u64,
    pub total_tokens: u64,
    pub success_rate: f64,
    pub errors_by_category: BTreeMap<String, u64>,
    pub warnings_by_category: BTreeMap<String, u64>,
    pub errors: Vec<StatsEntry>,
    pub warnings: Vec<StatsEntry>,
}
