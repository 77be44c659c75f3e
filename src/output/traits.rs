//! Result sink trait and record types
//!
//! Sinks receive the structured records produced by a crawl: one record per
//! chunk of a successfully processed page, and one failure record per page
//! that was given up on.

use crate::CrawlResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome stored with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record pushed to a [`ResultSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    /// Index of the chunk within its page; `None` for failure records
    pub chunk_index: Option<usize>,
    pub metadata: serde_json::Value,
    pub depth: u32,
    pub status: RecordStatus,
    /// Failure reason; `None` for successful records
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
    pub crawled_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Builds a record for one chunk of a processed page
    pub fn success(
        url: &str,
        title: Option<String>,
        content: String,
        chunk_index: usize,
        metadata: serde_json::Value,
        depth: u32,
    ) -> Self {
        Self {
            url: url.to_string(),
            title,
            content,
            chunk_index: Some(chunk_index),
            metadata,
            depth,
            status: RecordStatus::Success,
            reason: None,
            crawled_at: Utc::now(),
        }
    }

    /// Builds a record for a page that was given up on
    pub fn failure(url: &str, depth: u32, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            content: String::new(),
            chunk_index: None,
            metadata: serde_json::Value::Null,
            depth,
            status: RecordStatus::Failed,
            reason: Some(reason.into()),
            crawled_at: Utc::now(),
        }
    }
}

/// Destination for crawl records
///
/// Implementations must be thread-safe: many page visits store concurrently.
/// Failures are reported as [`CrawlError::Storage`](crate::CrawlError), which
/// is recorded but never retried.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Stores a batch of records
    async fn store(&self, records: &[ResultRecord]) -> CrawlResult<()>;

    /// Flushes buffered records, called once at the end of a run
    async fn flush(&self) -> CrawlResult<()> {
        Ok(())
    }
}
