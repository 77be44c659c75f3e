//! In-memory result sink

use crate::output::traits::{RecordStatus, ResultRecord, ResultSink};
use crate::CrawlResult;
use async_trait::async_trait;
use std::sync::Mutex;

/// Keeps every stored record in memory
///
/// Useful for dry runs and for inspecting a crawl's output in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all stored records
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the stored records with the given status
    pub fn records_with_status(&self, status: RecordStatus) -> Vec<ResultRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn store(&self, records: &[ResultRecord]) -> CrawlResult<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(records);
        Ok(())
    }
}
