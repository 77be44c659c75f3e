//! JSON-lines result sink

use crate::output::traits::{ResultRecord, ResultSink};
use crate::{CrawlError, CrawlResult};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Appends one JSON object per record to a file
pub struct JsonlSink {
    writer: Mutex<BufWriter<tokio::fs::File>>,
}

impl JsonlSink {
    /// Opens (or creates) the dataset file in append mode
    ///
    /// # Returns
    ///
    /// * `Ok(JsonlSink)` - The file is ready for writing
    /// * `Err(std::io::Error)` - The file could not be opened
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(tokio::fs::File::from_std(file))),
        })
    }
}

#[async_trait]
impl ResultSink for JsonlSink {
    async fn store(&self, records: &[ResultRecord]) -> CrawlResult<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| CrawlError::Storage(format!("Failed to encode record: {}", e)))?;
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&buf)
            .await
            .map_err(|e| CrawlError::Storage(format!("Failed to write records: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| CrawlError::Storage(format!("Failed to flush records: {}", e)))
    }

    async fn flush(&self) -> CrawlResult<()> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(|e| CrawlError::Storage(format!("Failed to flush records: {}", e)))
    }
}
