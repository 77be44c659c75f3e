//! SQLite result sink
//!
//! Records land in a single `records` table. The connection sits behind a
//! mutex so concurrent page visits serialize their inserts.

use crate::output::traits::{RecordStatus, ResultRecord, ResultSink};
use crate::{CrawlError, CrawlResult, ScribeError};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQL schema for the dataset
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    chunk_index INTEGER,
    status TEXT NOT NULL,
    reason TEXT,
    depth INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_url ON records(url);
CREATE INDEX IF NOT EXISTS idx_records_status ON records(status);
"#;

/// SQLite-backed result sink
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the dataset database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(ScribeError)` - Failed to open database or create the schema
    pub fn open(path: &Path) -> Result<Self, ScribeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, ScribeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Counts stored records with the given status
    pub fn count(&self, status: RecordStatus) -> Result<u64, ScribeError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_all(&self, records: &[ResultRecord]) -> rusqlite::Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO records
                    (url, title, content, chunk_index, status, reason, depth, metadata, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.url,
                    record.title,
                    record.content,
                    record.chunk_index.map(|i| i as i64),
                    record.status.as_str(),
                    record.reason,
                    record.depth,
                    record.metadata.to_string(),
                    record.crawled_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn store(&self, records: &[ResultRecord]) -> CrawlResult<()> {
        self.insert_all(records)
            .map_err(|e| CrawlError::Storage(format!("Failed to insert records: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(url: &str, index: usize) -> ResultRecord {
        ResultRecord::success(
            url,
            Some("Title".to_string()),
            format!("chunk {}", index),
            index,
            serde_json::json!({ "chunk_index": index }),
            1,
        )
    }

    #[tokio::test]
    async fn test_store_and_count() {
        let sink = SqliteSink::open_in_memory().unwrap();

        sink.store(&[chunk("https://example.com/a", 0), chunk("https://example.com/a", 1)])
            .await
            .unwrap();
        sink.store(&[ResultRecord::failure("https://example.com/b", 2, "timeout")])
            .await
            .unwrap();

        assert_eq!(sink.count(RecordStatus::Success).unwrap(), 2);
        assert_eq!(sink.count(RecordStatus::Failed).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stored_columns() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.store(&[ResultRecord::failure("https://example.com/b", 2, "timeout")])
            .await
            .unwrap();

        let conn = sink.lock();
        let (reason, chunk_index, depth): (Option<String>, Option<i64>, i64) = conn
            .query_row(
                "SELECT reason, chunk_index, depth FROM records WHERE url = ?1",
                params!["https://example.com/b"],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();

        assert_eq!(reason.as_deref(), Some("timeout"));
        assert_eq!(chunk_index, None);
        assert_eq!(depth, 2);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataset.db");

        {
            let sink = SqliteSink::open(&path).unwrap();
            sink.store(&[chunk("https://example.com/a", 0)]).await.unwrap();
        }

        let reopened = SqliteSink::open(&path).unwrap();
        assert_eq!(reopened.count(RecordStatus::Success).unwrap(), 1);
    }
}
