//! Content extraction and text processing collaborators
//!
//! The orchestrator only depends on the [`ContentExtractor`] and
//! [`TextProcessor`] traits. [`ReadabilityExtractor`] and
//! [`ChunkingProcessor`] are the default implementations.

mod chunking;
mod readability;

use crate::CrawlResult;

pub use chunking::{estimate_tokens, ChunkingProcessor};
pub use readability::ReadabilityExtractor;

/// Options for one extraction pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Extraction only succeeds with at least this many characters of text
    pub min_text_length: usize,
}

/// Result of an extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub success: bool,
    pub text: String,
    pub title: Option<String>,
}

impl Extraction {
    /// True if the pass succeeded and produced non-blank text
    pub fn is_usable(&self) -> bool {
        self.success && !self.text.trim().is_empty()
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub url: String,
    pub title: Option<String>,
}

/// A chunk of processed text
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub token_count: u64,
    pub metadata: serde_json::Value,
}

/// Result of processing a page's text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Processed {
    pub success: bool,
    pub chunks: Vec<Chunk>,
}

impl Processed {
    /// Sum of the chunks' token estimates
    pub fn total_tokens(&self) -> u64 {
        self.chunks.iter().map(|c| c.token_count).sum()
    }
}

/// Pulls the main text out of a page
pub trait ContentExtractor: Send + Sync {
    /// Extracts title and main text from an HTML document
    ///
    /// Returns `Ok` with `success = false` when the page simply has too little
    /// text; `Err` is reserved for failures of the extractor itself.
    fn extract(&self, html: &str, url: &str, options: &ExtractOptions) -> CrawlResult<Extraction>;

    /// Drops any cached state; called on memory pressure
    fn clear_caches(&self) {}
}

/// Turns extracted text into chunks
pub trait TextProcessor: Send + Sync {
    fn process(&self, text: &str, source: &SourceInfo) -> CrawlResult<Processed>;

    /// Drops any cached state; called on memory pressure
    fn clear_caches(&self) {}
}
