//! Sumi-Scribe: a documentation-site crawler
//!
//! This crate turns documentation pages into structured, chunked records. It
//! decides which discovered links are worth visiting, drives bounded concurrent
//! page visits, recovers from the transient failures of crawling the open web,
//! and aggregates run statistics without letting one page's failure abort the run.

pub mod config;
pub mod crawler;
pub mod errors;
pub mod extract;
pub mod output;
pub mod recovery;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Scribe run-level operations
///
/// Only these errors may abort a crawl; they surface during initialization
/// (configuration, sink, HTTP client) and never from per-page processing.
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid proxy URL '{url}': {message}")]
    InvalidProxy { url: String, message: String },

    #[error("Sink error: {0}")]
    Sink(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// Structured kind of a page-level failure
///
/// Populated by the layer that observed the failure so the classifier never
/// has to guess from message text. `Unstructured` marks failures that only
/// carry a message (e.g. from a browser layer) and fall back to substring
/// matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    Timeout,
    RateLimit,
    HttpStatus,
    ContentMismatch,
    ContentTooShort,
    Extraction,
    Processing,
    Parse,
    Storage,
    Memory,
    InvalidTransition,
    Unstructured,
}

/// Page-level failures
///
/// Every step of a page visit reports failures through this type. They are
/// classified, retried when allowed, and otherwise downgraded to a skip; they
/// never abort the run.
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url} after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Rate limited by {url} (HTTP {status})")]
    RateLimited { url: String, status: u16 },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Content too short for {url}: {length} < {minimum} characters")]
    ContentTooShort {
        url: String,
        length: usize,
        minimum: usize,
    },

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Text processing failed for {url}: {message}")]
    Processing { url: String, message: String },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Memory pressure: {0}")]
    Memory(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    /// Wraps an unstructured failure message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns the structured kind of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } => FailureKind::Network,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::RateLimited { .. } => FailureKind::RateLimit,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::ContentMismatch { .. } => FailureKind::ContentMismatch,
            Self::ContentTooShort { .. } => FailureKind::ContentTooShort,
            Self::Extraction { .. } => FailureKind::Extraction,
            Self::Processing { .. } => FailureKind::Processing,
            Self::Parse { .. } => FailureKind::Parse,
            Self::Storage(_) => FailureKind::Storage,
            Self::Memory(_) => FailureKind::Memory,
            Self::InvalidTransition { .. } => FailureKind::InvalidTransition,
            Self::Other(_) => FailureKind::Unstructured,
        }
    }
}

/// Result type alias for Sumi-Scribe run-level operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for page-level operations
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use errors::{ErrorCategory, ErrorSeverity};
pub use output::CrawlingStats;
pub use state::PageState;
pub use url::{normalize_url, CrawlTarget, FilterDecision, FilterReason, UrlFilter};
