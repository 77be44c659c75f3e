use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Scribe
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(rename = "dynamic-content", default)]
    pub dynamic_content: DynamicContentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(rename = "error-handling", default)]
    pub error_handling: ErrorHandlingConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs the crawl starts from (depth 0)
    #[serde(rename = "start-urls")]
    pub start_urls: Vec<String>,

    /// Links at or beyond this depth are never visited
    #[serde(rename = "max-crawl-depth")]
    pub max_crawl_depth: u32,

    /// Glob patterns a URL must match at least one of
    #[serde(rename = "include-url-globs", default = "default_include_globs")]
    pub include_url_globs: Vec<String>,

    /// Glob patterns that always reject a URL
    #[serde(rename = "exclude-url-globs", default)]
    pub exclude_url_globs: Vec<String>,

    /// Maximum number of concurrent page visits
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Maximum number of pages dispatched during one run
    #[serde(rename = "max-requests-per-crawl")]
    pub max_requests_per_crawl: u64,

    /// Page-level retries performed before the failed-request handler runs
    #[serde(rename = "max-request-retries", default = "default_max_request_retries")]
    pub max_request_retries: u32,

    /// Delay before each page visit (milliseconds, 0 disables throttling)
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,
}

/// Per-step timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for loading a page (seconds)
    #[serde(rename = "navigation-secs", default = "default_navigation_secs")]
    pub navigation_secs: u64,

    /// Timeout for the whole per-page handler (seconds)
    #[serde(
        rename = "request-handler-secs",
        default = "default_request_handler_secs"
    )]
    pub request_handler_secs: u64,
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn request_handler(&self) -> Duration {
        Duration::from_secs(self.request_handler_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_secs: default_navigation_secs(),
            request_handler_secs: default_request_handler_secs(),
        }
    }
}

/// Waiting for client-side rendered content to settle
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicContentConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Fixed settle wait after load (milliseconds)
    #[serde(rename = "wait-ms", default = "default_dynamic_wait_ms")]
    pub wait_ms: u64,

    /// Timeout for the page-readiness check (milliseconds)
    #[serde(
        rename = "readiness-timeout-ms",
        default = "default_readiness_timeout_ms"
    )]
    pub readiness_timeout_ms: u64,
}

impl Default for DynamicContentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wait_ms: default_dynamic_wait_ms(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
        }
    }
}

/// Content length thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum raw page length; shorter pages are extraction failures
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Minimum extracted text length for the primary pass
    #[serde(rename = "min-text-length", default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Minimum extracted text length for the single fallback pass
    #[serde(
        rename = "fallback-min-text-length",
        default = "default_fallback_min_text_length"
    )]
    pub fallback_min_text_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
            min_text_length: default_min_text_length(),
            fallback_min_text_length: default_fallback_min_text_length(),
        }
    }
}

/// Chunking parameters for the default text processor
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(rename = "chunk-overlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// How the delay between retries grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base-delay × attempt`, uncapped, no jitter
    #[default]
    Linear,
    /// `base-delay × multiplier^(attempt-1)`, capped at `max-delay-ms`
    Exponential,
}

/// Step-level retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Only used by the exponential strategy
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Only used by the exponential strategy
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Only used by the exponential strategy
    #[serde(default)]
    pub jitter: bool,

    /// Pause after a memory-pressure cleanup (milliseconds)
    #[serde(
        rename = "memory-cleanup-pause-ms",
        default = "default_memory_cleanup_pause_ms"
    )]
    pub memory_cleanup_pause_ms: u64,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            strategy: BackoffStrategy::Linear,
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
            memory_cleanup_pause_ms: default_memory_cleanup_pause_ms(),
        }
    }
}

/// Proxy pool rotated on rate limiting
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the dataset (`.jsonl`, or `.db`/`.sqlite` for SQLite)
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path to the markdown run report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

fn default_include_globs() -> Vec<String> {
    vec!["**".to_string()]
}

fn default_max_request_retries() -> u32 {
    2
}

fn default_navigation_secs() -> u64 {
    30
}

fn default_request_handler_secs() -> u64 {
    120
}

fn default_dynamic_wait_ms() -> u64 {
    1000
}

fn default_readiness_timeout_ms() -> u64 {
    3000
}

fn default_min_content_length() -> usize {
    200
}

fn default_min_text_length() -> usize {
    100
}

fn default_fallback_min_text_length() -> usize {
    20
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_memory_cleanup_pause_ms() -> u64 {
    1000
}
