//! Integration tests for retries, error handling and recovery
//!
//! Retry timing runs on tokio's paused clock, so no test actually waits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_scribe::config::parse_config;
use sumi_scribe::crawler::{run_crawl_with, Collaborators, LoadedPage, PageLoader};
use sumi_scribe::errors::{ErrorCategory, ErrorContext, ErrorHandler, Handled, RetrySettings};
use sumi_scribe::extract::{
    ChunkingProcessor, ContentExtractor, ExtractOptions, Extraction, ReadabilityExtractor,
};
use sumi_scribe::output::{CrawlingStats, MemorySink, RecordStatus};
use sumi_scribe::{CrawlError, CrawlResult};
use tokio::time::Instant;

fn timeout_error() -> CrawlError {
    CrawlError::Timeout {
        url: "https://docs.example.com/".to_string(),
        timeout_ms: 30_000,
    }
}

/// Paused-clock sleeps land on millisecond ticks
fn assert_close(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_backs_off_linearly_then_skips() {
    let handler = ErrorHandler::new(RetrySettings::linear(3, Duration::from_millis(1000)));
    let attempts = Mutex::new(Vec::new());
    let attempts_ref = &attempts;
    let start = Instant::now();

    let outcome: Handled<()> = handler
        .execute_with_error_handling(
            "content-fetch-https://docs.example.com/",
            ErrorContext::new(),
            || async move {
                attempts_ref.lock().unwrap().push(start.elapsed());
                Err(timeout_error())
            },
        )
        .await;

    assert!(outcome.is_skipped());

    // 4 attempts: immediately, then after 1000, 2000 and 3000ms
    let attempts = attempts.lock().unwrap();
    assert_eq!(attempts.len(), 4);
    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
    for (gap, expected_ms) in gaps.iter().zip([1000, 2000, 3000]) {
        assert_close(*gap, expected_ms);
    }

    let tally = handler.tally();
    assert_eq!(tally.total_errors, 1);
    assert_eq!(tally.errors_by_category[&ErrorCategory::Timeout], 1);
    // Exhaustion clears the counter
    assert_eq!(
        handler
            .retry_policy()
            .attempts("content-fetch-https://docs.example.com/"),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_validation_failure_is_not_retried() {
    let handler = ErrorHandler::new(RetrySettings::linear(3, Duration::from_millis(1000)));
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let outcome: Handled<()> = handler
        .execute_with_error_handling("content-fetch-x", ErrorContext::new(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CrawlError::HttpStatus {
                url: "https://docs.example.com/x".to_string(),
                status: 404,
            })
        })
        .await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    match outcome {
        Handled::Skipped(skip) => {
            assert_eq!(skip.category(), ErrorCategory::Validation);
            assert!(!skip.recovered);
        }
        Handled::Completed(_) => panic!("expected a skip"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_counter_cleared_after_success() {
    let handler = ErrorHandler::new(RetrySettings::linear(3, Duration::from_millis(1000)));
    let policy = handler.retry_policy();
    let counter = AtomicU32::new(0);
    let calls = &counter;

    // Fails once, then succeeds
    let value = policy
        .execute_with_retry("X", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(timeout_error())
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(policy.attempts("X"), 0);

    // The next failure of "X" starts again from attempt 1 (base delay)
    let start = Instant::now();
    let retried_at = Mutex::new(None);
    let retried_ref = &retried_at;
    let flip = AtomicU32::new(0);
    let flip_ref = &flip;

    policy
        .execute_with_retry("X", || async move {
            if flip_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(timeout_error())
            } else {
                *retried_ref.lock().unwrap() = Some(start.elapsed());
                Ok(())
            }
        })
        .await
        .unwrap();

    let retried_at = retried_at.into_inner().unwrap().expect("retry never ran");
    assert_close(retried_at, 1000);
}

#[test]
fn test_fresh_stats_success_rate_is_zero() {
    let stats = CrawlingStats::new();
    assert_eq!(stats.success_rate(), 0.0);
}

const CONFIG: &str = r#"
[crawler]
start-urls = ["https://docs.example.com/"]
max-crawl-depth = 2
max-concurrency = 1
max-requests-per-crawl = 10
max-request-retries = 0

[error-handling]
memory-cleanup-pause-ms = 0

[proxy]
urls = ["http://proxy-a:8080", "http://proxy-b:8080", "http://proxy-c:8080"]

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
dataset-path = "./unused.jsonl"
report-path = "./unused.md"
"#;

/// Fails every load with a fixed error and records proxy switches
struct ScriptedLoader {
    error: CrawlError,
    proxies: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    fn failing_with(error: CrawlError) -> Self {
        Self {
            error,
            proxies: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageLoader for ScriptedLoader {
    async fn load(&self, _url: &str, _timeout: Duration) -> CrawlResult<LoadedPage> {
        Err(self.error.clone())
    }

    async fn set_proxy(&self, proxy_url: &str) -> CrawlResult<()> {
        self.proxies.lock().unwrap().push(proxy_url.to_string());
        Ok(())
    }
}

/// Counts cache clears on top of the default extractor
#[derive(Default)]
struct CountingExtractor {
    inner: ReadabilityExtractor,
    clears: AtomicU32,
}

impl ContentExtractor for CountingExtractor {
    fn extract(&self, html: &str, url: &str, options: &ExtractOptions) -> CrawlResult<Extraction> {
        self.inner.extract(html, url, options)
    }

    fn clear_caches(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

fn collaborators(
    loader: Arc<ScriptedLoader>,
    extractor: Arc<CountingExtractor>,
    sink: Arc<MemorySink>,
) -> Collaborators {
    Collaborators {
        loader,
        extractor,
        processor: Arc::new(ChunkingProcessor::new(1000, 100)),
        sink,
    }
}

#[tokio::test]
async fn test_rate_limited_requests_rotate_proxies() {
    let mut config = parse_config(CONFIG).unwrap();
    config.crawler.start_urls = vec![
        "https://docs.example.com/1".to_string(),
        "https://docs.example.com/2".to_string(),
        "https://docs.example.com/3".to_string(),
    ];

    let loader = Arc::new(ScriptedLoader::failing_with(CrawlError::RateLimited {
        url: "https://docs.example.com/".to_string(),
        status: 429,
    }));
    let sink = Arc::new(MemorySink::new());

    let stats = run_crawl_with(
        &config,
        collaborators(loader.clone(), Arc::new(CountingExtractor::default()), sink.clone()),
    )
    .await
    .unwrap();

    assert_eq!(stats.failed_requests(), 3);
    assert_eq!(stats.success_rate(), 0.0);
    assert_eq!(
        *loader.proxies.lock().unwrap(),
        vec![
            "http://proxy-b:8080",
            "http://proxy-c:8080",
            "http://proxy-a:8080"
        ]
    );
    assert_eq!(sink.records_with_status(RecordStatus::Failed).len(), 3);
    assert!(stats
        .errors()
        .iter()
        .all(|e| e.category == Some(ErrorCategory::RateLimit)));
}

#[tokio::test]
async fn test_memory_pressure_clears_caches() {
    let config = parse_config(CONFIG).unwrap();
    let loader = Arc::new(ScriptedLoader::failing_with(CrawlError::Memory(
        "browser ran out of memory".to_string(),
    )));
    let extractor = Arc::new(CountingExtractor::default());

    let stats = run_crawl_with(
        &config,
        collaborators(loader.clone(), extractor.clone(), Arc::new(MemorySink::new())),
    )
    .await
    .unwrap();

    assert_eq!(stats.failed_requests(), 1);
    assert_eq!(extractor.clears.load(Ordering::SeqCst), 1);
    assert!(loader.proxies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unstructured_failures_are_classified_by_message() {
    let config = parse_config(CONFIG).unwrap();
    let loader = Arc::new(ScriptedLoader::failing_with(CrawlError::other(
        "net::ERR_CONNECTION_RESET while navigating",
    )));

    let stats = run_crawl_with(
        &config,
        collaborators(loader, Arc::new(CountingExtractor::default()), Arc::new(MemorySink::new())),
    )
    .await
    .unwrap();

    assert_eq!(stats.failed_requests(), 1);
    assert_eq!(stats.errors()[0].category, Some(ErrorCategory::Network));
}
