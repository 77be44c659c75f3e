//! Scheduler for the crawl frontier and concurrent page visits
//!
//! This module handles:
//! - The FIFO frontier of crawl targets
//! - De-duplication of targets by their fragment-stripped URL
//! - Global concurrency limiting via a semaphore
//! - The per-run request budget
//! - Navigation and request-handler timeouts
//! - Page-level retries before the failed-request handler runs

use crate::config::{CrawlerConfig, TimeoutConfig};
use crate::crawler::orchestrator::{Orchestrator, PageOutcome};
use crate::url::{normalize_url, CrawlTarget};
use crate::{CrawlError, CrawlResult};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Limits applied to every page visit
#[derive(Debug, Clone, Copy)]
struct VisitLimits {
    navigation_timeout: Duration,
    handler_timeout: Duration,
    max_request_retries: u32,
}

/// Scheduler manages the frontier and dispatches page visits
///
/// The scheduler coordinates:
/// - Global concurrency limits (max concurrent page visits)
/// - The request budget (max targets dispatched per run)
/// - Page-level retries of failed loads and handler timeouts
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,

    /// Global semaphore for limiting concurrent visits
    semaphore: Arc<Semaphore>,

    /// Targets waiting to be visited, in discovery order
    frontier: VecDeque<CrawlTarget>,

    /// Fragment-stripped URLs already enqueued
    seen: HashSet<String>,

    max_requests: u64,
    dispatched: u64,
    limits: VisitLimits,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Runs each loaded page through the crawl steps
    /// * `config` - Concurrency, budget and retry settings
    /// * `timeouts` - Navigation and request-handler timeouts
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        config: &CrawlerConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let concurrency = config.max_concurrency.max(1) as usize;

        Self {
            orchestrator,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            max_requests: config.max_requests_per_crawl,
            dispatched: 0,
            limits: VisitLimits {
                navigation_timeout: timeouts.navigation(),
                handler_timeout: timeouts.request_handler(),
                max_request_retries: config.max_request_retries,
            },
        }
    }

    /// Adds a target to the frontier unless its URL was already seen
    ///
    /// # Returns
    ///
    /// `true` if the target was enqueued
    pub fn enqueue(&mut self, target: CrawlTarget) -> bool {
        let key = normalize_url(&target.url).unwrap_or_else(|_| target.url.clone());
        if !self.seen.insert(key) {
            debug!(url = %target.url, "Already enqueued, skipping");
            return false;
        }

        self.frontier.push_back(target);
        true
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Number of targets dispatched so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Runs until the frontier is drained or the request budget is spent
    ///
    /// Visits run concurrently, at most `max_concurrency` at a time. Targets
    /// discovered by a visit join the frontier as soon as it completes.
    pub async fn run(&mut self) {
        let mut tasks: JoinSet<Vec<CrawlTarget>> = JoinSet::new();

        loop {
            while self.dispatched < self.max_requests {
                let Some(target) = self.frontier.pop_front() else {
                    break;
                };

                let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Concurrency semaphore closed: {}", e);
                        return;
                    }
                };

                self.dispatched += 1;
                let orchestrator = Arc::clone(&self.orchestrator);
                let limits = self.limits;

                tasks.spawn(async move {
                    let _permit = permit;
                    visit(&orchestrator, target, limits).await
                });
            }

            match tasks.join_next().await {
                Some(Ok(discovered)) => {
                    for target in discovered {
                        self.enqueue(target);
                    }
                }
                Some(Err(e)) => {
                    error!("Page visit task failed: {}", e);
                }
                None => break,
            }
        }

        if !self.frontier.is_empty() {
            info!(
                remaining = self.frontier.len(),
                budget = self.max_requests,
                "Request budget exhausted, leaving targets unvisited"
            );
        }
    }
}

/// Visits one target, retrying the whole visit on load or handler failure
///
/// Returns the targets discovered on the page.
async fn visit(orchestrator: &Orchestrator, target: CrawlTarget, limits: VisitLimits) -> Vec<CrawlTarget> {
    orchestrator.stats().record_request();
    let mut retries = 0;

    loop {
        orchestrator.throttle().await;

        match attempt(orchestrator, &target, limits).await {
            Ok(outcome) => return outcome.discovered,
            Err(e) if retries < limits.max_request_retries => {
                retries += 1;
                warn!(
                    url = %target.url,
                    retry = retries,
                    max_retries = limits.max_request_retries,
                    "Page visit failed, retrying: {}",
                    e
                );
            }
            Err(e) => {
                orchestrator.handle_failed_request(&target, &e).await;
                return Vec::new();
            }
        }
    }
}

/// One load plus handler run, each under its own timeout
async fn attempt(
    orchestrator: &Orchestrator,
    target: &CrawlTarget,
    limits: VisitLimits,
) -> CrawlResult<PageOutcome> {
    let load = orchestrator
        .loader()
        .load(&target.url, limits.navigation_timeout);
    let page = tokio::time::timeout(limits.navigation_timeout, load)
        .await
        .map_err(|_| timeout_error(&target.url, limits.navigation_timeout))??;

    debug!(url = %target.url, status = page.status, "Page loaded");

    tokio::time::timeout(limits.handler_timeout, orchestrator.handle_page(target, page))
        .await
        .map_err(|_| timeout_error(&target.url, limits.handler_timeout))
}

fn timeout_error(url: &str, timeout: Duration) -> CrawlError {
    CrawlError::Timeout {
        url: url.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::orchestrator::Collaborators;
    use crate::crawler::{LoadedPage, PageLoader};
    use crate::extract::{ChunkingProcessor, ReadabilityExtractor};
    use crate::config::Config;
    use crate::output::{CrawlingStats, MemorySink, RecordStatus, ResultRecord, ResultSink};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const CONFIG: &str = r#"
[crawler]
start-urls = ["https://site.test/"]
max-crawl-depth = 3
max-concurrency = 2
max-requests-per-crawl = 3
max-request-retries = 2

[extraction]
min-content-length = 10
min-text-length = 10
fallback-min-text-length = 5

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
dataset-path = "./out/data.jsonl"
report-path = "./out/report.md"
"#;

    /// Serves fixed pages; unknown URLs fail with a network error
    #[derive(Default)]
    struct SiteLoader {
        pages: HashMap<String, String>,
        loads: Mutex<HashMap<String, u32>>,
        total: AtomicU32,
    }

    impl SiteLoader {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        fn loads_of(&self, url: &str) -> u32 {
            self.loads.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl PageLoader for SiteLoader {
        async fn load(&self, url: &str, _timeout: Duration) -> CrawlResult<LoadedPage> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.loads.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

            match self.pages.get(url) {
                Some(html) => Ok(LoadedPage {
                    url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    content_type: "text/html".to_string(),
                    html: html.clone(),
                }),
                None => Err(CrawlError::Network {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }

        async fn set_proxy(&self, _proxy_url: &str) -> CrawlResult<()> {
            Ok(())
        }
    }

    fn scheduler(loader: Arc<SiteLoader>, sink: Arc<dyn ResultSink>) -> Scheduler {
        scheduler_with(parse_config(CONFIG).unwrap(), loader, sink)
    }

    fn scheduler_with(config: Config, loader: Arc<SiteLoader>, sink: Arc<dyn ResultSink>) -> Scheduler {
        let collaborators = Collaborators {
            loader,
            extractor: Arc::new(ReadabilityExtractor::new()),
            processor: Arc::new(ChunkingProcessor::new(500, 0)),
            sink,
        };
        let orchestrator =
            Orchestrator::new(&config, collaborators, Arc::new(CrawlingStats::new())).unwrap();
        Scheduler::new(Arc::new(orchestrator), &config.crawler, &config.timeouts)
    }

    fn page_with_links(text: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{}">link</a>"#, href))
            .collect();
        format!("<html><body><main><p>{}</p>{}</main></body></html>", text, anchors)
    }

    #[test]
    fn test_enqueue_deduplicates_by_fragment_stripped_url() {
        let mut scheduler = scheduler(Arc::new(SiteLoader::default()), Arc::new(MemorySink::new()));

        assert!(scheduler.enqueue(CrawlTarget::start("https://site.test/a").unwrap()));
        assert!(!scheduler.enqueue(CrawlTarget::start("https://site.test/a#intro").unwrap()));
        assert!(scheduler.enqueue(CrawlTarget::start("https://site.test/a?page=2").unwrap()));
        assert_eq!(scheduler.frontier_size(), 2);
    }

    #[tokio::test]
    async fn test_crawls_discovered_pages_once() {
        let loader = Arc::new(
            SiteLoader::default()
                .with_page(
                    "https://site.test/",
                    &page_with_links("Welcome to the site.", &["/a", "/a#top", "/"]),
                )
                .with_page(
                    "https://site.test/a",
                    &page_with_links("Page A has content.", &["/"]),
                ),
        );
        let sink = Arc::new(MemorySink::new());
        let mut scheduler = scheduler(loader.clone(), sink.clone());

        scheduler.enqueue(CrawlTarget::start("https://site.test/").unwrap());
        scheduler.run().await;

        assert_eq!(scheduler.dispatched(), 2);
        assert_eq!(loader.loads_of("https://site.test/"), 1);
        assert_eq!(loader.loads_of("https://site.test/a"), 1);

        let stats = scheduler.orchestrator.stats();
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.successful_requests(), 2);
        assert_eq!(sink.records_with_status(RecordStatus::Success).len(), 2);
    }

    #[tokio::test]
    async fn test_page_level_retries_then_failed_request_handler() {
        let loader = Arc::new(SiteLoader::default());
        let sink = Arc::new(MemorySink::new());
        let mut scheduler = scheduler(loader.clone(), sink.clone());

        scheduler.enqueue(CrawlTarget::start("https://site.test/down").unwrap());
        scheduler.run().await;

        // 1 attempt + 2 page-level retries
        assert_eq!(loader.loads_of("https://site.test/down"), 3);

        let stats = scheduler.orchestrator.stats();
        assert_eq!(stats.total_requests(), 1);
        assert_eq!(stats.failed_requests(), 1);
        assert_eq!(stats.errors().len(), 1);
        assert_eq!(sink.records_with_status(RecordStatus::Failed).len(), 1);
    }

    #[tokio::test]
    async fn test_request_budget_limits_dispatch() {
        let mut loader = SiteLoader::default().with_page(
            "https://site.test/",
            &page_with_links("Index of many pages.", &["/1", "/2", "/3", "/4", "/5"]),
        );
        for i in 1..=5 {
            loader = loader.with_page(
                &format!("https://site.test/{}", i),
                &page_with_links("A numbered page.", &[]),
            );
        }
        let loader = Arc::new(loader);
        let mut scheduler = scheduler(loader.clone(), Arc::new(MemorySink::new()));

        scheduler.enqueue(CrawlTarget::start("https://site.test/").unwrap());
        scheduler.run().await;

        assert_eq!(scheduler.dispatched(), 3);
        assert_eq!(loader.total.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.frontier_size(), 3);
    }

    /// Fails every store with a retryable network error
    #[derive(Default)]
    struct UnreachableSink {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ResultSink for UnreachableSink {
        async fn store(&self, _records: &[ResultRecord]) -> CrawlResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CrawlError::Network {
                url: "sink://dataset".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_timeout_restarts_step_retries_and_counts_page_once() {
        let mut config = parse_config(CONFIG).unwrap();
        config.timeouts.request_handler_secs = 2;
        config.error_handling.max_retries = 3;
        config.error_handling.base_delay_ms = 1000;
        config.crawler.max_request_retries = 1;

        let loader = Arc::new(
            SiteLoader::default()
                .with_page("https://site.test/", &page_with_links("Welcome to the site.", &[])),
        );
        let sink = Arc::new(UnreachableSink::default());
        let mut scheduler = scheduler_with(config, loader.clone(), sink.clone());

        scheduler.enqueue(CrawlTarget::start("https://site.test/").unwrap());
        scheduler.run().await;

        // Each visit stores at 0s and 1s, then times out during the 2000ms
        // backoff; the failure record adds one more store
        assert_eq!(loader.loads_of("https://site.test/"), 2);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2 + 2 + 1);

        let retry = scheduler.orchestrator.error_handler().retry_policy();
        assert_eq!(retry.attempts("result-storage-https://site.test/"), 0);
        assert_eq!(retry.tracked_operations(), 0);

        let stats = scheduler.orchestrator.stats();
        assert_eq!(stats.processed_pages(), 1);
        assert_eq!(stats.failed_requests(), 1);
        assert_eq!(stats.successful_requests(), 0);
        assert_eq!(stats.errors()[0].category, Some(crate::errors::ErrorCategory::Timeout));
    }

    #[tokio::test]
    async fn test_zero_depth_visits_start_pages_only() {
        let mut config = parse_config(CONFIG).unwrap();
        config.crawler.max_crawl_depth = 0;

        let loader = Arc::new(
            SiteLoader::default()
                .with_page("https://site.test/", &page_with_links("Welcome to the site.", &["/a"]))
                .with_page("https://site.test/a", &page_with_links("Page A has content.", &[])),
        );
        let mut scheduler = scheduler_with(config, loader.clone(), Arc::new(MemorySink::new()));

        scheduler.enqueue(CrawlTarget::start("https://site.test/").unwrap());
        scheduler.run().await;

        assert_eq!(scheduler.dispatched(), 1);
        assert_eq!(loader.loads_of("https://site.test/a"), 0);
        assert_eq!(scheduler.orchestrator.stats().depth_exceeded_urls(), 1);
    }
}
