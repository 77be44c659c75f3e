//! Crawl orchestrator: the per-page state machine
//!
//! This module drives a loaded page through
//! `Fetching → Extracting → Processing → Storing → LinkDiscovery → Done`:
//! - Every fallible step runs under the error handler with its own operation id
//! - A skipped step ends the page in `Failed(category)` with a failure record
//! - Link discovery filters every link at `depth + 1` and returns the admitted
//!   ones as new crawl targets
//! - Pages the scheduler gives up on go through the failed-request handler,
//!   which also triggers recovery

use crate::config::{Config, DynamicContentConfig, ExtractionConfig};
use crate::crawler::fetcher::{LoadedPage, PageLoader};
use crate::crawler::parser::extract_links;
use crate::errors::{step_context, ErrorHandler, Handled, RetrySettings, Skip};
use crate::extract::{ContentExtractor, ExtractOptions, Extraction, Processed, SourceInfo, TextProcessor};
use crate::output::{CrawlingStats, ResultRecord, ResultSink};
use crate::recovery::{ProxyPool, RecoveryActions};
use crate::state::{PageState, PageStateMachine};
use crate::url::{normalize_url, CrawlTarget, FilterReason, UrlFilter};
use crate::{CrawlError, CrawlResult, ScribeError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// The pluggable collaborators of a crawl
///
/// Built from the configuration by [`Collaborators::from_config`], or assembled
/// by hand to crawl with a different browser layer, extractor or sink.
#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn PageLoader>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub processor: Arc<dyn TextProcessor>,
    pub sink: Arc<dyn ResultSink>,
}

impl Collaborators {
    /// Builds the default collaborators
    ///
    /// The HTTP loader starts behind the first configured proxy, if any.
    ///
    /// # Returns
    ///
    /// * `Ok(Collaborators)` - Loader, extractor, processor and sink are ready
    /// * `Err(ScribeError)` - The loader or the dataset could not be created
    pub fn from_config(config: &Config) -> Result<Self, ScribeError> {
        use crate::crawler::fetcher::HttpPageLoader;
        use crate::extract::{ChunkingProcessor, ReadabilityExtractor};

        let first_proxy = config.proxy.urls.first().map(String::as_str);
        let loader = HttpPageLoader::new(&config.user_agent, first_proxy)?;
        let sink = crate::output::open_sink(std::path::Path::new(&config.output.dataset_path))?;

        Ok(Self {
            loader: Arc::new(loader),
            extractor: Arc::new(ReadabilityExtractor::new()),
            processor: Arc::new(ChunkingProcessor::from_config(&config.processing)),
            sink,
        })
    }
}

/// Result of running a page through the state machine
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// Terminal state the page ended in
    pub state: PageState,
    /// Admitted links, to be handed to the scheduler
    pub discovered: Vec<CrawlTarget>,
}

/// A step that ended the page early
struct StepFailure {
    step: &'static str,
    skip: Skip,
}

/// Drives single pages through the crawl steps
///
/// Shared between concurrent page visits as `Arc<Orchestrator>`; all mutable
/// state lives in the stats, the retry counters, the processed-page set and
/// the sink.
pub struct Orchestrator {
    filter: UrlFilter,
    errors: Arc<ErrorHandler>,
    stats: Arc<CrawlingStats>,
    loader: Arc<dyn PageLoader>,
    extractor: Arc<dyn ContentExtractor>,
    processor: Arc<dyn TextProcessor>,
    sink: Arc<dyn ResultSink>,
    recovery: RecoveryActions,
    dynamic_content: DynamicContentConfig,
    extraction: ExtractionConfig,
    request_delay: Duration,
    /// Targets already counted in the processing stats
    processed: Mutex<HashSet<String>>,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `collaborators` - Loader, extractor, processor and sink
    /// * `stats` - Statistics shared with the rest of the run
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to handle pages
    /// * `Err(ScribeError)` - A URL glob failed to compile
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        stats: Arc<CrawlingStats>,
    ) -> Result<Self, ScribeError> {
        let filter = UrlFilter::from_config(&config.crawler)?;
        let errors = Arc::new(ErrorHandler::new(RetrySettings::from(&config.error_handling)));

        let recovery = RecoveryActions::new(
            Arc::clone(&collaborators.loader),
            ProxyPool::new(config.proxy.urls.clone()),
            Arc::clone(&collaborators.extractor),
            Arc::clone(&collaborators.processor),
            Arc::clone(&errors),
            Duration::from_millis(config.error_handling.memory_cleanup_pause_ms),
        );

        Ok(Self {
            filter,
            errors,
            stats,
            loader: collaborators.loader,
            extractor: collaborators.extractor,
            processor: collaborators.processor,
            sink: collaborators.sink,
            recovery,
            dynamic_content: config.dynamic_content.clone(),
            extraction: config.extraction.clone(),
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            processed: Mutex::new(HashSet::new()),
        })
    }

    pub fn stats(&self) -> &Arc<CrawlingStats> {
        &self.stats
    }

    pub fn loader(&self) -> &Arc<dyn PageLoader> {
        &self.loader
    }

    pub fn filter(&self) -> &UrlFilter {
        &self.filter
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn recovery(&self) -> &RecoveryActions {
        &self.recovery
    }

    /// Waits the configured inter-request delay, if any
    pub async fn throttle(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    /// Runs a loaded page through every step of the state machine
    ///
    /// Never fails: a step that is skipped ends the page in
    /// `Failed(category)`, which is recorded in the stats and the sink.
    pub async fn handle_page(&self, target: &CrawlTarget, page: LoadedPage) -> PageOutcome {
        let mut machine = PageStateMachine::new();

        match self.run_steps(target, &page, &mut machine).await {
            Ok(discovered) => {
                self.stats.record_success();
                debug!(
                    url = %target.url,
                    depth = target.depth,
                    discovered = discovered.len(),
                    "Page done"
                );
                PageOutcome {
                    state: machine.state(),
                    discovered,
                }
            }
            Err(failure) => {
                let category = failure.skip.category();
                if let Err(e) = machine.fail(category) {
                    warn!(url = %target.url, "{}", e);
                }

                self.stats.record_failure();
                self.stats.add_error(
                    format!("{} step failed: {}", failure.step, failure.skip.reason),
                    target.url.as_str(),
                    Some(category),
                );
                self.store_failure_record(target, &failure.skip.reason).await;

                PageOutcome {
                    state: PageState::Failed(category),
                    discovered: Vec::new(),
                }
            }
        }
    }

    /// Handles a page the scheduler gave up on after its page-level retries
    ///
    /// Classifies the failure, records it, pushes a failure record and runs
    /// the recovery action for its category.
    pub async fn handle_failed_request(&self, target: &CrawlTarget, error: &CrawlError) {
        let classified = self
            .errors
            .handle_error(error, step_context(&target.url, "request"));

        self.stats.record_failure();
        self.stats.add_error(
            format!("Request failed: {}", classified.message()),
            target.url.as_str(),
            Some(classified.category()),
        );
        self.store_failure_record(target, classified.message()).await;

        self.recovery.recover(classified.category()).await;
    }

    async fn run_steps(
        &self,
        target: &CrawlTarget,
        page: &LoadedPage,
        machine: &mut PageStateMachine,
    ) -> Result<Vec<CrawlTarget>, StepFailure> {
        let url = target.url.as_str();

        // Fetching
        self.fetch_content(url, page).await?;
        self.advance(machine, url)?;

        // Extracting
        let extraction = self.extract_content(url, &page.html).await?;
        self.advance(machine, url)?;

        // Processing
        let processed = self.process_text(url, &extraction).await?;
        self.record_processed(url, &processed);
        self.advance(machine, url)?;

        // Storing
        self.store_results(target, &extraction, processed).await?;
        self.advance(machine, url)?;

        // LinkDiscovery
        let discovered = self.discover_links(target, page);
        self.advance(machine, url)?;

        Ok(discovered)
    }

    /// Counts a processed page once per target, however often it is visited
    fn record_processed(&self, url: &str, processed: &Processed) {
        let first = self
            .processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.to_string());

        if first {
            self.stats
                .record_processed_page(processed.chunks.len() as u64, processed.total_tokens());
        } else {
            debug!(url, "Page already counted as processed");
        }
    }

    /// Runs one wrapped step; a skip is recorded as a warning and ends the page
    async fn wrapped<T, F, Fut>(
        &self,
        step: &'static str,
        operation_id: String,
        url: &str,
        operation: F,
    ) -> Result<T, StepFailure>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = CrawlResult<T>>,
    {
        match self
            .errors
            .execute_with_error_handling(&operation_id, step_context(url, step), operation)
            .await
        {
            Handled::Completed(value) => Ok(value),
            Handled::Skipped(skip) => {
                self.stats.add_warning(
                    format!("Skipped {} step: {}", step, skip.reason),
                    url,
                    Some(skip.category()),
                );
                Err(StepFailure { step, skip })
            }
        }
    }

    fn advance(&self, machine: &mut PageStateMachine, url: &str) -> Result<(), StepFailure> {
        match machine.advance() {
            Ok(_) => Ok(()),
            Err(error) => Err(StepFailure {
                step: "transition",
                skip: Skip {
                    reason: error.to_string(),
                    error: self.errors.handle_error(&error, step_context(url, "transition")),
                    recovered: false,
                },
            }),
        }
    }

    async fn fetch_content(&self, url: &str, page: &LoadedPage) -> Result<(), StepFailure> {
        let minimum = self.extraction.min_content_length;

        self.wrapped("fetch", format!("content-fetch-{}", url), url, || async move {
            if self.dynamic_content.enabled {
                self.wait_for_dynamic_content(page).await;
            }

            let length = page.html.chars().count();
            if length < minimum {
                return Err(CrawlError::ContentTooShort {
                    url: url.to_string(),
                    length,
                    minimum,
                });
            }
            Ok(())
        })
        .await
    }

    /// Settle wait plus a bounded readiness check; neither can fail the page
    async fn wait_for_dynamic_content(&self, page: &LoadedPage) {
        tokio::time::sleep(Duration::from_millis(self.dynamic_content.wait_ms)).await;

        let readiness = Duration::from_millis(self.dynamic_content.readiness_timeout_ms);
        match tokio::time::timeout(readiness, self.loader.wait_until_ready(page, readiness)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(url = %page.url, "Readiness check failed: {}", e),
            Err(_) => debug!(url = %page.url, "Readiness check timed out, continuing"),
        }
    }

    async fn extract_content(&self, url: &str, html: &str) -> Result<Extraction, StepFailure> {
        let primary = ExtractOptions {
            min_text_length: self.extraction.min_text_length,
        };
        let fallback = ExtractOptions {
            min_text_length: self.extraction.fallback_min_text_length,
        };
        let extractor = self.extractor.as_ref();

        self.wrapped("extraction", format!("content-extraction-{}", url), url, || async move {
            match extractor.extract(html, url, &primary) {
                Ok(extraction) if extraction.is_usable() => return Ok(extraction),
                Ok(_) => debug!(url, "Primary extraction too short, trying fallback"),
                Err(e) => debug!(url, "Primary extraction failed, trying fallback: {}", e),
            }

            let extraction = extractor.extract(html, url, &fallback)?;
            if extraction.is_usable() {
                Ok(extraction)
            } else {
                Err(CrawlError::Extraction {
                    url: url.to_string(),
                    message: format!(
                        "no usable text after fallback extraction (minimum {} characters)",
                        fallback.min_text_length
                    ),
                })
            }
        })
        .await
    }

    async fn process_text(&self, url: &str, extraction: &Extraction) -> Result<Processed, StepFailure> {
        let processor = self.processor.as_ref();
        let source = SourceInfo {
            url: url.to_string(),
            title: extraction.title.clone(),
        };
        let source = &source;
        let text = extraction.text.as_str();

        self.wrapped("processing", format!("text-processing-{}", url), url, || async move {
            let processed = processor.process(text, source)?;
            if !processed.success {
                return Err(CrawlError::Processing {
                    url: url.to_string(),
                    message: "text processor produced no chunks".to_string(),
                });
            }
            Ok(processed)
        })
        .await
    }

    async fn store_results(
        &self,
        target: &CrawlTarget,
        extraction: &Extraction,
        processed: Processed,
    ) -> Result<(), StepFailure> {
        let url = target.url.as_str();
        let records: Vec<ResultRecord> = processed
            .chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                ResultRecord::success(
                    url,
                    extraction.title.clone(),
                    chunk.content,
                    index,
                    chunk.metadata,
                    target.depth,
                )
            })
            .collect();
        let records = records.as_slice();
        let sink = self.sink.as_ref();

        self.wrapped("storage", format!("result-storage-{}", url), url, || async move {
            sink.store(records).await
        })
        .await
    }

    /// Filters the page's links at `depth + 1` and returns the admitted ones
    fn discover_links(&self, target: &CrawlTarget, page: &LoadedPage) -> Vec<CrawlTarget> {
        let base = match Url::parse(&page.final_url).or_else(|_| Url::parse(&target.url)) {
            Ok(base) => base,
            Err(e) => {
                warn!(url = %target.url, "Cannot resolve links: {}", e);
                return Vec::new();
            }
        };

        let child_depth = target.depth + 1;
        let mut discovered = Vec::new();

        for link in extract_links(&page.html, &base) {
            let decision = self.filter.should_crawl(&link, child_depth);
            match decision.reason {
                FilterReason::Allowed => {
                    if let Ok(normalized) = normalize_url(&link) {
                        discovered.push(target.child(normalized));
                    }
                }
                FilterReason::DepthExceeded => self.stats.record_depth_exceeded(),
                FilterReason::ExcludedPattern | FilterReason::NotIncluded => {
                    self.stats.record_filtered()
                }
            }
        }

        discovered
    }

    /// Pushes a failure record; a sink failure is only logged
    async fn store_failure_record(&self, target: &CrawlTarget, reason: &str) {
        let record = ResultRecord::failure(&target.url, target.depth, reason);
        if let Err(e) = self.sink.store(&[record]).await {
            warn!(url = %target.url, "Failed to store failure record: {}", e);
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("filter", &self.filter)
            .field("proxies", &self.recovery.proxies().len())
            .field("request_delay", &self.request_delay)
            .finish_non_exhaustive()
    }
}

/// Logs a one-line summary of a finished run
pub(crate) fn log_run_summary(stats: &CrawlingStats) {
    info!(
        total = stats.total_requests(),
        succeeded = stats.successful_requests(),
        failed = stats.failed_requests(),
        filtered = stats.filtered_urls(),
        depth_exceeded = stats.depth_exceeded_urls(),
        chunks = stats.extracted_chunks(),
        "Crawl finished: {:.2}% success in {}s",
        stats.success_rate(),
        stats.duration().num_seconds()
    );
}
