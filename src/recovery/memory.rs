use crate::errors::RetryPolicy;
use crate::extract::{ContentExtractor, TextProcessor};
use std::time::Duration;
use tracing::{debug, warn};

/// Releases what the crawl can release under memory pressure
///
/// Clears the collaborators' caches and compacts the retry counters, then
/// pauses so in-flight work can drain before new pages are loaded.
pub async fn cleanup_memory(
    extractor: &dyn ContentExtractor,
    processor: &dyn TextProcessor,
    retry: &RetryPolicy,
    pause: Duration,
) {
    warn!(pause_ms = pause.as_millis() as u64, "Memory pressure: clearing caches");

    extractor.clear_caches();
    processor.clear_caches();
    let live = retry.release_memory();
    debug!(live_retry_counters = live, "Retry counters compacted");

    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}
