//! Recovery actions triggered by failed requests
//!
//! This module reacts to the category of a page that was given up on:
//! - `rate_limit` rotates to the next proxy of the pool
//! - `memory` clears collaborator caches, compacts retry counters and pauses
//!
//! Recovery is best effort. Failures are logged and never reach the caller.

mod memory;
mod proxy;

pub use memory::cleanup_memory;
pub use proxy::ProxyPool;

use crate::crawler::PageLoader;
use crate::errors::{ErrorCategory, ErrorHandler};
use crate::extract::{ContentExtractor, TextProcessor};
use crate::CrawlResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Recovery actions with handles to everything they act on
pub struct RecoveryActions {
    loader: Arc<dyn PageLoader>,
    proxies: ProxyPool,
    extractor: Arc<dyn ContentExtractor>,
    processor: Arc<dyn TextProcessor>,
    errors: Arc<ErrorHandler>,
    memory_pause: Duration,
}

impl RecoveryActions {
    /// Creates the recovery actions
    ///
    /// # Arguments
    ///
    /// * `loader` - Page loader that receives the rotated proxy
    /// * `proxies` - Proxy pool; an empty pool turns rotation into a no-op
    /// * `extractor` - Extractor whose caches are cleared on memory pressure
    /// * `processor` - Processor whose caches are cleared on memory pressure
    /// * `errors` - Error handler whose retry counters are compacted on memory pressure
    /// * `memory_pause` - Pause after a memory cleanup
    pub fn new(
        loader: Arc<dyn PageLoader>,
        proxies: ProxyPool,
        extractor: Arc<dyn ContentExtractor>,
        processor: Arc<dyn TextProcessor>,
        errors: Arc<ErrorHandler>,
        memory_pause: Duration,
    ) -> Self {
        Self {
            loader,
            proxies,
            extractor,
            processor,
            errors,
            memory_pause,
        }
    }

    pub fn proxies(&self) -> &ProxyPool {
        &self.proxies
    }

    /// Advances the proxy pool and installs the new proxy in the loader
    ///
    /// # Returns
    ///
    /// * `Ok(Some(url))` - The proxy now in use
    /// * `Ok(None)` - No proxy pool is configured
    /// * `Err(CrawlError)` - The loader rejected the proxy
    pub async fn rotate_proxy(&self) -> CrawlResult<Option<String>> {
        let Some(next) = self.proxies.rotate() else {
            debug!("No proxy pool configured, skipping rotation");
            return Ok(None);
        };

        self.loader.set_proxy(next).await?;
        info!(proxy = next, "Rotated proxy after rate limiting");
        Ok(Some(next.to_string()))
    }

    /// Clears collaborator caches, compacts retry counters and pauses
    pub async fn memory_cleanup(&self) {
        cleanup_memory(
            self.extractor.as_ref(),
            self.processor.as_ref(),
            self.errors.retry_policy(),
            self.memory_pause,
        )
        .await;
    }

    /// Runs the recovery action for a failure category, if it has one
    pub async fn recover(&self, category: ErrorCategory) {
        match category {
            ErrorCategory::RateLimit => {
                if let Err(e) = self.rotate_proxy().await {
                    warn!("Proxy rotation failed: {}", e);
                }
            }
            ErrorCategory::Memory => self.memory_cleanup().await,
            _ => {}
        }
    }
}
