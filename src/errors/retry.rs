use crate::config::{BackoffStrategy, ErrorHandlingConfig};
use crate::errors::classify;
use crate::CrawlResult;
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Retry and backoff parameters
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub strategy: BackoffStrategy,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetrySettings {
    /// Linear backoff with the given retry budget and base delay
    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            strategy: BackoffStrategy::Linear,
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl From<&ErrorHandlingConfig> for RetrySettings {
    fn from(config: &ErrorHandlingConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            strategy: config.strategy,
            multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

/// Step-level retry policy with per-operation attempt counters
///
/// A counter is keyed by a caller-provided operation id (for example
/// `content-extraction-https://docs.example.com/intro`). It is created on the
/// first failure and removed once the operation succeeds or gives up, so
/// unrelated operations never share a budget.
#[derive(Debug)]
pub struct RetryPolicy {
    settings: RetrySettings,
    attempts: Mutex<HashMap<String, u32>>,
}

impl RetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self {
            settings,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Runs an operation, retrying retryable failures with backoff
    ///
    /// A failure is retried while the failure count for `operation_id` stays
    /// within `max_retries` and its category is retryable, which allows up to
    /// `1 + max_retries` attempts in total.
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful result
    /// * `Err(CrawlError)` - The error that ended the retries
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation_id: &str,
        mut operation: F,
    ) -> CrawlResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CrawlResult<T>>,
    {
        // Removes the counter however this future ends, including when an
        // outer timeout drops it between attempts
        let _counter = CounterReset {
            policy: self,
            operation_id,
        };

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let attempt = self.record_failure(operation_id);
                    let (category, _) = classify(&error);

                    if !category.is_retryable() || attempt > self.settings.max_retries {
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt);
                    debug!(
                        operation_id,
                        attempt,
                        category = %category,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after failure: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Computes the delay before the retry that follows failure `attempt`
    ///
    /// `attempt` starts at 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);

        match self.settings.strategy {
            BackoffStrategy::Linear => self.settings.base_delay * attempt,
            BackoffStrategy::Exponential => {
                let base_ms = self.settings.base_delay.as_millis() as f64;
                let raw_ms = base_ms * self.settings.multiplier.powi(attempt as i32 - 1);
                let capped_ms = raw_ms.min(self.settings.max_delay.as_millis() as f64) as u64;

                if self.settings.jitter && capped_ms > 0 {
                    Duration::from_millis(rand::thread_rng().gen_range(0..=capped_ms))
                } else {
                    Duration::from_millis(capped_ms)
                }
            }
        }
    }

    /// Number of operations currently holding a failure counter
    pub fn tracked_operations(&self) -> usize {
        self.lock().len()
    }

    /// Releases counter-map capacity left behind by finished operations
    ///
    /// Counters of operations still in flight are kept. Returns how many
    /// remain.
    pub fn release_memory(&self) -> usize {
        let mut attempts = self.lock();
        attempts.shrink_to_fit();
        attempts.len()
    }

    /// Returns the stored failure count for an operation (0 when absent)
    pub fn attempts(&self, operation_id: &str) -> u32 {
        self.lock().get(operation_id).copied().unwrap_or(0)
    }

    fn record_failure(&self, operation_id: &str) -> u32 {
        let mut attempts = self.lock();
        let count = attempts.entry(operation_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn clear(&self, operation_id: &str) {
        self.lock().remove(operation_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears an operation's counter when dropped
struct CounterReset<'a> {
    policy: &'a RetryPolicy,
    operation_id: &'a str,
}

impl Drop for CounterReset<'_> {
    fn drop(&mut self) {
        self.policy.clear(self.operation_id);
    }
}
