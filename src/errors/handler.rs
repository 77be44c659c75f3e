use crate::errors::{ClassifiedError, ErrorCategory, ErrorContext, RetryPolicy, RetrySettings};
use crate::{CrawlError, CrawlResult};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Outcome of an error-handled step
#[derive(Debug)]
pub enum Handled<T> {
    /// The step produced a value, possibly after retries
    Completed(T),
    /// The step failed for good and was downgraded to a skip
    Skipped(Skip),
}

impl<T> Handled<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Converts the outcome into an `Option`, dropping skip details
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }
}

/// Details of a skipped step
#[derive(Debug, Clone)]
pub struct Skip {
    /// Human-readable reason, the final error message
    pub reason: String,
    /// The classified final failure
    pub error: ClassifiedError,
    /// Always false: a skip means nothing was recovered
    pub recovered: bool,
}

impl Skip {
    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}

/// Snapshot of the errors seen by an [`ErrorHandler`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    pub total_errors: u64,
    pub errors_by_category: BTreeMap<ErrorCategory, u64>,
}

/// Runs fallible steps under the retry policy and turns final failures into skips
///
/// Nothing handled here ever propagates an error to the caller: the caller
/// checks for [`Handled::Skipped`] and records a warning for the step.
#[derive(Debug)]
pub struct ErrorHandler {
    retry: RetryPolicy,
    total_errors: AtomicU64,
    by_category: Mutex<BTreeMap<ErrorCategory, u64>>,
}

impl ErrorHandler {
    pub fn new(settings: RetrySettings) -> Self {
        Self {
            retry: RetryPolicy::new(settings),
            total_errors: AtomicU64::new(0),
            by_category: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs a step with retries; exhausted failures become [`Handled::Skipped`]
    ///
    /// # Arguments
    ///
    /// * `operation_id` - Stable id keying the retry counter
    /// * `context` - Attached to the classified error (url, step, ...)
    /// * `operation` - Factory producing one attempt of the step
    pub async fn execute_with_error_handling<T, F, Fut>(
        &self,
        operation_id: &str,
        context: ErrorContext,
        operation: F,
    ) -> Handled<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CrawlResult<T>>,
    {
        match self.retry.execute_with_retry(operation_id, operation).await {
            Ok(value) => Handled::Completed(value),
            Err(error) => {
                let classified = self.handle_error(&error, context);
                Handled::Skipped(Skip {
                    reason: classified.message().to_string(),
                    error: classified,
                    recovered: false,
                })
            }
        }
    }

    /// Classifies a failure, counts it and logs it at its severity's level
    pub fn handle_error(&self, error: &CrawlError, context: ErrorContext) -> ClassifiedError {
        let classified = ClassifiedError::from_error(error, context);

        self.total_errors.fetch_add(1, Ordering::Relaxed);
        *self
            .by_category
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(classified.category())
            .or_insert(0) += 1;

        classified.log();
        classified
    }

    /// Returns the current error tally
    pub fn tally(&self) -> ErrorTally {
        ErrorTally {
            total_errors: self.total_errors.load(Ordering::Relaxed),
            errors_by_category: self
                .by_category
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}
