//! Failure classification, step-level retries and non-fatal error handling
//!
//! Every page-level failure is turned into a [`ClassifiedError`] carrying a
//! category and a severity. Only the category decides whether a failure is
//! retried; severity only decides how loudly it is logged.

mod classify;
mod handler;
mod retry;

use crate::CrawlError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use classify::{category_for_kind, classify, classify_message, severity_for};
pub use handler::{ErrorHandler, ErrorTally, Handled, Skip};
pub use retry::{RetryPolicy, RetrySettings};

/// Broad class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Parsing,
    Extraction,
    Processing,
    Validation,
    Timeout,
    RateLimit,
    Memory,
    Unknown,
}

impl ErrorCategory {
    /// All categories, in reporting order
    pub const ALL: [ErrorCategory; 9] = [
        Self::Network,
        Self::Parsing,
        Self::Extraction,
        Self::Processing,
        Self::Validation,
        Self::Timeout,
        Self::RateLimit,
        Self::Memory,
        Self::Unknown,
    ];

    /// Returns true if failures of this category are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::RateLimit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Extraction => "extraction",
            Self::Processing => "processing",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::Memory => "memory",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How serious a failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free-form context attached to a classified failure (url, step, ...)
pub type ErrorContext = BTreeMap<String, String>;

/// Builds the context map for a step of a page visit
pub fn step_context(url: &str, step: &str) -> ErrorContext {
    let mut context = ErrorContext::new();
    context.insert("url".to_string(), url.to_string());
    context.insert("step".to_string(), step.to_string());
    context
}

/// A failure after classification
///
/// Immutable once created; `retryable` always agrees with the category.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedError {
    message: String,
    category: ErrorCategory,
    severity: ErrorSeverity,
    context: ErrorContext,
    timestamp: DateTime<Utc>,
    retryable: bool,
}

impl ClassifiedError {
    /// Classifies a page-level failure
    pub fn from_error(error: &CrawlError, context: ErrorContext) -> Self {
        let (category, severity) = classify(error);
        Self {
            message: error.to_string(),
            category,
            severity,
            context,
            timestamp: Utc::now(),
            retryable: category.is_retryable(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Emits the failure at the log level matching its severity
    pub fn log(&self) {
        let url = self.context.get("url").map(String::as_str).unwrap_or("-");
        let step = self.context.get("step").map(String::as_str).unwrap_or("-");

        match self.severity {
            ErrorSeverity::Low => tracing::debug!(
                url,
                step,
                category = %self.category,
                "{}",
                self.message
            ),
            ErrorSeverity::Medium => tracing::warn!(
                url,
                step,
                category = %self.category,
                "{}",
                self.message
            ),
            ErrorSeverity::High | ErrorSeverity::Critical => tracing::error!(
                url,
                step,
                category = %self.category,
                severity = %self.severity,
                "{}",
                self.message
            ),
        }
    }
}
