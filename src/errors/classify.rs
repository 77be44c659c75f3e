use crate::errors::{ErrorCategory, ErrorSeverity};
use crate::{CrawlError, FailureKind};

/// Classifies a page-level failure into a category and severity
///
/// Failures raised inside the crate carry a [`FailureKind`] and map straight
/// to a category. Unstructured failures fall back to message matching.
pub fn classify(error: &CrawlError) -> (ErrorCategory, ErrorSeverity) {
    let category = category_for_kind(error.kind())
        .unwrap_or_else(|| classify_message(&error.to_string()));
    (category, severity_for(category))
}

/// Maps a structured failure kind to its category
///
/// Returns `None` for [`FailureKind::Unstructured`].
pub fn category_for_kind(kind: FailureKind) -> Option<ErrorCategory> {
    let category = match kind {
        FailureKind::Network => ErrorCategory::Network,
        FailureKind::Timeout => ErrorCategory::Timeout,
        FailureKind::RateLimit => ErrorCategory::RateLimit,
        FailureKind::HttpStatus | FailureKind::ContentMismatch => ErrorCategory::Validation,
        FailureKind::ContentTooShort | FailureKind::Extraction => ErrorCategory::Extraction,
        // Storage failures are recorded but never retried
        FailureKind::Processing | FailureKind::Storage => ErrorCategory::Processing,
        FailureKind::Parse => ErrorCategory::Parsing,
        FailureKind::Memory => ErrorCategory::Memory,
        FailureKind::InvalidTransition => ErrorCategory::Unknown,
        FailureKind::Unstructured => return None,
    };
    Some(category)
}

/// Classifies a free-form failure message by substring
///
/// The first matching group wins, checked in this order: timeout, network,
/// rate limit, memory, parsing, extraction, validation.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["timeout", "etimedout", "timed out"]) {
        ErrorCategory::Timeout
    } else if has(&["econnreset", "enotfound", "econnrefused", "network", "connection"]) {
        ErrorCategory::Network
    } else if has(&["rate limit", "too many requests", "429"]) {
        ErrorCategory::RateLimit
    } else if has(&["out of memory", "heap", "memory"]) {
        ErrorCategory::Memory
    } else if has(&["parse", "syntax"]) {
        ErrorCategory::Parsing
    } else if has(&["extract"]) {
        ErrorCategory::Extraction
    } else if has(&["invalid", "validation"]) {
        ErrorCategory::Validation
    } else {
        ErrorCategory::Unknown
    }
}

/// Severity of a category
pub fn severity_for(category: ErrorCategory) -> ErrorSeverity {
    match category {
        ErrorCategory::Memory => ErrorSeverity::High,
        ErrorCategory::Network | ErrorCategory::Timeout => ErrorSeverity::Medium,
        ErrorCategory::RateLimit => ErrorSeverity::Low,
        _ => ErrorSeverity::Medium,
    }
}
