//! URL handling module for Sumi-Scribe
//!
//! This module provides glob matching, fragment-only normalization, origin
//! extraction, and the frontier filter that admits or rejects discovered links.

mod filter;
mod glob;
mod normalize;
mod origin;

use crate::UrlResult;

// Re-export main types and functions
pub use filter::{FilterDecision, FilterReason, UrlFilter};
pub use glob::Glob;
pub use normalize::{normalize_url, parse_http_url};
pub use origin::origin_of;

/// A unit of crawl work
///
/// Immutable once enqueued. `origin` is the origin of the start URL the target
/// descends from, so every record can be traced back to its documentation site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: u32,
    pub origin: String,
}

impl CrawlTarget {
    /// Creates a depth-0 target for a start URL
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_scribe::url::CrawlTarget;
    ///
    /// let target = CrawlTarget::start("https://docs.example.com/intro#top").unwrap();
    /// assert_eq!(target.url, "https://docs.example.com/intro");
    /// assert_eq!(target.depth, 0);
    /// assert_eq!(target.origin, "https://docs.example.com");
    /// ```
    pub fn start(url: &str) -> UrlResult<Self> {
        let normalized = normalize_url(url)?;
        let parsed = parse_http_url(&normalized)?;

        Ok(Self {
            url: normalized,
            depth: 0,
            origin: origin_of(&parsed),
        })
    }

    /// Creates a target for a link discovered on this target's page
    ///
    /// The child sits one level deeper and inherits the origin.
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
            origin: self.origin.clone(),
        }
    }
}
