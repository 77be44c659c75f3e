use crate::config::CrawlerConfig;
use crate::url::glob::Glob;
use crate::url::normalize::normalize_url;
use crate::UrlResult;
use std::fmt;

/// Why a URL was admitted to or rejected from the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterReason {
    /// The link sits at or beyond the maximum crawl depth
    DepthExceeded,
    /// The link matched an exclude glob
    ExcludedPattern,
    /// The link matched no include glob, or could not be parsed
    NotIncluded,
    /// The link may be visited
    Allowed,
}

impl FilterReason {
    /// Converts the reason to its stable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepthExceeded => "depth_exceeded",
            Self::ExcludedPattern => "excluded_pattern",
            Self::NotIncluded => "not_included",
            Self::Allowed => "allowed",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a frontier check; computed fresh for every link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub allowed: bool,
    pub reason: FilterReason,
}

impl FilterDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: FilterReason::Allowed,
        }
    }

    fn deny(reason: FilterReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Decides which discovered links are worth visiting
///
/// Checks run in a fixed order and the first failing check wins:
/// 1. depth (`depth >= max_depth` is always denied)
/// 2. exclude globs
/// 3. include globs (at least one must match)
#[derive(Debug, Clone)]
pub struct UrlFilter {
    max_depth: u32,
    include: Vec<Glob>,
    exclude: Vec<Glob>,
}

impl UrlFilter {
    /// Compiles a filter from raw glob patterns
    ///
    /// An empty include list behaves like `["**"]`.
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Depth at which links stop being admitted
    /// * `include` - Glob patterns of which at least one must match
    /// * `exclude` - Glob patterns that always reject
    ///
    /// # Returns
    ///
    /// * `Ok(UrlFilter)` - The compiled filter
    /// * `Err(UrlError::InvalidGlob)` - One of the patterns is invalid
    pub fn new(max_depth: u32, include: &[String], exclude: &[String]) -> UrlResult<Self> {
        let mut include = include
            .iter()
            .map(|p| Glob::new(p))
            .collect::<UrlResult<Vec<_>>>()?;
        let exclude = exclude
            .iter()
            .map(|p| Glob::new(p))
            .collect::<UrlResult<Vec<_>>>()?;

        if include.is_empty() {
            include.push(Glob::new("**")?);
        }

        Ok(Self {
            max_depth,
            include,
            exclude,
        })
    }

    /// Builds the filter described by the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> UrlResult<Self> {
        Self::new(
            config.max_crawl_depth,
            &config.include_url_globs,
            &config.exclude_url_globs,
        )
    }

    /// Returns the configured maximum depth
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Decides whether a link at the given depth should be visited
    ///
    /// Never fails: malformed URLs are denied as `not_included`.
    pub fn should_crawl(&self, url: &str, depth: u32) -> FilterDecision {
        if depth >= self.max_depth {
            return FilterDecision::deny(FilterReason::DepthExceeded);
        }

        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized,
            Err(_) => return FilterDecision::deny(FilterReason::NotIncluded),
        };

        if self.exclude.iter().any(|g| g.matches(&normalized)) {
            return FilterDecision::deny(FilterReason::ExcludedPattern);
        }

        if self.include.iter().any(|g| g.matches(&normalized)) {
            FilterDecision::allow()
        } else {
            FilterDecision::deny(FilterReason::NotIncluded)
        }
    }
}
