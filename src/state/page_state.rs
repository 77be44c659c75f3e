//! Page state definitions for a single page visit
//!
//! A visit walks `Fetching → Extracting → Processing → Storing → LinkDiscovery
//! → Done`, and may end in `Failed(category)` from any non-terminal state.

use crate::errors::ErrorCategory;
use crate::{CrawlError, CrawlResult};
use std::fmt;

/// Represents the current step of a page visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page is being loaded and its content read
    Fetching,

    /// Main text is being extracted from the page
    Extracting,

    /// Extracted text is being chunked
    Processing,

    /// Records are being pushed to the sink
    Storing,

    /// Links on the page are being filtered and enqueued
    LinkDiscovery,

    // ===== Terminal States =====
    /// Page was fully processed
    Done,

    /// Page was given up on
    Failed(ErrorCategory),
}

impl PageState {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the state that follows this one on the success path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Fetching => Some(Self::Extracting),
            Self::Extracting => Some(Self::Processing),
            Self::Processing => Some(Self::Storing),
            Self::Storing => Some(Self::LinkDiscovery),
            Self::LinkDiscovery => Some(Self::Done),
            Self::Done | Self::Failed(_) => None,
        }
    }

    /// Returns true if moving from this state to `to` is allowed
    pub fn can_transition_to(&self, to: PageState) -> bool {
        match to {
            Self::Failed(_) => !self.is_terminal(),
            other => self.next() == Some(other),
        }
    }

    /// Name of the step, used as the `step` field in logs and error context
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Processing => "processing",
            Self::Storing => "storing",
            Self::LinkDiscovery => "link_discovery",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(category) => write!(f, "failed({})", category),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Tracks the state of one page visit and rejects invalid transitions
#[derive(Debug, Clone)]
pub struct PageStateMachine {
    state: PageState,
    history: Vec<PageState>,
}

impl PageStateMachine {
    /// Starts a visit in `Fetching`
    pub fn new() -> Self {
        Self {
            state: PageState::Fetching,
            history: vec![PageState::Fetching],
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Every state the visit has been in, in order
    pub fn history(&self) -> &[PageState] {
        &self.history
    }

    /// Moves to `to`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was applied
    /// * `Err(CrawlError::InvalidTransition)` - The transition is not allowed;
    ///   the state is left unchanged
    pub fn transition(&mut self, to: PageState) -> CrawlResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Moves to the next state on the success path
    pub fn advance(&mut self) -> CrawlResult<PageState> {
        let to = self.state.next().ok_or(CrawlError::InvalidTransition {
            from: self.state,
            to: PageState::Done,
        })?;
        self.transition(to)?;
        Ok(to)
    }

    /// Moves to `Failed(category)`
    pub fn fail(&mut self, category: ErrorCategory) -> CrawlResult<()> {
        self.transition(PageState::Failed(category))
    }
}

impl Default for PageStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
