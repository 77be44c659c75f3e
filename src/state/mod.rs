//! State module for tracking page visits
//!
//! Each page visit is an explicit state machine; an invalid transition is
//! reported as a [`CrawlError::InvalidTransition`](crate::CrawlError) rather
//! than a panic.

mod page_state;

// Re-export main types
pub use page_state::{PageState, PageStateMachine};
