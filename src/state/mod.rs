//! State module for tracking crawl progress
//!
//! - `CrawlState`: the orchestrator's state machine, with terminal states absorbing
//! - `Termination`: why a crawl ended

mod crawl_state;

pub use crawl_state::{CrawlState, Termination, TransitionError};
