//! Crawl state machine
//!
//! ```text
//! Init -> Paginating -> Enriching -> ... -> Paginating -> Terminated(Done)
//!   \____________\____________\_____________________-> Terminated(Error | Disconnected)
//! ```
use std::fmt;
use thiserror::Error;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Every page was processed and `Done` was emitted
    Done,

    /// A fatal error was emitted
    Error,

    /// The event sink went away; nothing more is emitted
    Disconnected,
}

/// Current position of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Locator not yet validated
    Init,

    /// Fetching or processing a listing page
    Paginating { page: u32 },

    /// Fetching one item's detail record
    Enriching { page: u32 },

    /// Absorbing end state
    Terminated(Termination),
}

/// Rejected state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: CrawlState,
    pub to: CrawlState,
}

impl CrawlState {
    /// Returns true once the crawl has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    /// The page currently being worked on, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Paginating { page } | Self::Enriching { page } => Some(*page),
            _ => None,
        }
    }

    /// Returns true if moving to `to` is allowed
    pub fn can_transition_to(&self, to: CrawlState) -> bool {
        use CrawlState::*;

        match (*self, to) {
            (Terminated(_), _) => false,
            (_, Terminated(_)) => true,
            (Init, Paginating { page }) => page == 1,
            (Paginating { page: from }, Paginating { page: to }) => to == from + 1,
            (Paginating { page: from }, Enriching { page: to }) => from == to,
            (Enriching { page: from }, Enriching { page: to }) => from == to,
            (Enriching { page: from }, Paginating { page: to }) => to == from + 1,
            _ => false,
        }
    }

    /// Moves to `to`, or reports why that is not allowed
    pub fn transition(self, to: CrawlState) -> Result<CrawlState, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Paginating { page } => write!(f, "paginating(page {})", page),
            Self::Enriching { page } => write!(f, "enriching(page {})", page),
            Self::Terminated(Termination::Done) => write!(f, "terminated(done)"),
            Self::Terminated(Termination::Error) => write!(f, "terminated(error)"),
            Self::Terminated(Termination::Disconnected) => write!(f, "terminated(disconnected)"),
        }
    }
}
