//! Catalog-Harvest: incremental catalog crawling and inventory export
//!
//! This crate paginates remote catalog APIs, enriches every listed item through a
//! second per-item endpoint, deduplicates results, and streams typed progress events
//! to a consumer as they are produced. A second pipeline syncs a store's inventory
//! into an export sink with bounded retry.

pub mod config;
pub mod crawler;
pub mod events;
pub mod state;
pub mod sync;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Transition(#[from] state::TransitionError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A GET that still failed after every retry attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Transport {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status} after {attempts} attempts")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },
}

impl FetchError {
    /// The URL that could not be fetched
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } => url,
        }
    }
}

/// Page-level response shape errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("page {page} has an unexpected shape: {source}")]
    Decode {
        page: u32,
        source: serde_json::Error,
    },

    #[error("page {page} is missing {field}")]
    MissingField { page: u32, field: &'static str },
}

/// Item detail retrieval errors
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("failed to fetch item detail: {0}")]
    Fetch(#[from] FetchError),

    #[error("item detail for {url} is not valid JSON: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("no item id in url: {0}")]
    MissingId(String),
}

/// Catalog locator errors
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("invalid category url '{locator}': {reason}")]
    Invalid { locator: String, reason: String },
}

/// Export sink errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("export rejected by {target}: {message}")]
    Rejected { target: String, message: String },

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("export request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_stream, Coordinator, CrawlOutcome, Fetcher};
pub use events::{CrawlEvent, EventSink, SyncEvent};
pub use state::CrawlState;
