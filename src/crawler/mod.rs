//! Crawler module for the attribute crawl
//!
//! This module contains the core crawling logic:
//! - HTTP fetching with bounded retry
//! - Listing page extraction
//! - Item detail enrichment
//! - Overall crawl coordination and event emission

mod coordinator;
mod enricher;
mod extractor;
mod fetcher;

pub use coordinator::{crawl_stream, Coordinator, CrawlOutcome};
pub use enricher::{enrich_item, parse_item_detail};
pub use extractor::{extract_page, extract_stub, ItemStub, Page};
pub use fetcher::{build_http_client, Fetcher, RawResponse, RetryPolicy};

use crate::config::Config;
use crate::events::{CrawlEvent, EventSink};

/// Runs a complete crawl into the given sink
///
/// This is the main entry point for a one-off crawl. It builds a fetcher from the
/// configuration, then drives the crawl until `DONE`, `ERROR`, or disconnection.
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - How the crawl ended
/// * `Err(reqwest::Error)` - The HTTP client could not be built
pub async fn crawl<S: EventSink<CrawlEvent>>(
    config: &Config,
    locator: &str,
    sink: S,
) -> Result<CrawlOutcome, reqwest::Error> {
    let fetcher = Fetcher::from_config(&config.fetcher, &config.user_agent)?;
    let mut coordinator = Coordinator::new(fetcher, config.catalog.clone(), sink);
    Ok(coordinator.run(locator).await)
}
