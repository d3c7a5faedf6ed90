//! Crawl coordinator - attribute crawl orchestration
//!
//! The coordinator drives one crawl from the first listing page to the last:
//! - Validates the locator and derives the category
//! - Fetches listing pages one at a time, re-reading the page total each time
//! - Deduplicates items across pages
//! - Enriches each new item in listing order
//! - Emits an event for every step, ending with exactly one `DONE` or `ERROR`
//!
//! Nothing runs concurrently within a crawl. Any enrichment failure aborts the
//! whole crawl. Before every network call the sink is checked, and the crawl stops
//! silently once the consumer is gone.

use crate::config::CatalogConfig;
use crate::crawler::enricher::enrich_item;
use crate::crawler::extractor::extract_page;
use crate::crawler::fetcher::Fetcher;
use crate::events::{ChannelSink, CrawlEvent, EventSink};
use crate::state::{CrawlState, Termination, TransitionError};
use crate::url::{parse_locator, render_template, CrawlRequest};
use futures::Stream;
use std::collections::HashSet;

/// Buffered events between a spawned crawl and its consumer
const EVENT_BUFFER: usize = 64;

/// How a crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// `DONE` was emitted
    Completed { pages: u32, items: usize },

    /// `ERROR` was emitted with this message
    Failed { message: String },

    /// The consumer went away before the crawl finished
    Disconnected,
}

/// Reasons the crawl loop stops early
enum Halt {
    Failed(String),
    Disconnected,
}

impl From<TransitionError> for Halt {
    fn from(e: TransitionError) -> Self {
        Halt::Failed(e.to_string())
    }
}

/// Drives one crawl and owns its seen-set and event stream
pub struct Coordinator<S> {
    fetcher: Fetcher,
    catalog: CatalogConfig,
    sink: S,
    seen: HashSet<String>,
    state: CrawlState,
    pages: u32,
}

impl<S: EventSink<CrawlEvent>> Coordinator<S> {
    /// Creates a coordinator for a single crawl
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher; its client may serve other crawls too
    /// * `catalog` - Catalog endpoint templates and item delay
    /// * `sink` - Where events go
    pub fn new(fetcher: Fetcher, catalog: CatalogConfig, sink: S) -> Self {
        Self {
            fetcher,
            catalog,
            sink,
            seen: HashSet::new(),
            state: CrawlState::Init,
            pages: 0,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Runs the crawl to completion
    ///
    /// The returned outcome mirrors the terminal event: `Completed` after `DONE`,
    /// `Failed` after `ERROR`, `Disconnected` when no terminal event could be
    /// delivered.
    pub async fn run(&mut self, locator: &str) -> CrawlOutcome {
        if self.state.is_terminal() {
            tracing::warn!("Coordinator already finished ({}); not crawling again", self.state);
            return CrawlOutcome::Failed {
                message: "crawl already finished".to_string(),
            };
        }

        let result = match parse_locator(locator) {
            Ok(request) => self.crawl(&request).await,
            Err(e) => Err(Halt::Failed(e.to_string())),
        };

        match result {
            Ok(()) => {
                let items = self.seen.len();
                tracing::info!(
                    "Crawl completed: {} pages, {} unique items",
                    self.pages,
                    items
                );
                match self.finish(Termination::Done, CrawlEvent::Done).await {
                    Ok(()) => CrawlOutcome::Completed {
                        pages: self.pages,
                        items,
                    },
                    Err(halt) => self.halted(halt),
                }
            }
            Err(Halt::Failed(message)) => {
                tracing::error!("Crawl failed: {}", message);
                let event = CrawlEvent::Error {
                    msg: message.clone(),
                };
                match self.finish(Termination::Error, event).await {
                    Ok(()) => CrawlOutcome::Failed { message },
                    Err(halt) => self.halted(halt),
                }
            }
            Err(halt) => self.halted(halt),
        }
    }

    /// Returns the sink once the crawl has been run
    pub fn into_sink(self) -> S {
        self.sink
    }

    async fn crawl(&mut self, request: &CrawlRequest) -> Result<(), Halt> {
        tracing::info!("Starting crawl of category {}", request.category);

        let mut page = request.start_page;
        self.advance(CrawlState::Paginating { page })?;

        loop {
            self.ensure_connected()?;

            let page_number = page.to_string();
            let listing_url = render_template(
                &self.catalog.listing_url,
                &[
                    ("category", request.category.as_str()),
                    ("page", page_number.as_str()),
                ],
            );
            let response = self
                .fetcher
                .fetch(&listing_url)
                .await
                .map_err(|e| Halt::Failed(e.to_string()))?;
            let listing = extract_page(&response.body, page, &self.catalog.item_url)
                .map_err(|e| Halt::Failed(e.to_string()))?;

            self.pages = page;
            tracing::info!(
                "Page {} of {}: {} items",
                page,
                listing.total_pages,
                listing.items.len()
            );

            self.emit(CrawlEvent::PageProgress {
                page,
                total_pages: listing.total_pages,
                urls: listing.urls(),
            })
            .await?;

            for item in &listing.items {
                if !self.seen.insert(item.url.clone()) {
                    tracing::debug!("Skipping {} (already seen)", item.url);
                    continue;
                }

                self.advance(CrawlState::Enriching { page })?;

                let delay = self.catalog.item_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.ensure_connected()?;

                let record = enrich_item(&self.fetcher, &self.catalog.detail_url, &item.url)
                    .await
                    .map_err(|e| Halt::Failed(e.to_string()))?;

                self.emit(CrawlEvent::ItemProgress { data: record }).await?;
            }

            if listing.is_last() {
                return Ok(());
            }

            page += 1;
            self.advance(CrawlState::Paginating { page })?;
        }
    }

    fn advance(&mut self, to: CrawlState) -> Result<(), TransitionError> {
        self.state = self.state.transition(to)?;
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), Halt> {
        if self.sink.is_closed() {
            tracing::info!("Event consumer is gone; stopping crawl");
            return Err(Halt::Disconnected);
        }
        Ok(())
    }

    async fn emit(&mut self, event: CrawlEvent) -> Result<(), Halt> {
        if self.state.is_terminal() {
            return Err(Halt::Disconnected);
        }
        self.sink.send(event).await.map_err(|_| Halt::Disconnected)
    }

    async fn finish(&mut self, end: Termination, event: CrawlEvent) -> Result<(), Halt> {
        let sent = self.emit(event).await;
        let end = if sent.is_ok() {
            end
        } else {
            Termination::Disconnected
        };
        self.advance(CrawlState::Terminated(end))?;
        sent
    }

    fn halted(&mut self, halt: Halt) -> CrawlOutcome {
        if !self.state.is_terminal() {
            self.state = CrawlState::Terminated(Termination::Disconnected);
        }
        match halt {
            Halt::Failed(message) => CrawlOutcome::Failed { message },
            Halt::Disconnected => CrawlOutcome::Disconnected,
        }
    }
}

/// Starts a crawl on the runtime and returns its events as a stream
///
/// The stream is lazy on the consumer side, finite, and cannot be restarted.
/// Dropping it tells the crawl to stop before its next request.
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::Config;
/// use catalog_harvest::crawler::{crawl_stream, Fetcher};
/// use catalog_harvest::events::encode_frame;
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let fetcher = Fetcher::from_config(&config.fetcher, &config.user_agent)?;
/// let mut events = crawl_stream(
///     fetcher,
///     config.catalog.clone(),
///     "https://www.digikala.com/search/category-mobile-phone/",
/// );
/// while let Some(event) = events.next().await {
///     print!("{}", encode_frame(&event)?);
/// }
/// # Ok(())
/// # }
/// ```
pub fn crawl_stream(
    fetcher: Fetcher,
    catalog: CatalogConfig,
    locator: impl Into<String>,
) -> impl Stream<Item = CrawlEvent> {
    let (sink, stream) = ChannelSink::channel(EVENT_BUFFER);
    let locator = locator.into();

    tokio::spawn(async move {
        let mut coordinator = Coordinator::new(fetcher, catalog, sink);
        let outcome = coordinator.run(&locator).await;
        tracing::debug!("Crawl task for {} finished: {:?}", locator, outcome);
    });

    stream
}
