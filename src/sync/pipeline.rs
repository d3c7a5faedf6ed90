//! Inventory sync pipeline
//!
//! Fetches every page of the store inventory in order, then pushes the whole table
//! to an export sink. The page count is taken from the first page and held fixed. Progress is reported as `STATUS` events; the stream ends with
//! either `SHEET_URL` + `DONE` or a single `ERROR`.

use crate::config::{Config, InventoryConfig};
use crate::crawler::{Fetcher, RetryPolicy};
use crate::events::{ChannelSink, EventSink, SyncEvent};
use crate::sync::export::ExportSink;
use crate::sync::inventory::{parse_inventory_page, InventoryRow};
use crate::url::render_template;
use futures::Stream;
use std::sync::Arc;
use std::time::Instant;

const EVENT_BUFFER: usize = 64;

/// How a sync ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Rows were exported to `location`
    Completed { rows: usize, location: String },

    /// `ERROR` was emitted with this message
    Failed { message: String },

    /// The consumer went away before the sync finished
    Disconnected,
}

enum Halt {
    Failed { msg: String, detail: Option<String> },
    Disconnected,
}

/// Drives one inventory sync
pub struct Syncer<S> {
    fetcher: Fetcher,
    inventory: InventoryConfig,
    export: Arc<dyn ExportSink>,
    upload_policy: RetryPolicy,
    sink: S,
    finished: bool,
}

impl<S: EventSink<SyncEvent>> Syncer<S> {
    /// Creates a syncer
    ///
    /// The fetcher's client is reused; page requests follow the inventory retry
    /// policy rather than the fetcher's own.
    pub fn new(
        fetcher: &Fetcher,
        config: &Config,
        export: Arc<dyn ExportSink>,
        sink: S,
    ) -> Self {
        let page_policy = RetryPolicy::new(config.inventory.retries, config.inventory.retry_wait());
        Self {
            fetcher: fetcher.with_policy(page_policy),
            inventory: config.inventory.clone(),
            export,
            upload_policy: RetryPolicy::new(config.export.retries, config.export.retry_wait()),
            sink,
            finished: false,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs the sync to completion
    pub async fn run(&mut self) -> SyncOutcome {
        if self.finished {
            return SyncOutcome::Failed {
                message: "sync already finished".to_string(),
            };
        }

        let result = self.sync().await;
        self.finished = true;

        match result {
            Ok((rows, location)) => {
                let delivered = self.send(SyncEvent::SheetUrl {
                    url: location.clone(),
                })
                .await;
                let delivered = match delivered {
                    Ok(()) => self.send(SyncEvent::Done).await,
                    Err(halt) => Err(halt),
                };
                match delivered {
                    Ok(()) => SyncOutcome::Completed { rows, location },
                    Err(_) => SyncOutcome::Disconnected,
                }
            }
            Err(Halt::Failed { msg, detail }) => {
                tracing::error!("Sync failed: {}", msg);
                let event = SyncEvent::Error {
                    msg: msg.clone(),
                    detail,
                };
                match self.send(event).await {
                    Ok(()) => SyncOutcome::Failed { message: msg },
                    Err(_) => SyncOutcome::Disconnected,
                }
            }
            Err(Halt::Disconnected) => SyncOutcome::Disconnected,
        }
    }

    async fn sync(&mut self) -> Result<(usize, String), Halt> {
        self.status("Starting inventory sync").await?;

        let started = Instant::now();
        let rows = self.fetch_all_pages().await?;
        self.status(format!(
            "Fetched {} rows in {:.2} seconds",
            rows.len(),
            started.elapsed().as_secs_f64()
        ))
        .await?;

        let location = self.upload(&rows).await?;
        Ok((rows.len(), location))
    }

    async fn fetch_all_pages(&mut self) -> Result<Vec<InventoryRow>, Halt> {
        let mut rows = Vec::new();
        let mut page = 1;
        let mut total_pages = None;

        loop {
            self.ensure_connected()?;

            let page_number = page.to_string();
            let url = render_template(&self.inventory.listing_url, &[("page", page_number.as_str())]);
            let fetched = match self.fetcher.fetch(&url).await {
                Ok(response) => parse_inventory_page(&response, page).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let fetched = fetched.map_err(|detail| Halt::Failed {
                msg: format!("Failed to fetch inventory page {}", page),
                detail: Some(detail),
            })?;

            rows.extend(fetched.rows);
            // Only the first page's header decides how many pages there are
            let total_pages = *total_pages.get_or_insert(fetched.total_pages.max(1));
            tracing::info!(
                "Inventory page {} of {}: {} rows so far",
                page,
                total_pages,
                rows.len()
            );
            self.status(format!(
                "Page {} of {} fetched ({} products)",
                page,
                total_pages,
                rows.len()
            ))
            .await?;

            if page >= total_pages {
                return Ok(rows);
            }
            page += 1;

            let delay = self.inventory.page_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn upload(&mut self, rows: &[InventoryRow]) -> Result<String, Halt> {
        let attempts = self.upload_policy.attempts;
        let mut errors = Vec::new();

        for attempt in 1..=attempts {
            self.ensure_connected()?;
            self.status(format!(
                "Updating export sheet (attempt {}/{})",
                attempt, attempts
            ))
            .await?;

            match self.export.update(rows).await {
                Ok(location) => return Ok(location),
                Err(e) => {
                    tracing::warn!("Export attempt {}/{} failed: {}", attempt, attempts, e);
                    errors.push(format!("attempt {}: {}", attempt, e));
                }
            }

            if attempt < attempts {
                let wait = self.upload_policy.wait;
                self.status(format!(
                    "Attempt {} failed; retrying in {} seconds",
                    attempt,
                    wait.as_secs_f64()
                ))
                .await?;
                tokio::time::sleep(wait).await;
            }
        }

        Err(Halt::Failed {
            msg: format!("Failed to update export sheet after {} attempts", attempts),
            detail: Some(errors.join("\n")),
        })
    }

    fn ensure_connected(&self) -> Result<(), Halt> {
        if self.sink.is_closed() {
            tracing::info!("Event consumer is gone; stopping sync");
            return Err(Halt::Disconnected);
        }
        Ok(())
    }

    async fn status(&mut self, msg: impl Into<String>) -> Result<(), Halt> {
        self.send(SyncEvent::status(msg)).await
    }

    async fn send(&mut self, event: SyncEvent) -> Result<(), Halt> {
        self.sink.send(event).await.map_err(|_| Halt::Disconnected)
    }
}

/// Starts a sync on the runtime and returns its events as a stream
///
/// Dropping the stream stops the sync before its next request or upload attempt.
pub fn sync_stream(
    fetcher: Fetcher,
    config: Config,
    export: Arc<dyn ExportSink>,
) -> impl Stream<Item = SyncEvent> {
    let (sink, stream) = ChannelSink::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let mut syncer = Syncer::new(&fetcher, &config, export, sink);
        let outcome = syncer.run().await;
        tracing::debug!("Sync task finished: {:?}", outcome);
    });

    stream
}
