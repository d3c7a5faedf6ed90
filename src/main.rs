//! Catalog-Harvest main entry point
//!
//! Runs one pipeline and writes its event stream to stdout as `data: <json>` frames.
//! Logs go to stderr so stdout can be piped straight to a display client.

use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::crawler::{Coordinator, CrawlOutcome, Fetcher};
use catalog_harvest::events::FrameWriter;
use catalog_harvest::sync::{build_export_sink, SyncOutcome, Syncer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: catalog attribute crawler and inventory syncer
///
/// Each run streams progress events to stdout, one `data: <json>` frame per event,
/// ending with a DONE or ERROR event.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Catalog attribute crawler and inventory syncer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a catalog category and stream every item's attributes
    Scrape {
        /// Category page URL, e.g. https://www.digikala.com/search/category-mobile-phone/
        #[arg(value_name = "CATEGORY_URL")]
        locator: String,
    },

    /// Fetch the store inventory and export it
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given; using defaults");
            Config::default()
        }
    };

    let fetcher = Fetcher::from_config(&config.fetcher, &config.user_agent)?;

    match cli.command {
        Command::Scrape { locator } => handle_scrape(fetcher, &config, &locator).await,
        Command::Sync => handle_sync(fetcher, &config).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the scrape command: one attribute crawl
async fn handle_scrape(
    fetcher: Fetcher,
    config: &Config,
    locator: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = FrameWriter::new(tokio::io::stdout());
    let mut coordinator = Coordinator::new(fetcher, config.catalog.clone(), sink);

    match coordinator.run(locator).await {
        CrawlOutcome::Completed { pages, items } => {
            tracing::info!("Scraped {} items from {} pages", items, pages);
            Ok(())
        }
        CrawlOutcome::Failed { message } => Err(message.into()),
        CrawlOutcome::Disconnected => {
            tracing::warn!("Output closed before the crawl finished");
            Ok(())
        }
    }
}

/// Handles the sync command: one inventory export
async fn handle_sync(fetcher: Fetcher, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let export = Arc::from(build_export_sink(&config.export, fetcher.client()));
    let sink = FrameWriter::new(tokio::io::stdout());
    let mut syncer = Syncer::new(&fetcher, config, export, sink);

    match syncer.run().await {
        SyncOutcome::Completed { rows, location } => {
            tracing::info!("Exported {} rows to {}", rows, location);
            Ok(())
        }
        SyncOutcome::Failed { message } => Err(message.into()),
        SyncOutcome::Disconnected => {
            tracing::warn!("Output closed before the sync finished");
            Ok(())
        }
    }
}
