//! Inventory sync pipeline
//!
//! The second pipeline built on the shared fetcher and event protocol: page
//! through a store's inventory, then export the table with bounded retry.

mod export;
mod inventory;
mod pipeline;

pub use export::{build_export_sink, ExportSink, FileExport, HttpExport};
pub use inventory::{clean_products, parse_inventory_page, InventoryPage, InventoryRow};
pub use pipeline::{sync_stream, SyncOutcome, Syncer};
