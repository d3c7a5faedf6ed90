//! URL handling module for Catalog-Harvest
//!
//! This module turns user-supplied locators into catalog identifiers and derives
//! item identifiers and endpoint URLs from catalog payloads.

mod item;
mod locator;

pub use item::{canonical_item_url, item_id_from_uri, item_id_from_url, render_template};
pub use locator::{parse_locator, CrawlRequest};
