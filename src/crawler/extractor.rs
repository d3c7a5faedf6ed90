//! Catalog listing page extraction
//!
//! A listing page must carry `data.pager.total_pages` and a `data.products` array;
//! without them the page is unusable and extraction fails. Individual product
//! stubs are handled one by one: a stub whose URL cannot be read is dropped and
//! the rest of the page is kept.

use crate::url::{canonical_item_url, item_id_from_uri};
use crate::SchemaError;
use serde::Deserialize;
use serde_json::Value;

/// One item listed on a catalog page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStub {
    /// Numeric item id
    pub id: String,

    /// Canonical item page URL
    pub url: String,
}

/// One listing page, normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub page: u32,

    /// Total page count as reported by this page
    pub total_pages: u32,

    /// Items in listing order
    pub items: Vec<ItemStub>,
}

impl Page {
    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|item| item.url.clone()).collect()
    }

    /// Returns true if no page follows this one
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }
}

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    pager: Option<Pager>,
    products: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Pager {
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProductStub {
    url: StubUrl,
}

#[derive(Debug, Deserialize)]
struct StubUrl {
    uri: String,
}

/// Extracts one listing page
///
/// # Arguments
///
/// * `body` - Raw JSON body of the listing response
/// * `page` - The page number that was requested
/// * `item_url_template` - Canonical item URL template with an `{id}` placeholder
///
/// # Returns
///
/// * `Ok(Page)` - The page, minus any stubs that could not be read
/// * `Err(SchemaError)` - The page-level structure is missing
pub fn extract_page(body: &str, page: u32, item_url_template: &str) -> Result<Page, SchemaError> {
    let envelope: ListingEnvelope =
        serde_json::from_str(body).map_err(|source| SchemaError::Decode { page, source })?;

    let data = envelope
        .data
        .ok_or(SchemaError::MissingField { page, field: "data" })?;

    let total_pages = data
        .pager
        .and_then(|pager| pager.total_pages)
        .ok_or(SchemaError::MissingField {
            page,
            field: "data.pager.total_pages",
        })?;

    let products = data.products.ok_or(SchemaError::MissingField {
        page,
        field: "data.products",
    })?;

    let listed = products.len();
    let items: Vec<ItemStub> = products
        .iter()
        .filter_map(|product| extract_stub(product, item_url_template))
        .collect();

    if items.len() < listed {
        tracing::debug!(
            "Page {}: dropped {} of {} product stubs without a usable url",
            page,
            listed - items.len(),
            listed
        );
    }

    Ok(Page {
        page,
        total_pages,
        items,
    })
}

/// Reads one product stub; `None` means the stub is skipped
pub fn extract_stub(product: &Value, item_url_template: &str) -> Option<ItemStub> {
    let stub = ProductStub::deserialize(product).ok()?;
    let id = item_id_from_uri(&stub.url.uri)?;
    let url = canonical_item_url(item_url_template, &id);
    Some(ItemStub { id, url })
}
