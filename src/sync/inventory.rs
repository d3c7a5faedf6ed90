//! Store inventory listing pages
//!
//! The store API returns a bare JSON array of products per page; the page total
//! travels in the `X-WP-TotalPages` response header and the product total in
//! `X-WP-Total`.

use crate::crawler::RawResponse;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";
const TOTAL_PRODUCTS_HEADER: &str = "x-wp-total";

/// One exported inventory row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub in_stock: Option<String>,
    pub price: Option<String>,
    pub regular_price: Option<String>,
    pub sale_price: Option<String>,
    pub currency_symbol: Option<String>,
    pub url: Option<String>,
}

/// One fetched inventory page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_products: Option<u64>,
    pub rows: Vec<InventoryRow>,
}

/// Parses an inventory page response
///
/// A missing or unreadable page-total header counts as a single page. The body
/// must be a JSON array; entries that are not objects are skipped.
pub fn parse_inventory_page(response: &RawResponse, page: u32) -> Result<InventoryPage, SchemaError> {
    let total_pages = response
        .header(TOTAL_PAGES_HEADER)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1);

    let total_products = response
        .header(TOTAL_PRODUCTS_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok());

    let products: Vec<Value> = response
        .json()
        .map_err(|source| SchemaError::Decode { page, source })?;

    Ok(InventoryPage {
        page,
        total_pages,
        total_products,
        rows: clean_products(&products),
    })
}

/// Normalizes raw store products into rows
pub fn clean_products(products: &[Value]) -> Vec<InventoryRow> {
    products.iter().filter_map(clean_product).collect()
}

fn clean_product(product: &Value) -> Option<InventoryRow> {
    if !product.is_object() {
        return None;
    }

    let text = |pointer: &str| product.pointer(pointer).and_then(cell);

    Some(InventoryRow {
        name: text("/name"),
        quantity: text("/add_to_cart/maximum"),
        in_stock: text("/stock_availability/text"),
        price: text("/prices/price"),
        regular_price: text("/prices/regular_price"),
        sale_price: text("/prices/sale_price"),
        currency_symbol: text("/prices/currency_symbol"),
        url: text("/permalink"),
    })
}

/// Renders a scalar JSON value as a table cell
fn cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
