//! Item detail enrichment
//!
//! Only a failed fetch (or a body that is not JSON at all) is an error. Every
//! other irregularity in the detail payload degrades: no title becomes `None`, no
//! specifications section becomes an empty attribute list.

use crate::crawler::fetcher::Fetcher;
use crate::events::{Attribute, ItemRecord};
use crate::url::{item_id_from_url, render_template};
use crate::EnrichError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct RawAttribute {
    title: String,
    #[serde(default)]
    values: Option<Vec<Value>>,
}

/// Fetches and normalizes the detail record of one item
///
/// # Arguments
///
/// * `fetcher` - Shared fetcher (retries apply)
/// * `detail_url_template` - Detail endpoint template with an `{id}` placeholder
/// * `item_url` - Canonical item page URL; its trailing segment carries the id
pub async fn enrich_item(
    fetcher: &Fetcher,
    detail_url_template: &str,
    item_url: &str,
) -> Result<ItemRecord, EnrichError> {
    let id =
        item_id_from_url(item_url).ok_or_else(|| EnrichError::MissingId(item_url.to_string()))?;
    let detail_url = render_template(detail_url_template, &[("id", id.as_str())]);

    let response = fetcher.fetch(&detail_url).await?;
    let record = parse_item_detail(&response.body, item_url)?;

    tracing::debug!(
        "Enriched {} ({} attributes)",
        item_url,
        record.attributes.len()
    );
    Ok(record)
}

/// Maps a detail payload into an `ItemRecord`
pub fn parse_item_detail(body: &str, item_url: &str) -> Result<ItemRecord, EnrichError> {
    let payload: Value = serde_json::from_str(body).map_err(|source| EnrichError::Json {
        url: item_url.to_string(),
        source,
    })?;

    let product = payload.pointer("/data/product");

    let title = product
        .and_then(|p| p.get("title_fa"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let attributes = product
        .and_then(|p| p.pointer("/specifications/0/attributes"))
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(decode_attribute).collect())
        .unwrap_or_default();

    Ok(ItemRecord {
        title,
        attributes,
        url: item_url.to_string(),
    })
}

fn decode_attribute(raw: &Value) -> Option<Attribute> {
    let attribute = RawAttribute::deserialize(raw).ok()?;
    let values = attribute
        .values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect();

    Some(Attribute {
        name: attribute.title,
        values,
    })
}
