//! Event and record types carried on the wire
//!
//! The `type` discriminator tokens (`PLP_PROGRESS`, `PDP_PROGRESS`, `ERROR`,
//! `DONE`, `STATUS`, `SHEET_URL`) are consumed by existing display clients and must
//! not change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Behavior shared by every event type that can be streamed
pub trait StreamEvent: Serialize + Send + 'static {
    /// Returns true for events that end a stream (`ERROR`, `DONE`)
    fn is_terminal(&self) -> bool;
}

/// One named attribute and its values
///
/// Serialized as a single-entry object, `{"<name>": ["v1", "v2"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, Vec<String>>",
    try_from = "BTreeMap<String, Vec<String>>"
)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

impl From<Attribute> for BTreeMap<String, Vec<String>> {
    fn from(attribute: Attribute) -> Self {
        BTreeMap::from([(attribute.name, attribute.values)])
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for Attribute {
    type Error = String;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!("attribute must have exactly one key, got {}", map.len()));
        }
        let (name, values) = map
            .into_iter()
            .next()
            .ok_or_else(|| "attribute must have exactly one key".to_string())?;
        Ok(Self { name, values })
    }
}

/// Normalized detail record of one catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Display title; `null` when the detail payload has none
    pub title: Option<String>,

    /// Specification attributes in upstream order; empty when the payload has no
    /// specifications section
    pub attributes: Vec<Attribute>,

    /// Canonical item page URL, unique within a crawl
    pub url: String,
}

/// Progress of the attribute crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrawlEvent {
    /// A listing page was fetched
    #[serde(rename = "PLP_PROGRESS")]
    PageProgress {
        page: u32,
        total_pages: u32,
        /// Every item URL listed on the page, in page order
        urls: Vec<String>,
    },

    /// An item's detail record was retrieved
    #[serde(rename = "PDP_PROGRESS")]
    ItemProgress { data: ItemRecord },

    /// The crawl failed; nothing follows
    #[serde(rename = "ERROR")]
    Error { msg: String },

    /// The crawl finished; nothing follows
    #[serde(rename = "DONE")]
    Done,
}

impl CrawlEvent {
    /// Number of items listed on a page event
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Self::PageProgress { urls, .. } => Some(urls.len()),
            _ => None,
        }
    }
}

impl StreamEvent for CrawlEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }
}

/// Progress of the inventory sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Human-readable progress line
    #[serde(rename = "STATUS")]
    Status { msg: String },

    /// The sync failed; nothing follows
    #[serde(rename = "ERROR")]
    Error {
        msg: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// Location of the exported table
    #[serde(rename = "SHEET_URL")]
    SheetUrl { url: String },

    /// The sync finished; nothing follows
    #[serde(rename = "DONE")]
    Done,
}

impl SyncEvent {
    pub fn status(msg: impl Into<String>) -> Self {
        Self::Status { msg: msg.into() }
    }
}

impl StreamEvent for SyncEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }
}
