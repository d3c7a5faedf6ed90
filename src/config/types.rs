use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Catalog-Harvest
///
/// Every section has defaults matching the upstream services, so an empty file
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub catalog: CatalogConfig,
    pub inventory: InventoryConfig,
    pub export: ExportConfig,
}

/// Retry behavior of the shared fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Total attempts per request, including the first one
    pub retries: u32,

    /// Fixed wait between attempts (milliseconds)
    #[serde(rename = "retry-wait-ms")]
    pub retry_wait_ms: u64,

    /// Per-attempt timeout (milliseconds), connecting included
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl FetcherConfig {
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_wait_ms: 5_000,
            timeout_ms: 10_000,
        }
    }
}

/// User agent sent with every request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                    (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Endpoints of the attribute catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Listing endpoint, with `{category}` and `{page}` placeholders
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Item detail endpoint, with an `{id}` placeholder
    #[serde(rename = "detail-url")]
    pub detail_url: String,

    /// Canonical public item page, with an `{id}` placeholder
    #[serde(rename = "item-url")]
    pub item_url: String,

    /// Pause before each item detail request (milliseconds)
    #[serde(rename = "item-delay-ms")]
    pub item_delay_ms: u64,
}

impl CatalogConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://api.digikala.com/v1/categories/{category}/search/?page={page}"
                .to_string(),
            detail_url: "https://api.digikala.com/v2/product/{id}/".to_string(),
            item_url: "https://www.digikala.com/product/dkp-{id}/".to_string(),
            item_delay_ms: 500,
        }
    }
}

/// Store inventory listing used by the sync pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Listing endpoint, with a `{page}` placeholder
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Attempts per page request
    pub retries: u32,

    /// Wait between page attempts (milliseconds)
    #[serde(rename = "retry-wait-ms")]
    pub retry_wait_ms: u64,

    /// Pause between consecutive pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,
}

impl InventoryConfig {
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://mvm5052.com/wp-json/wc/store/v1/products?per_page=100&page={page}"
                .to_string(),
            retries: 3,
            retry_wait_ms: 100,
            page_delay_ms: 200,
        }
    }
}

/// Where synced inventory is exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Overwrite a local JSON file
    File,
    /// PUT the table to a remote endpoint
    Http,
}

/// Export sink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub kind: ExportKind,

    /// Target file for `kind = "file"`
    pub path: String,

    /// Upload endpoint for `kind = "http"`
    pub endpoint: Option<String>,

    /// Public URL reported after a successful HTTP upload
    #[serde(rename = "sheet-url")]
    pub sheet_url: Option<String>,

    /// Upload attempts before giving up
    pub retries: u32,

    /// Wait between upload attempts (milliseconds)
    #[serde(rename = "retry-wait-ms")]
    pub retry_wait_ms: u64,
}

impl ExportConfig {
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            kind: ExportKind::File,
            path: "./inventory.json".to_string(),
            endpoint: None,
            sheet_url: None,
            retries: 3,
            retry_wait_ms: 5_000,
        }
    }
}
