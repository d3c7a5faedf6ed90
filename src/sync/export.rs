//! Export sinks for synced inventory
//!
//! An export sink replaces the whole contents of a named table with the given
//! rows and reports where the table can be viewed. Retrying is the caller's job.

use crate::config::{ExportConfig, ExportKind};
use crate::sync::inventory::InventoryRow;
use crate::UploadError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use url::Url;

/// Destination of a synced table
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Overwrites the target with `rows`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - URL where the exported table can be viewed
    /// * `Err(UploadError)` - The target rejected or could not receive the data
    async fn update(&self, rows: &[InventoryRow]) -> Result<String, UploadError>;
}

/// Overwrites a local JSON file
#[derive(Debug, Clone)]
pub struct FileExport {
    path: PathBuf,
}

impl FileExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        let absolute = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|_| absolute.display().to_string())
    }
}

#[async_trait]
impl ExportSink for FileExport {
    async fn update(&self, rows: &[InventoryRow]) -> Result<String, UploadError> {
        if rows.is_empty() {
            tracing::warn!("No rows to export; leaving {} untouched", self.path.display());
            return Ok(self.location());
        }

        let json = serde_json::to_vec_pretty(rows)?;
        tokio::fs::write(&self.path, json).await?;

        tracing::info!("Exported {} rows to {}", rows.len(), self.path.display());
        Ok(self.location())
    }
}

/// PUTs the table as JSON to a remote sheet service
#[derive(Debug, Clone)]
pub struct HttpExport {
    client: Client,
    endpoint: String,
    sheet_url: String,
}

impl HttpExport {
    /// # Arguments
    ///
    /// * `client` - HTTP client (typically the crawl client)
    /// * `endpoint` - Upload endpoint that replaces the sheet contents
    /// * `sheet_url` - Public URL reported after upload; defaults to `endpoint`
    pub fn new(client: Client, endpoint: impl Into<String>, sheet_url: Option<String>) -> Self {
        let endpoint = endpoint.into();
        let sheet_url = sheet_url.unwrap_or_else(|| endpoint.clone());
        Self {
            client,
            endpoint,
            sheet_url,
        }
    }
}

#[async_trait]
impl ExportSink for HttpExport {
    async fn update(&self, rows: &[InventoryRow]) -> Result<String, UploadError> {
        if rows.is_empty() {
            tracing::warn!("No rows to export; leaving {} untouched", self.endpoint);
            return Ok(self.sheet_url.clone());
        }

        let response = self.client.put(&self.endpoint).json(rows).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                target: self.endpoint.clone(),
                message: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        tracing::info!("Uploaded {} rows to {}", rows.len(), self.endpoint);
        Ok(self.sheet_url.clone())
    }
}

/// Builds the configured export sink
pub fn build_export_sink(config: &ExportConfig, client: &Client) -> Box<dyn ExportSink> {
    match (config.kind, config.endpoint.as_deref()) {
        (ExportKind::Http, Some(endpoint)) => Box::new(HttpExport::new(
            client.clone(),
            endpoint,
            config.sheet_url.clone(),
        )),
        (ExportKind::Http, None) => {
            tracing::warn!("export.endpoint missing; exporting to {} instead", config.path);
            Box::new(FileExport::new(&config.path))
        }
        (ExportKind::File, _) => Box::new(FileExport::new(&config.path)),
    }
}
