use crate::config::types::{
    CatalogConfig, Config, ExportConfig, ExportKind, FetcherConfig, InventoryConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_catalog_config(&config.catalog)?;
    validate_inventory_config(&config.inventory)?;
    validate_export_config(&config.export)?;
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "fetcher.retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetcher.timeout-ms must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_template("catalog.listing-url", &config.listing_url, &["{category}", "{page}"])?;
    validate_template("catalog.detail-url", &config.detail_url, &["{id}"])?;
    validate_template("catalog.item-url", &config.item_url, &["{id}"])?;
    Ok(())
}

fn validate_inventory_config(config: &InventoryConfig) -> Result<(), ConfigError> {
    validate_template("inventory.listing-url", &config.listing_url, &["{page}"])?;

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "inventory.retries must be >= 1, got {}",
            config.retries
        )));
    }

    Ok(())
}

fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "export.retries must be >= 1, got {}",
            config.retries
        )));
    }

    match config.kind {
        ExportKind::File => {
            if config.path.is_empty() {
                return Err(ConfigError::Validation(
                    "export.path cannot be empty".to_string(),
                ));
            }
        }
        ExportKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                ConfigError::Validation("export.endpoint is required for kind = \"http\"".to_string())
            })?;
            Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid export.endpoint '{}': {}", endpoint, e))
            })?;
            if let Some(sheet_url) = config.sheet_url.as_deref() {
                Url::parse(sheet_url).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid export.sheet-url '{}': {}", sheet_url, e))
                })?;
            }
        }
    }

    Ok(())
}

/// Checks that a URL template carries its placeholders and parses once filled in
fn validate_template(name: &str, template: &str, placeholders: &[&str]) -> Result<(), ConfigError> {
    let mut filled = template.to_string();
    for placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "{} must contain {}, got '{}'",
                name, placeholder, template
            )));
        }
        filled = filled.replace(placeholder, "1");
    }

    let url = Url::parse(&filled)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, template, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, template
        )));
    }

    Ok(())
}
