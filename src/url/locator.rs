//! Category locator parsing
//!
//! A locator is an absolute http(s) URL whose last non-empty path segment has the
//! form `<prefix>-<identifier>`. The identifier is everything after the first `-`:
//!
//! | Locator | Category |
//! |---------|----------|
//! | `https://www.digikala.com/search/category-mobile-phone/` | `mobile-phone` |
//! | `https://www.digikala.com/search/cat-12345/` | `12345` |
//! | `https://www.digikala.com/search/cat-12345?sort=4` | `12345` |

use crate::LocatorError;
use url::Url;

/// Immutable input of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Category identifier expected by the listing endpoint
    pub category: String,

    /// First page to fetch
    pub start_page: u32,
}

/// Parses a category locator into a crawl request
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::parse_locator;
///
/// let request = parse_locator("https://www.digikala.com/search/cat-12345/").unwrap();
/// assert_eq!(request.category, "12345");
/// assert_eq!(request.start_page, 1);
/// ```
pub fn parse_locator(locator: &str) -> Result<CrawlRequest, LocatorError> {
    let invalid = |reason: &str| LocatorError::Invalid {
        locator: locator.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(locator.trim()).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| invalid("url has no path"))?;

    let (prefix, category) = segment
        .split_once('-')
        .ok_or_else(|| invalid("last path segment must look like '<prefix>-<category>'"))?;

    if prefix.is_empty() || category.is_empty() {
        return Err(invalid("last path segment must look like '<prefix>-<category>'"));
    }

    if !category
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("category contains invalid characters"));
    }

    Ok(CrawlRequest {
        category: category.to_string(),
        start_page: 1,
    })
}
