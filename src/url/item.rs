//! Item identifier derivation

/// Fills `{name}` placeholders in an endpoint template
///
/// ```
/// use catalog_harvest::url::render_template;
///
/// let url = render_template("https://api.example.com/c/{category}/?page={page}", &[
///     ("category", "12345"),
///     ("page", "2"),
/// ]);
/// assert_eq!(url, "https://api.example.com/c/12345/?page=2");
/// ```
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

/// Extracts the numeric item id from a catalog stub's relative URI
///
/// The URI must look like `/product/<prefix>-<digits>/...`; anything else
/// yields `None`.
pub fn item_id_from_uri(uri: &str) -> Option<String> {
    let mut segments = uri.split('/').filter(|s| !s.is_empty());

    if segments.next()? != "product" {
        return None;
    }

    let (_, id) = segments.next()?.split_once('-')?;
    is_numeric_id(id).then(|| id.to_string())
}

/// Extracts the numeric item id from the trailing segment of an item page URL
///
/// `https://www.digikala.com/product/dkp-12345/` yields `12345`.
pub fn item_id_from_url(url: &str) -> Option<String> {
    let segment = url.trim_end_matches('/').rsplit('/').next()?;
    let id = segment.rsplit('-').next()?;
    is_numeric_id(id).then(|| id.to_string())
}

/// Builds the canonical public item URL from its id
pub fn canonical_item_url(template: &str, id: &str) -> String {
    render_template(template, &[("id", id)])
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}
