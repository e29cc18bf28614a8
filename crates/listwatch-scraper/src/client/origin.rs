//! URL helpers for listing links and log/error context.

use url::Url;

use crate::error::ScraperError;

/// Resolves a card `href` against the site base URL.
///
/// Absolute `http(s)` links are returned unchanged. Anything else is joined
/// onto `base_url`, so `/listing/abc` becomes `https://poshmark.com/listing/abc`.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] when `base_url` does not parse or the
/// join produces something that is not a URL.
pub fn resolve_listing_url(base_url: &str, href: &str) -> Result<String, ScraperError> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_owned());
    }

    let base = Url::parse(base_url).map_err(|e| ScraperError::InvalidUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            url: href.to_owned(),
            reason: e.to_string(),
        })
}

/// Extracts the hostname from a URL for use in log fields and errors.
///
/// Falls back to the full string if parsing fails.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
