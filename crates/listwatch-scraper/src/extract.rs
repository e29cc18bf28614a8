//! HTML extraction for search grids and listing detail pages.
//!
//! Parsing is synchronous: `scraper::Html` is not `Send`, so callers parse,
//! extract and drop the document before their next `.await`.

use chrono::NaiveDate;
use listwatch_core::{Listing, ListingFields, Provenance, SeedTag, Selectors};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::client::resolve_listing_url;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// None of the listing fields were present, so the page is not a listing.
    #[error("no listing fields found on {url}")]
    NotADetailPage { url: String },
}

/// Everything about a listing that does not come from its detail page.
#[derive(Debug, Clone)]
pub struct ListingContext {
    pub provenance: Provenance,
    pub tag: SeedTag,
    pub created_at: NaiveDate,
    pub url: String,
}

fn parse_selector(raw: &str) -> Result<Selector, ExtractError> {
    Selector::parse(raw).map_err(|e| ExtractError::InvalidSelector {
        selector: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-blank text node that is a direct child of any match.
///
/// Direct children only: the price paragraph nests the struck-out original
/// price in a child element, which must not win over the sale price.
fn first_own_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .flat_map(|el| el.children().filter_map(|n| n.value().as_text()))
        .map(|t| t.trim())
        .find(|t| !t.is_empty())
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// All descendant text of the first match that has any, whitespace-collapsed.
fn all_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

fn first_attr(document: &Html, selector: &Selector, attr: &str) -> String {
    document
        .select(selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Reads title, description, price and picture from a detail page.
///
/// Missing elements yield empty strings; only a malformed selector is an error.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] if any configured selector does
/// not parse.
pub fn extract_fields(html: &str, selectors: &Selectors) -> Result<ListingFields, ExtractError> {
    let title = parse_selector(&selectors.title)?;
    let description = parse_selector(&selectors.description)?;
    let price = parse_selector(&selectors.price)?;
    let pic = parse_selector(&selectors.pic)?;

    let document = Html::parse_document(html);
    Ok(ListingFields {
        title: first_own_text(&document, &title),
        description: all_text(&document, &description),
        price: first_own_text(&document, &price),
        pic: first_attr(&document, &pic, "src"),
    })
}

/// Builds a [`Listing`] from a detail page and its discovery context.
///
/// # Errors
///
/// - [`ExtractError::InvalidSelector`] for a malformed selector.
/// - [`ExtractError::NotADetailPage`] when every field came back empty.
pub fn extract_listing(
    html: &str,
    context: &ListingContext,
    selectors: &Selectors,
) -> Result<Listing, ExtractError> {
    let fields = extract_fields(html, selectors)?;
    if fields.is_blank() {
        return Err(ExtractError::NotADetailPage {
            url: context.url.clone(),
        });
    }
    Ok(Listing::assemble(
        &context.provenance,
        &context.tag,
        context.created_at,
        context.url.clone(),
        fields,
    ))
}

/// Seller (closet) name shown on a detail page, if any.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] if the seller selector does not parse.
pub fn extract_seller_name(html: &str, selectors: &Selectors) -> Result<Option<String>, ExtractError> {
    let selector = parse_selector(&selectors.seller_name)?;
    let document = Html::parse_document(html);
    let name = all_text(&document, &selector);
    Ok((!name.is_empty()).then_some(name))
}

/// Absolute detail-page URLs for every card on a rendered search page, in
/// page order with duplicates removed.
///
/// Cards without a usable link are skipped.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] if the card or link selector
/// does not parse.
pub fn listing_links(
    html: &str,
    selectors: &Selectors,
    base_url: &str,
) -> Result<Vec<String>, ExtractError> {
    let card = parse_selector(&selectors.card)?;
    let link = parse_selector(&selectors.card_link)?;
    let document = Html::parse_document(html);

    let mut links: Vec<String> = Vec::new();
    for card in document.select(&card) {
        let Some(href) = first_href(card, &link) else {
            tracing::debug!("listing card without link");
            continue;
        };
        match resolve_listing_url(base_url, href) {
            Ok(url) if !links.contains(&url) => links.push(url),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, href, "skipping unresolvable listing link"),
        }
    }
    Ok(links)
}

fn first_href<'a>(card: ElementRef<'a>, link: &Selector) -> Option<&'a str> {
    card.select(link)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|h| !h.is_empty())
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
