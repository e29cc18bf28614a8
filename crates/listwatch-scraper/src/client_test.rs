use super::*;

#[test]
fn resolve_listing_url_joins_relative_path() {
    assert_eq!(
        resolve_listing_url("https://poshmark.com", "/listing/Red-Dress-64a1").unwrap(),
        "https://poshmark.com/listing/Red-Dress-64a1"
    );
}

#[test]
fn resolve_listing_url_keeps_absolute_links() {
    assert_eq!(
        resolve_listing_url("https://poshmark.com", "https://poshmark.ca/listing/x").unwrap(),
        "https://poshmark.ca/listing/x"
    );
}

#[test]
fn resolve_listing_url_trims_whitespace() {
    assert_eq!(
        resolve_listing_url("https://poshmark.com", "  /listing/y \n").unwrap(),
        "https://poshmark.com/listing/y"
    );
}

#[test]
fn resolve_listing_url_handles_path_relative_links() {
    assert_eq!(
        resolve_listing_url("https://poshmark.com/search/", "listing/z").unwrap(),
        "https://poshmark.com/search/listing/z"
    );
}

#[test]
fn resolve_listing_url_rejects_invalid_base() {
    let err = resolve_listing_url("not a url", "/listing/y").unwrap_err();
    assert!(
        matches!(err, ScraperError::InvalidUrl { .. }),
        "expected InvalidUrl, got: {err:?}"
    );
}

#[test]
fn extract_domain_strips_scheme_and_path() {
    assert_eq!(extract_domain("https://poshmark.com/listing/a"), "poshmark.com");
    assert_eq!(extract_domain("http://127.0.0.1:8080/x"), "127.0.0.1");
}

#[test]
fn extract_domain_fallback_no_scheme() {
    assert_eq!(extract_domain("poshmark.com"), "poshmark.com");
}

#[test]
fn fetched_page_success_is_2xx_only() {
    let page = |status| FetchedPage {
        url: "u".to_owned(),
        status,
        body: String::new(),
    };
    assert!(page(200).is_success());
    assert!(page(204).is_success());
    assert!(!page(301).is_success());
    assert!(!page(404).is_success());
}
