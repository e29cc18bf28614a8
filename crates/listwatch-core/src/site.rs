//! Static description of the crawled marketplace: where it lives, how its
//! pages are shaped, and how its listings are attributed.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::listing::Provenance;

/// Substitutes the percent-encoded, trimmed `keyword` for `{0}` in `template`.
#[must_use]
pub fn fill_search_template(template: &str, keyword: &str) -> String {
    let encoded = utf8_percent_encode(keyword.trim(), NON_ALPHANUMERIC).to_string();
    template.replace("{0}", &encoded)
}

/// CSS selectors for the search grid and the listing detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    /// One element per listing card in the search result grid.
    pub card: String,
    /// Anchor inside a card that links to the detail page.
    pub card_link: String,
    pub title: String,
    pub description: String,
    pub price: String,
    /// Image element whose `src` is the listing picture.
    pub pic: String,
    /// Closet/seller name on the detail page.
    pub seller_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    /// Name the export sink files results under.
    pub spider_name: String,
    pub base_url: String,
    pub domain: String,
    /// Marketplace attributed as the seller of every listing.
    pub seller: String,
    pub currency: String,
    /// Search page template; `{0}` is replaced by the encoded keyword.
    pub search_template: String,
    /// CSV exports are named `<file_prefix>_<YYYYMMDD_HHMMSS>.csv`.
    pub file_prefix: String,
    pub selectors: Selectors,
}

impl SiteProfile {
    #[must_use]
    pub fn poshmark_us() -> Self {
        Self {
            spider_name: "PoshmarkUSSpider".to_owned(),
            base_url: "https://poshmark.com".to_owned(),
            domain: "poshmark.com".to_owned(),
            seller: "poshmark".to_owned(),
            currency: "USD".to_owned(),
            search_template: "https://poshmark.com/search?query={0}&type=listings&src=dir"
                .to_owned(),
            file_prefix: "poshmark_products".to_owned(),
            selectors: Selectors {
                card: ".grid-page .item__details".to_owned(),
                card_link: "a".to_owned(),
                title: ".listing__title h1".to_owned(),
                description: ".listing__description".to_owned(),
                price: ".listing__ipad-centered p".to_owned(),
                pic: ".carousel__inner img".to_owned(),
                seller_name: ".listing__closet-name, a.listing__closet-link".to_owned(),
            },
        }
    }

    /// Points the profile at another origin, keeping selectors. Used for
    /// mirrors and local test servers.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        self.search_template = self
            .search_template
            .replacen(&self.base_url, base_url, 1);
        base_url.clone_into(&mut self.base_url);
        self
    }

    /// Search page URL for `keyword`.
    #[must_use]
    pub fn search_url(&self, keyword: &str) -> String {
        fill_search_template(&self.search_template, keyword)
    }

    #[must_use]
    pub fn provenance(&self, region: &str, country: &str) -> Provenance {
        Provenance {
            seller: self.seller.clone(),
            region: region.to_owned(),
            country: country.to_owned(),
            domain: self.domain.clone(),
            currency: self.currency.clone(),
        }
    }
}
