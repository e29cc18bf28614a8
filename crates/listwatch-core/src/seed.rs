use std::collections::BTreeSet;

use crate::listing::SeedTag;

/// One unit of crawl work: a search keyword, its result page, and where it
/// applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub keyword: String,
    pub target_url: String,
    pub company_id: i64,
    pub regions: BTreeSet<String>,
    pub countries: BTreeSet<String>,
}

impl Seed {
    /// Whether this seed should be crawled from the given region/country.
    ///
    /// A seed with no regions and no countries is global. Otherwise it
    /// applies when either set names the active value.
    #[must_use]
    pub fn applies_to(&self, region: &str, country: &str) -> bool {
        let global = self.regions.is_empty() && self.countries.is_empty();
        global || self.regions.contains(region) || self.countries.contains(country)
    }

    #[must_use]
    pub fn tag(&self) -> SeedTag {
        SeedTag {
            keyword: self.keyword.clone(),
            company_id: self.company_id,
        }
    }
}

/// Splits a stored `"NA, EU"` style list into a set, dropping blanks.
#[must_use]
pub fn parse_code_list(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
