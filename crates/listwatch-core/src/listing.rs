//! Listing records and the references the auxiliary rechecks work from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Site-level attribution stamped onto every listing. None of these fields
/// depend on the detail page, so they are present even when every scraped
/// field comes back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub seller: String,
    pub region: String,
    pub country: String,
    pub domain: String,
    pub currency: String,
}

/// The search term and advertiser a listing was discovered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTag {
    pub keyword: String,
    pub company_id: i64,
}

/// The four fields scraped from a detail page. Missing elements are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFields {
    pub title: String,
    pub description: String,
    pub price: String,
    pub pic: String,
}

impl ListingFields {
    /// `true` when nothing at all was found on the page.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.price.is_empty()
            && self.pic.is_empty()
    }
}

/// One product listing as exported. Field order is the CSV column order.
///
/// `url` is the identity key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub seller: String,
    pub region: String,
    pub country: String,
    pub domain: String,
    pub currency: String,
    pub keyword: String,
    pub company_id: i64,
    #[serde(with = "crawl_date")]
    pub created_at: NaiveDate,
    pub url: String,
    pub title: String,
    pub description: String,
    /// Raw price text as displayed, currency symbol included.
    pub price: String,
    pub pic: String,
    pub shipping_address: String,
}

impl Listing {
    #[must_use]
    pub fn assemble(
        provenance: &Provenance,
        tag: &SeedTag,
        created_at: NaiveDate,
        url: String,
        fields: ListingFields,
    ) -> Self {
        Self {
            seller: provenance.seller.clone(),
            region: provenance.region.clone(),
            country: provenance.country.clone(),
            domain: provenance.domain.clone(),
            currency: provenance.currency.clone(),
            keyword: tag.keyword.clone(),
            company_id: tag.company_id,
            created_at,
            url,
            title: fields.title,
            description: fields.description,
            price: fields.price,
            pic: fields.pic,
            shipping_address: String::new(),
        }
    }
}

/// A listing previously recorded as taken down, queued for a liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenDownRef {
    pub advert_id: i64,
    pub product: String,
    pub url: String,
}

/// A listing whose seller attribution was missing and has now been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSellerRef {
    pub url: String,
    pub seller: String,
}

/// `DD-MM-YYYY` serialization for crawl dates.
pub mod crawl_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d-%m-%Y";

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    /// # Errors
    ///
    /// Fails when the value is not a `DD-MM-YYYY` date.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            seller: "poshmark".to_owned(),
            region: "NA".to_owned(),
            country: "United States".to_owned(),
            domain: "poshmark.com".to_owned(),
            currency: "USD".to_owned(),
        }
    }

    #[test]
    fn assemble_keeps_provenance_when_fields_are_blank() {
        let tag = SeedTag {
            keyword: "dress".to_owned(),
            company_id: 7,
        };
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let listing = Listing::assemble(
            &provenance(),
            &tag,
            date,
            "https://poshmark.com/listing/abc".to_owned(),
            ListingFields::default(),
        );

        assert_eq!(listing.seller, "poshmark");
        assert_eq!(listing.currency, "USD");
        assert_eq!(listing.keyword, "dress");
        assert_eq!(listing.company_id, 7);
        assert_eq!(listing.title, "");
        assert_eq!(listing.shipping_address, "");
    }

    #[test]
    fn created_at_serializes_day_first() {
        let listing = Listing::assemble(
            &provenance(),
            &SeedTag {
                keyword: "k".to_owned(),
                company_id: 1,
            },
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            "u".to_owned(),
            ListingFields::default(),
        );
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["created_at"], "09-03-2025");

        let back: Listing = serde_json::from_value(value).unwrap();
        assert_eq!(back.created_at, listing.created_at);
    }

    #[test]
    fn created_at_rejects_iso_dates() {
        let mut value = serde_json::to_value(Listing::assemble(
            &provenance(),
            &SeedTag {
                keyword: "k".to_owned(),
                company_id: 1,
            },
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            "u".to_owned(),
            ListingFields::default(),
        ))
        .unwrap();
        value["created_at"] = "2025-03-09".into();
        assert!(serde_json::from_value::<Listing>(value).is_err());
    }

    #[test]
    fn blank_fields_detection() {
        assert!(ListingFields::default().is_blank());
        let fields = ListingFields {
            price: "$12".to_owned(),
            ..ListingFields::default()
        };
        assert!(!fields.is_blank());
    }
}
