use chrono::{DateTime, NaiveDate, Utc};
use listwatch_core::Listing;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `listings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub url: String,
    pub crawl_date: NaiveDate,
    pub seller: String,
    pub region: String,
    pub country: String,
    pub domain: String,
    pub currency: String,
    pub keyword: String,
    pub company_id: i64,
    pub title: String,
    pub description: String,
    pub price: String,
    pub pic: String,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upserts listings keyed on `(url, crawl_date)`. Reloading the same file
/// updates rows in place. Runs in one transaction.
///
/// Returns the number of listings written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any upsert fails; nothing is written then.
pub async fn upsert_listings(pool: &PgPool, listings: &[Listing]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for listing in listings {
        sqlx::query(
            "INSERT INTO listings \
                 (url, crawl_date, seller, region, country, domain, currency, keyword, \
                  company_id, title, description, price, pic, shipping_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (url, crawl_date) DO UPDATE SET \
                 seller           = EXCLUDED.seller, \
                 region           = EXCLUDED.region, \
                 country          = EXCLUDED.country, \
                 domain           = EXCLUDED.domain, \
                 currency         = EXCLUDED.currency, \
                 keyword          = EXCLUDED.keyword, \
                 company_id       = EXCLUDED.company_id, \
                 title            = EXCLUDED.title, \
                 description      = EXCLUDED.description, \
                 price            = EXCLUDED.price, \
                 pic              = EXCLUDED.pic, \
                 shipping_address = EXCLUDED.shipping_address, \
                 updated_at       = NOW()",
        )
        .bind(&listing.url)
        .bind(listing.created_at)
        .bind(&listing.seller)
        .bind(&listing.region)
        .bind(&listing.country)
        .bind(&listing.domain)
        .bind(&listing.currency)
        .bind(&listing.keyword)
        .bind(listing.company_id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.price)
        .bind(&listing.pic)
        .bind(&listing.shipping_address)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(listings.len())
}
