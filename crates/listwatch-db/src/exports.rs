//! Finished-crawl exports in `crawl_exports`.

use chrono::{DateTime, Utc};
use listwatch_core::Listing;
use sqlx::PgPool;

use crate::DbError;

/// Identifies whose crawl an export belongs to.
#[derive(Debug, Clone, Copy)]
pub struct NewCrawlExport<'a> {
    pub spider_name: &'a str,
    pub region: &'a str,
    pub country: &'a str,
    pub domain: &'a str,
    pub seller: &'a str,
}

/// A row from the `crawl_exports` table, without its payload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrawlExportRow {
    pub id: i64,
    pub spider_name: String,
    pub region: String,
    pub country: String,
    pub domain: String,
    pub seller: String,
    pub listing_count: i32,
    pub exported_at: DateTime<Utc>,
}

/// Stores one crawl's deduplicated listings as a JSON payload. An empty
/// slice still records a row, so "ran and found nothing" is visible.
///
/// Returns the new row's `id`.
///
/// # Errors
///
/// Returns [`DbError::Serialize`] if the listings cannot be encoded,
/// [`DbError::OutOfRange`] for an absurd count, or [`DbError::Sqlx`] if the
/// insert fails.
pub async fn record_export(
    pool: &PgPool,
    export: NewCrawlExport<'_>,
    listings: &[Listing],
) -> Result<i64, DbError> {
    let payload = serde_json::to_value(listings)?;
    let count = crate::to_i32("listing_count", listings.len())?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO crawl_exports \
             (spider_name, region, country, domain, seller, listing_count, payload) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(export.spider_name)
    .bind(export.region)
    .bind(export.country)
    .bind(export.domain)
    .bind(export.seller)
    .bind(count)
    .bind(payload)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent exports for `spider_name`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_exports(
    pool: &PgPool,
    spider_name: &str,
    limit: i64,
) -> Result<Vec<CrawlExportRow>, DbError> {
    let rows = sqlx::query_as::<_, CrawlExportRow>(
        "SELECT id, spider_name, region, country, domain, seller, listing_count, exported_at \
         FROM crawl_exports \
         WHERE spider_name = $1 \
         ORDER BY exported_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(spider_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
