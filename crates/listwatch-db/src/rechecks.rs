//! Lookups and write-backs for the missing-seller and taken-down rechecks.

use chrono::{DateTime, Utc};
use listwatch_core::{MissingSellerRef, TakenDownRef};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `adverts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdvertRow {
    pub id: i64,
    pub domain: String,
    pub url: String,
    pub product: String,
    pub status: String,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<AdvertRow> for TakenDownRef {
    fn from(row: AdvertRow) -> Self {
        TakenDownRef {
            advert_id: row.id,
            product: row.product,
            url: row.url,
        }
    }
}

/// Unresolved listing URLs on `domain` that have no seller yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_missing_seller_urls(pool: &PgPool, domain: &str) -> Result<Vec<String>, DbError> {
    let urls = sqlx::query_scalar::<_, String>(
        "SELECT url FROM missing_sellers \
         WHERE domain = $1 AND seller IS NULL \
         ORDER BY id",
    )
    .bind(domain)
    .fetch_all(pool)
    .await?;

    Ok(urls)
}

/// Adverts on `domain` currently recorded as taken down.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_taken_down_adverts(pool: &PgPool, domain: &str) -> Result<Vec<AdvertRow>, DbError> {
    let rows = sqlx::query_as::<_, AdvertRow>(
        "SELECT id, domain, url, product, status, last_seen_at \
         FROM adverts \
         WHERE domain = $1 AND status = 'taken_down' \
         ORDER BY id",
    )
    .bind(domain)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Flips the given adverts back to `active` and stamps `last_seen_at`.
///
/// Returns the number of adverts updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_adverts_seen(pool: &PgPool, live: &[TakenDownRef]) -> Result<u64, DbError> {
    let ids: Vec<i64> = live.iter().map(|r| r.advert_id).collect();
    let result = sqlx::query(
        "UPDATE adverts \
         SET status = 'active', last_seen_at = NOW(), updated_at = NOW() \
         WHERE id = ANY($1)",
    )
    .bind(&ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Stores resolved seller names. All updates commit together or not at all.
///
/// Returns the number of rows resolved.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any update fails.
pub async fn resolve_sellers(pool: &PgPool, resolved: &[MissingSellerRef]) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0u64;

    for reference in resolved {
        let result = sqlx::query(
            "UPDATE missing_sellers \
             SET seller = $1, resolved_at = NOW() \
             WHERE url = $2 AND seller IS NULL",
        )
        .bind(&reference.seller)
        .bind(&reference.url)
        .execute(&mut *tx)
        .await?;
        count += result.rows_affected();
    }

    tx.commit().await?;
    Ok(count)
}
