use sqlx::PgPool;

use crate::DbError;

/// Records a region/country pair. Registering an existing pair is a no-op.
///
/// Returns `true` if the pair was new.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn register_region(pool: &PgPool, region: &str, country: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO regions (region, country) VALUES ($1, $2) \
         ON CONFLICT (region, country) DO NOTHING",
    )
    .bind(region)
    .bind(country)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
