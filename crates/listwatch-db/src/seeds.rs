//! Search seeds stored in `seeds`.

use listwatch_core::{fill_search_template, parse_code_list, Seed};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `seeds` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeedRow {
    pub id: i64,
    pub keyword: String,
    pub company_id: i64,
    pub search_template: String,
    /// Explicit search URL; when `NULL` the template is filled with the keyword.
    pub target_url: Option<String>,
    /// Comma-separated region codes, e.g. `"NA, EU"`.
    pub regions: String,
    /// Comma-separated country names.
    pub countries: String,
}

impl SeedRow {
    #[must_use]
    pub fn into_seed(self) -> Seed {
        let target_url = match self.target_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => fill_search_template(&self.search_template, &self.keyword),
        };
        Seed {
            keyword: self.keyword,
            target_url,
            company_id: self.company_id,
            regions: parse_code_list(Some(&self.regions)),
            countries: parse_code_list(Some(&self.countries)),
        }
    }
}

/// Active seeds whose search URLs follow `search_template`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_seeds(pool: &PgPool, search_template: &str) -> Result<Vec<SeedRow>, DbError> {
    let rows = sqlx::query_as::<_, SeedRow>(
        "SELECT id, keyword, company_id, search_template, target_url, regions, countries \
         FROM seeds \
         WHERE is_active AND search_template = $1 \
         ORDER BY id",
    )
    .bind(search_template)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
