//! Bookkeeping for crawl and load executions in `crawl_runs`.
//!
//! A run moves `queued -> running -> succeeded | failed`; each transition
//! only applies from its expected prior status.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Crawl,
    Load,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Crawl => "crawl",
            RunType::Load => "load",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Cli,
    Scheduler,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cli => "cli",
            TriggerSource::Scheduler => "scheduler",
        }
    }
}

/// A row from the `crawl_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrawlRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, \
     started_at, completed_at, records_processed, error_message, created_at";

/// Creates a new run in `queued` status and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_crawl_run(
    pool: &PgPool,
    run_type: RunType,
    trigger_source: TriggerSource,
) -> Result<CrawlRunRow, DbError> {
    let row = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "INSERT INTO crawl_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_type.as_str())
    .bind(trigger_source.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a queued run as `running`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCrawlRunTransition`] if the run is not queued,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_crawl_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCrawlRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a running run as `succeeded` with its record count.
///
/// # Errors
///
/// Returns [`DbError::InvalidCrawlRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_crawl_run(
    pool: &PgPool,
    id: i64,
    records_processed: usize,
) -> Result<(), DbError> {
    let records = crate::to_i32("records_processed", records_processed)?;
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(records)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCrawlRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a running run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidCrawlRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_crawl_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCrawlRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_crawl_run(pool: &PgPool, id: i64) -> Result<CrawlRunRow, DbError> {
    sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_crawl_runs(pool: &PgPool, limit: i64) -> Result<Vec<CrawlRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
