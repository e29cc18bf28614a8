//! `listwatch load`: ingest a crawl CSV into `listings`.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use listwatch_core::{AppConfig, SiteProfile};
use listwatch_db::{DbError, LoadReport, RunType, TriggerSource};
use sqlx::PgPool;

use crate::fail_run_best_effort;

/// Loads `file`, or the newest export in the outputs directory, and records
/// the run in `crawl_runs`. With a `timeout`, a load that overruns it is
/// abandoned and its run marked failed.
///
/// # Errors
///
/// Returns an error if the run cannot be recorded, the file cannot be read
/// or written to the database, or the timeout elapses.
pub(crate) async fn run_load(
    pool: &PgPool,
    config: &AppConfig,
    file: Option<&Path>,
    trigger: TriggerSource,
    timeout: Option<Duration>,
) -> anyhow::Result<LoadReport> {
    let site = SiteProfile::poshmark_us();
    let outputs = config.outputs_path();
    let load = listwatch_db::load_listings_file(pool, file, &outputs, &site.file_prefix);
    tracked_load(pool, trigger, timeout, load).await
}

/// Runs `load` inside a `crawl_runs` row. The row always ends `succeeded` or
/// `failed`, including when the timeout drops `load` partway through.
pub(crate) async fn tracked_load<F>(
    pool: &PgPool,
    trigger: TriggerSource,
    timeout: Option<Duration>,
    load: F,
) -> anyhow::Result<LoadReport>
where
    F: Future<Output = Result<LoadReport, DbError>>,
{
    let run = listwatch_db::create_crawl_run(pool, RunType::Load, trigger).await?;
    listwatch_db::start_crawl_run(pool, run.id).await?;

    match bounded(timeout, load).await {
        Ok(report) => {
            listwatch_db::complete_crawl_run(pool, run.id, report.rows_loaded).await?;
            Ok(report)
        }
        Err(err) => {
            fail_run_best_effort(pool, run.id, "load", format!("{err:#}")).await;
            Err(err)
        }
    }
}

/// Awaits `fut`, giving up after `limit` when one is set.
pub(crate) async fn bounded<T, E, F>(limit: Option<Duration>, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    let Some(limit) = limit else {
        return fut.await.map_err(Into::into);
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(anyhow::anyhow!(
            "load timed out after {}s",
            limit.as_secs()
        )),
    }
}
