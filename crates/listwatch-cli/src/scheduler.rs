//! Daily crawl-then-load job.
//!
//! The crawl is retried a configured number of times. The load step always
//! runs afterwards, bounded by a timeout, so a partially successful day still
//! gets whatever CSV the crawl managed to write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use listwatch_core::AppConfig;
use listwatch_db::TriggerSource;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::crawl::{run_crawl, CrawlTarget};
use crate::load::run_load;

/// Builds and starts the scheduler with the daily job registered on
/// `config.crawl_cron`. Dropping the returned handle stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot start.
pub(crate) async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_daily_job(&scheduler, pool, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_daily_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let running = Arc::new(Mutex::new(()));
    let cron = config.crawl_cron.clone();

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!("scheduler: previous run still in progress; skipping");
                return;
            };
            tracing::info!("scheduler: starting daily crawl");
            run_daily(&pool, &config).await;
            tracing::info!("scheduler: daily run complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: daily crawl registered");
    Ok(())
}

async fn run_daily(pool: &PgPool, config: &AppConfig) {
    let target = CrawlTarget::default();
    let attempts = config.crawl_retries.saturating_add(1);
    let delay = Duration::from_secs(config.crawl_retry_delay_secs);

    let crawl = with_retries(attempts, delay, |attempt| {
        let target = target.clone();
        async move {
            tracing::info!(attempt, "scheduler: crawl attempt");
            run_crawl(pool, config, &target, TriggerSource::Scheduler).await
        }
    })
    .await;
    match crawl {
        Ok(summary) => tracing::info!(
            exported = summary.listings_exported,
            failures = summary.failures,
            "scheduler: crawl succeeded"
        ),
        Err(err) => tracing::error!(error = %format!("{err:#}"), "scheduler: crawl failed"),
    }

    let timeout = Duration::from_secs(config.load_timeout_secs);
    match run_load(pool, config, None, TriggerSource::Scheduler, Some(timeout)).await {
        Ok(report) => tracing::info!(
            rows_loaded = report.rows_loaded,
            rows_skipped = report.rows_skipped,
            "scheduler: load succeeded"
        ),
        Err(err) => tracing::error!(error = %format!("{err:#}"), "scheduler: load failed"),
    }
}

/// Runs `op` up to `attempts` times, sleeping `delay` between failures.
/// The closure receives the 1-based attempt number.
pub(crate) async fn with_retries<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                tracing::warn!(attempt, error = %err, "attempt failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn with_retries_stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries(3, Duration::from_secs(60), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err("boom".to_string())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn with_retries_gives_up_after_last_attempt() {
        let started = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retries(3, Duration::from_secs(10), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("attempt {attempt}")) }
        })
        .await;

        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let result: Result<&str, String> =
            with_retries(0, Duration::ZERO, |_| async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
    }
}
