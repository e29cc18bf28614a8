//! `listwatch crawl`: one full crawl of the marketplace.

use std::sync::Arc;
use std::time::Duration;

use listwatch_core::{AppConfig, SiteProfile};
use listwatch_db::{RunType, TriggerSource};
use listwatch_scraper::{
    AutoThrottle, ChromeConfig, ChromeRenderer, CrawlSettings, FetchSettings, HttpFetcher,
    Orchestrator, RunSummary, ScrollLimits, ThrottleConfig,
};
use sqlx::PgPool;

use crate::fail_run_best_effort;
use crate::store::PgStore;

/// Region/country overrides from the command line.
#[derive(Debug, Default, Clone)]
pub(crate) struct CrawlTarget {
    pub region: Option<String>,
    pub country: Option<String>,
}

pub(crate) fn throttle_config(config: &AppConfig) -> ThrottleConfig {
    ThrottleConfig {
        start_delay: Duration::from_millis(config.throttle_start_delay_ms),
        min_delay: Duration::from_millis(config.download_delay_ms),
        max_delay: Duration::from_millis(config.throttle_max_delay_ms),
        target_concurrency: config.throttle_target_concurrency,
    }
}

pub(crate) fn crawl_settings(config: &AppConfig, target: &CrawlTarget) -> CrawlSettings {
    CrawlSettings {
        region: target
            .region
            .clone()
            .unwrap_or_else(|| config.region.clone()),
        country: target
            .country
            .clone()
            .unwrap_or_else(|| config.country.clone()),
        max_concurrent_requests: config.max_concurrent_requests,
        ready_timeout: Duration::from_secs(config.render_ready_timeout_secs),
        scroll: ScrollLimits {
            settle_delay: Duration::from_millis(config.scroll_settle_ms),
            ..ScrollLimits::default()
        },
        output_dir: config.outputs_path(),
    }
}

/// Runs one crawl and records it in `crawl_runs`.
///
/// # Errors
///
/// Returns an error if the run cannot be recorded, the HTTP client cannot be
/// built, or the crawl itself fails.
pub(crate) async fn run_crawl(
    pool: &PgPool,
    config: &AppConfig,
    target: &CrawlTarget,
    trigger: TriggerSource,
) -> anyhow::Result<RunSummary> {
    let run = listwatch_db::create_crawl_run(pool, RunType::Crawl, trigger).await?;
    listwatch_db::start_crawl_run(pool, run.id).await?;

    match crawl_once(pool, config, target).await {
        Ok(summary) => {
            listwatch_db::complete_crawl_run(pool, run.id, summary.listings_exported).await?;
            Ok(summary)
        }
        Err(err) => {
            fail_run_best_effort(pool, run.id, "crawl", format!("{err:#}")).await;
            Err(err)
        }
    }
}

async fn crawl_once(
    pool: &PgPool,
    config: &AppConfig,
    target: &CrawlTarget,
) -> anyhow::Result<RunSummary> {
    let throttle = Arc::new(AutoThrottle::new(throttle_config(config)));
    let fetcher = HttpFetcher::new(
        &FetchSettings {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        },
        throttle,
    )?;
    let renderer = ChromeRenderer::new(ChromeConfig {
        executable: config.chrome_path.clone(),
        user_agent: config.user_agent.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    });

    let orchestrator = Orchestrator::new(
        SiteProfile::poshmark_us(),
        crawl_settings(config, target),
        renderer,
        fetcher,
        PgStore::new(pool.clone()).into_collaborators(),
    );
    let summary = orchestrator.run().await?;
    Ok(summary)
}

/// Prints a one-screen summary of a finished crawl.
pub(crate) fn print_summary(summary: &RunSummary) {
    println!(
        "seeds: {} accepted of {}",
        summary.seeds_accepted, summary.seeds_total
    );
    println!("listing urls discovered: {}", summary.listing_urls);
    println!(
        "listings: {} collected, {} exported",
        summary.listings_collected, summary.listings_exported
    );
    println!("failed listings: {}", summary.failures);
    println!(
        "rechecks: {} taken-down listings live again, {} sellers resolved",
        summary.taken_down_live, summary.sellers_resolved
    );
    match &summary.output_file {
        Some(path) => println!("csv: {}", path.display()),
        None => println!("csv: none (no listings)"),
    }
}
