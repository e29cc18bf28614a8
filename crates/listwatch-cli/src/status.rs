//! `listwatch status`: recent runs and exports.

use listwatch_core::SiteProfile;
use listwatch_db::{CrawlExportRow, CrawlRunRow};
use sqlx::PgPool;

/// Prints the newest `limit` runs and exports.
///
/// # Errors
///
/// Returns an error if either query fails.
pub(crate) async fn run_status(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = listwatch_db::list_crawl_runs(pool, limit).await?;
    let site = SiteProfile::poshmark_us();
    let exports = listwatch_db::list_recent_exports(pool, &site.spider_name, limit).await?;

    println!("recent runs:");
    if runs.is_empty() {
        println!("  (none)");
    }
    for run in &runs {
        println!("  {}", format_run(run));
    }

    println!("recent exports ({}):", site.spider_name);
    if exports.is_empty() {
        println!("  (none)");
    }
    for export in &exports {
        println!("  {}", format_export(export));
    }
    Ok(())
}

pub(crate) fn format_run(run: &CrawlRunRow) -> String {
    let when = run
        .started_at
        .unwrap_or(run.created_at)
        .format("%Y-%m-%d %H:%M:%S");
    let mut line = format!(
        "#{} {} {} via {} at {when}: {} records",
        run.id, run.run_type, run.status, run.trigger_source, run.records_processed
    );
    if let Some(message) = &run.error_message {
        line.push_str(&format!(" ({message})"));
    }
    line
}

pub(crate) fn format_export(export: &CrawlExportRow) -> String {
    format!(
        "#{} {}/{} {} at {}: {} listings",
        export.id,
        export.region,
        export.country,
        export.domain,
        export.exported_at.format("%Y-%m-%d %H:%M:%S"),
        export.listing_count
    )
}
