mod crawl;
mod load;
mod scheduler;
mod status;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use listwatch_db::TriggerSource;
use tracing_subscriber::EnvFilter;

use crate::crawl::CrawlTarget;

#[derive(Debug, Parser)]
#[command(name = "listwatch")]
#[command(about = "Marketplace listing crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every active seed and export the listings to CSV
    Crawl {
        /// Override the configured region for this run
        #[arg(long)]
        region: Option<String>,
        /// Override the configured country for this run
        #[arg(long)]
        country: Option<String>,
    },
    /// Load a crawl CSV into the database (defaults to the newest export)
    Load {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run the daily crawl-then-load job until interrupted
    Schedule,
    /// Show recent runs and exports
    Status {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Migrate,
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Arc::new(listwatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, work_dir = %config.work_dir.display(), "configuration loaded");

    let pool_config = listwatch_db::PoolConfig::from_app_config(&config);
    let pool = listwatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Crawl { region, country } => {
            let target = CrawlTarget { region, country };
            let summary = crawl::run_crawl(&pool, &config, &target, TriggerSource::Cli).await?;
            crawl::print_summary(&summary);
        }
        Commands::Load { file } => {
            let report =
                load::run_load(&pool, &config, file.as_deref(), TriggerSource::Cli, None).await?;
            match report.file {
                Some(path) => println!(
                    "loaded {} rows from {} ({} skipped)",
                    report.rows_loaded,
                    path.display(),
                    report.rows_skipped
                ),
                None => println!("no export file found; nothing loaded"),
            }
        }
        Commands::Schedule => {
            let mut scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;
            shutdown_signal().await;
            scheduler.shutdown().await?;
        }
        Commands::Status { limit } => status::run_status(&pool, limit).await?,
        Commands::Db { command } => match command {
            DbCommands::Migrate => {
                let applied = listwatch_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
            DbCommands::Ping => {
                listwatch_db::ping(&pool).await?;
                println!("database reachable");
            }
        },
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}

/// Marks a run failed, logging instead of propagating if that update fails.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = listwatch_db::fail_crawl_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}
