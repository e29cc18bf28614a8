use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("LISTWATCH_ENV", "local"));
    let work_dir = match env {
        Environment::Production => PathBuf::from(require("LISTWATCH_PROD_WORKDIR")?),
        Environment::Local => PathBuf::from("."),
    };

    let log_level = or_default("LISTWATCH_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("LISTWATCH_OUTPUT_DIR", "outputs"));
    let region = or_default("LISTWATCH_REGION", "NA");
    let country = or_default("LISTWATCH_COUNTRY", "United States");

    let request_timeout_secs = parse_u64("LISTWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "LISTWATCH_USER_AGENT",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    );
    let max_concurrent_requests = parse_usize("LISTWATCH_MAX_CONCURRENT_REQUESTS", "2")?;
    if max_concurrent_requests == 0 {
        return Err(invalid(
            "LISTWATCH_MAX_CONCURRENT_REQUESTS",
            "must be at least 1".to_string(),
        ));
    }
    let max_retries = parse_u32("LISTWATCH_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("LISTWATCH_RETRY_BACKOFF_BASE_SECS", "1")?;

    let download_delay_ms = parse_u64("LISTWATCH_DOWNLOAD_DELAY_MS", "1000")?;
    let throttle_start_delay_ms = parse_u64("LISTWATCH_THROTTLE_START_DELAY_MS", "4000")?;
    let throttle_max_delay_ms = parse_u64("LISTWATCH_THROTTLE_MAX_DELAY_MS", "60000")?;
    let throttle_target_concurrency = or_default("LISTWATCH_THROTTLE_TARGET_CONCURRENCY", "4.0")
        .parse::<f64>()
        .map_err(|e| invalid("LISTWATCH_THROTTLE_TARGET_CONCURRENCY", e.to_string()))?;
    if !(throttle_target_concurrency.is_finite() && throttle_target_concurrency > 0.0) {
        return Err(invalid(
            "LISTWATCH_THROTTLE_TARGET_CONCURRENCY",
            "must be a positive number".to_string(),
        ));
    }

    let render_ready_timeout_secs = parse_u64("LISTWATCH_RENDER_READY_TIMEOUT_SECS", "10")?;
    let scroll_settle_ms = parse_u64("LISTWATCH_SCROLL_SETTLE_MS", "2000")?;
    let chrome_path = lookup("LISTWATCH_CHROME_PATH").ok().map(PathBuf::from);

    let crawl_cron = or_default("LISTWATCH_CRAWL_CRON", "0 5 0 * * *");
    let crawl_retries = parse_u32("LISTWATCH_CRAWL_RETRIES", "3")?;
    let crawl_retry_delay_secs = parse_u64("LISTWATCH_CRAWL_RETRY_DELAY_SECS", "60")?;
    let load_timeout_secs = parse_u64("LISTWATCH_LOAD_TIMEOUT_SECS", "43200")?;

    let db_max_connections = parse_u32("LISTWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LISTWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LISTWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        work_dir,
        log_level,
        output_dir,
        region,
        country,
        request_timeout_secs,
        user_agent,
        max_concurrent_requests,
        max_retries,
        retry_backoff_base_secs,
        download_delay_ms,
        throttle_start_delay_ms,
        throttle_max_delay_ms,
        throttle_target_concurrency,
        render_ready_timeout_secs,
        scroll_settle_ms,
        chrome_path,
        crawl_cron,
        crawl_retries,
        crawl_retry_delay_secs,
        load_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Only `production` (or its short form `prod`) selects the production
/// profile; everything else, including an empty value, is local.
fn parse_environment(s: &str) -> Environment {
    match s.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        _ => Environment::Local,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
