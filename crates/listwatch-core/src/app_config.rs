use std::path::PathBuf;

/// Execution profile selected by `LISTWATCH_ENV`.
///
/// Only decides where the crawl reads and writes its files; crawl logic is
/// identical in both profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Local => write!(f, "local"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    /// Base directory for relative paths. The current directory in the local
    /// profile, `LISTWATCH_PROD_WORKDIR` in production.
    pub work_dir: PathBuf,
    pub log_level: String,
    pub output_dir: PathBuf,
    pub region: String,
    pub country: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_requests: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub download_delay_ms: u64,
    pub throttle_start_delay_ms: u64,
    pub throttle_max_delay_ms: u64,
    pub throttle_target_concurrency: f64,
    pub render_ready_timeout_secs: u64,
    pub scroll_settle_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub crawl_cron: String,
    pub crawl_retries: u32,
    pub crawl_retry_delay_secs: u64,
    pub load_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Directory the crawl writes CSV exports into and the load step reads from.
    #[must_use]
    pub fn outputs_path(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.work_dir.join(&self.output_dir)
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("work_dir", &self.work_dir)
            .field("log_level", &self.log_level)
            .field("output_dir", &self.output_dir)
            .field("region", &self.region)
            .field("country", &self.country)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("download_delay_ms", &self.download_delay_ms)
            .field("throttle_start_delay_ms", &self.throttle_start_delay_ms)
            .field("throttle_max_delay_ms", &self.throttle_max_delay_ms)
            .field(
                "throttle_target_concurrency",
                &self.throttle_target_concurrency,
            )
            .field("render_ready_timeout_secs", &self.render_ready_timeout_secs)
            .field("scroll_settle_ms", &self.scroll_settle_ms)
            .field("chrome_path", &self.chrome_path)
            .field("crawl_cron", &self.crawl_cron)
            .field("crawl_retries", &self.crawl_retries)
            .field("crawl_retry_delay_secs", &self.crawl_retry_delay_secs)
            .field("load_timeout_secs", &self.load_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
