//! HTTP fetching of listing detail pages.

mod origin;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::rate_limit::{retry_with_backoff, RETRY_STATUSES};
use crate::throttle::AutoThrottle;

pub use origin::{extract_domain, resolve_listing_url};

/// A fetched page. Non-2xx responses that are not retried still come back
/// as pages so callers can tell "gone" from "failed".
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source of detail pages for the orchestrator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_secs * 2^attempt`.
    pub backoff_base_secs: u64,
}

/// `reqwest`-backed fetcher that spaces requests through a shared
/// [`AutoThrottle`] and retries transient failures.
pub struct HttpFetcher {
    client: Client,
    throttle: Arc<AutoThrottle>,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &FetchSettings, throttle: Arc<AutoThrottle>) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            throttle,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.backoff_base_secs,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        self.throttle.wait_turn().await;

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();
        self.throttle
            .record_response(started.elapsed(), status.as_u16())
            .await;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }

        if RETRY_STATUSES.contains(&status.as_u16()) {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches `url`, retrying 429, gateway errors and transport failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] - HTTP 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`] - a retriable 5xx after all retries.
    /// - [`ScraperError::Http`] - network or TLS failure after all retries.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.fetch_once(url)
        })
        .await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
