//! Retry utilities for detail-page fetches.
//!
//! Transient transport failures and a small set of gateway-style statuses are
//! retried with exponential backoff. Everything else (404s, extraction
//! problems, collaborator failures) is handed back immediately so the
//! orchestrator's per-listing policy can decide what to do with it.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound on how long a server-provided `Retry-After` can stall a fetch.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Statuses treated as transient, mirroring common crawler defaults.
pub(crate) const RETRY_STATUSES: &[u16] = &[408, 500, 502, 503, 504, 522, 524];

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`] - HTTP 429.
/// - [`ScraperError::Http`] - connection reset, timeout, TLS failure.
/// - [`ScraperError::UnexpectedStatus`] with a status in [`RETRY_STATUSES`].
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => RETRY_STATUSES.contains(status),
        _ => false,
    }
}

fn retry_delay_secs(err: &ScraperError, backoff_base_secs: u64, attempt: u32) -> u64 {
    let backoff = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
    match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => backoff.max((*retry_after_secs).min(MAX_RETRY_AFTER_SECS)),
        _ => backoff,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_secs * 2^attempt`
/// seconds (or the server's `Retry-After`, capped at one minute, if that is
/// longer) and tries again, up to `max_retries` additional attempts after the
/// first try. If all retries are exhausted the last error is returned.
///
/// | Attempt | Sleep before next attempt (`backoff_base_secs = 1`) |
/// |---------|------------------------------------------------------|
/// | 0 (initial) | - |
/// | 1 | 1 s |
/// | 2 | 2 s |
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = retry_delay_secs(&err, backoff_base_secs, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
