//! Adaptive inter-request delay shared by all detail fetches.
//!
//! Requests are dispatched no closer together than the current delay. After
//! every response the delay moves halfway toward `latency / target_concurrency`,
//! so a slow or struggling server pushes it up and a fast one lets it drift
//! back down to the configured floor.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Delay before any latency has been observed.
    pub start_delay: Duration,
    /// Floor; the delay never drops below this.
    pub min_delay: Duration,
    /// Ceiling for the delay under sustained pressure.
    pub max_delay: Duration,
    /// Average number of requests the server should be handling at once.
    pub target_concurrency: f64,
}

impl ThrottleConfig {
    /// No delay at all. Used by tests and local mirrors.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            start_delay: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            target_concurrency: 1.0,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(4),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            target_concurrency: 4.0,
        }
    }
}

#[derive(Debug)]
struct ThrottleState {
    delay: Duration,
    next_slot: Option<Instant>,
}

#[derive(Debug)]
pub struct AutoThrottle {
    config: ThrottleConfig,
    state: Mutex<ThrottleState>,
}

impl AutoThrottle {
    #[must_use]
    pub fn new(mut config: ThrottleConfig) -> Self {
        config.max_delay = config.max_delay.max(config.min_delay);
        if !(config.target_concurrency.is_finite() && config.target_concurrency > 0.0) {
            config.target_concurrency = 1.0;
        }
        let delay = config
            .start_delay
            .max(config.min_delay)
            .min(config.max_delay);
        Self {
            config,
            state: Mutex::new(ThrottleState {
                delay,
                next_slot: None,
            }),
        }
    }

    /// Waits until this caller's dispatch slot comes up.
    ///
    /// Slots are reserved under the lock, so concurrent callers are spaced
    /// out by the delay rather than released together.
    pub async fn wait_turn(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let slot = state.next_slot.map_or(now, |next| next.max(now));
            state.next_slot = Some(slot + state.delay);
            slot - now
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Feeds one response's latency and status back into the delay.
    pub async fn record_response(&self, latency: Duration, status: u16) {
        let mut state = self.state.lock().await;
        let previous = state.delay;
        state.delay = self.next_delay(previous, latency, status);
        if state.delay != previous {
            tracing::debug!(
                previous_ms = previous.as_millis(),
                delay_ms = state.delay.as_millis(),
                latency_ms = latency.as_millis(),
                status,
                "throttle delay adjusted"
            );
        }
    }

    pub async fn current_delay(&self) -> Duration {
        self.state.lock().await.delay
    }

    fn next_delay(&self, current: Duration, latency: Duration, status: u16) -> Duration {
        let target = latency.div_f64(self.config.target_concurrency);
        let averaged = (current + target) / 2;
        let next = averaged
            .max(target)
            .clamp(self.config.min_delay, self.config.max_delay);

        // An error response is not evidence that the server has capacity.
        let is_success = (200..300).contains(&status);
        if !is_success && next <= current {
            return current;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle() -> AutoThrottle {
        AutoThrottle::new(ThrottleConfig::default())
    }

    #[tokio::test]
    async fn starts_at_start_delay() {
        assert_eq!(throttle().current_delay().await, Duration::from_secs(4));
    }

    #[tokio::test]
    async fn fast_responses_decay_toward_floor() {
        let t = throttle();
        for _ in 0..20 {
            t.record_response(Duration::from_millis(100), 200).await;
        }
        assert_eq!(t.current_delay().await, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn slow_responses_raise_delay() {
        let t = throttle();
        // target = 40s / 4 = 10s; averaged with 4s = 7s, but never below target.
        t.record_response(Duration::from_secs(40), 200).await;
        assert_eq!(t.current_delay().await, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn delay_is_capped_at_max() {
        let t = throttle();
        t.record_response(Duration::from_secs(1000), 200).await;
        assert_eq!(t.current_delay().await, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn error_responses_never_lower_the_delay() {
        let t = throttle();
        t.record_response(Duration::from_millis(10), 503).await;
        assert_eq!(t.current_delay().await, Duration::from_secs(4));

        t.record_response(Duration::from_secs(40), 503).await;
        assert_eq!(t.current_delay().await, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn disabled_throttle_never_waits() {
        let t = AutoThrottle::new(ThrottleConfig::disabled());
        let started = Instant::now();
        for _ in 0..5 {
            t.wait_turn().await;
        }
        t.record_response(Duration::from_secs(10), 200).await;
        assert_eq!(t.current_delay().await, Duration::ZERO);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_turns_are_spaced_by_delay() {
        let t = AutoThrottle::new(ThrottleConfig {
            start_delay: Duration::from_secs(2),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(2),
            target_concurrency: 1.0,
        });
        let started = Instant::now();
        t.wait_turn().await;
        t.wait_turn().await;
        t.wait_turn().await;
        assert!(started.elapsed() >= Duration::from_secs(4));
    }
}
