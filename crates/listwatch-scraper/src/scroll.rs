//! Scroll-to-convergence loop for infinite-scroll search pages.

use std::time::Duration;

use crate::render::RenderSession;

/// Bounds on one convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollLimits {
    /// Pause after each scroll for lazy content to load.
    pub settle_delay: Duration,
    pub max_iterations: u32,
    /// Stop once more than this many cards are on the page.
    pub max_items: usize,
}

impl Default for ScrollLimits {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            max_iterations: 30,
            max_items: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    HeightStalled,
    CountStalled,
    ItemCap,
    IterationCap,
    /// A scroll or measurement failed; whatever had loaded is kept.
    BrowserError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub iterations: u32,
    /// Card count at the last successful measurement.
    pub last_count: usize,
    pub stop: StopReason,
}

/// Scrolls until the page stops growing.
///
/// Each iteration scrolls to the bottom, waits `settle_delay`, then reads the
/// document height and the number of `card_selector` matches. The loop stops
/// on the first iteration where the height did not increase, the count did
/// not increase, the count exceeds `max_items`, or `max_iterations` scrolls
/// have been made. Browser errors end the loop early rather than failing it.
pub async fn converge<S>(session: &mut S, card_selector: &str, limits: &ScrollLimits) -> ScrollOutcome
where
    S: RenderSession + ?Sized,
{
    let (mut height, mut last_count) = match measure(session, card_selector).await {
        Some(m) => m,
        None => {
            return ScrollOutcome {
                iterations: 0,
                last_count: 0,
                stop: StopReason::BrowserError,
            }
        }
    };

    let mut iterations = 0;
    let stop = loop {
        if iterations >= limits.max_iterations {
            break StopReason::IterationCap;
        }
        if let Err(e) = session.scroll_to_bottom().await {
            tracing::warn!(error = %e, iterations, "scroll failed; keeping loaded cards");
            break StopReason::BrowserError;
        }
        iterations += 1;
        tokio::time::sleep(limits.settle_delay).await;

        let Some((new_height, new_items)) = measure(session, card_selector).await else {
            break StopReason::BrowserError;
        };
        tracing::debug!(iterations, height = new_height, count = new_items, "scrolled");

        let grew_height = new_height > height;
        let grew_items = new_items > last_count;
        height = new_height;
        last_count = new_items;

        if !grew_height {
            break StopReason::HeightStalled;
        }
        if !grew_items {
            break StopReason::CountStalled;
        }
        if last_count > limits.max_items {
            break StopReason::ItemCap;
        }
    };

    ScrollOutcome {
        iterations,
        last_count,
        stop,
    }
}

async fn measure<S>(session: &mut S, card_selector: &str) -> Option<(u64, usize)>
where
    S: RenderSession + ?Sized,
{
    let height = match session.document_height().await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "reading document height failed");
            return None;
        }
    };
    match session.count_matches(card_selector).await {
        Ok(n) => Some((height, n)),
        Err(e) => {
            tracing::warn!(error = %e, "counting cards failed");
            None
        }
    }
}
