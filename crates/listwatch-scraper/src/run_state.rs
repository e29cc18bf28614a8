//! Per-run accumulators shared across concurrent detail fetches.

use listwatch_core::{Listing, MissingSellerRef, TakenDownRef};
use tokio::sync::Mutex;

/// One detail request that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub reason: String,
}

/// Everything a run has gathered, in arrival order.
#[derive(Debug, Default)]
pub struct Accumulated {
    pub listings: Vec<Listing>,
    pub taken_down: Vec<TakenDownRef>,
    pub missing_seller: Vec<MissingSellerRef>,
    pub failures: Vec<FetchFailure>,
}

/// Append-only run state. Pushes from concurrent tasks never drop entries.
#[derive(Debug, Default)]
pub struct RunState {
    inner: Mutex<Accumulated>,
}

impl RunState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_listing(&self, listing: Listing) {
        self.inner.lock().await.listings.push(listing);
    }

    pub async fn push_taken_down(&self, reference: TakenDownRef) {
        self.inner.lock().await.taken_down.push(reference);
    }

    pub async fn push_missing_seller(&self, reference: MissingSellerRef) {
        self.inner.lock().await.missing_seller.push(reference);
    }

    pub async fn record_failure(&self, url: &str, reason: impl Into<String>) {
        self.inner.lock().await.failures.push(FetchFailure {
            url: url.to_owned(),
            reason: reason.into(),
        });
    }

    pub async fn listing_count(&self) -> usize {
        self.inner.lock().await.listings.len()
    }

    #[must_use]
    pub fn into_inner(self) -> Accumulated {
        self.inner.into_inner()
    }
}
