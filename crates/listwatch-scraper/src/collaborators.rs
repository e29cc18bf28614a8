//! External services the crawl reads from and reports to.
//!
//! The orchestrator only talks to these traits; `listwatch-cli` wires them to
//! Postgres, and tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use listwatch_core::{Listing, MissingSellerRef, Seed, TakenDownRef};

use crate::error::ScraperError;

#[async_trait]
pub trait SeedProvider: Send + Sync {
    /// All active seeds for the site whose search URLs follow `search_template`.
    async fn seeds(&self, search_template: &str) -> Result<Vec<Seed>, ScraperError>;
}

#[async_trait]
pub trait RecheckSource: Send + Sync {
    /// Listing URLs on `domain` recorded without a seller.
    async fn missing_seller_urls(&self, domain: &str) -> Result<Vec<String>, ScraperError>;

    /// Listings on `domain` last recorded as taken down.
    async fn taken_down_adverts(&self, domain: &str) -> Result<Vec<TakenDownRef>, ScraperError>;
}

#[async_trait]
pub trait RegionDirectory: Send + Sync {
    /// Ensures the crawl's region/country pair is known downstream.
    async fn register(&self, region: &str, country: &str) -> Result<(), ScraperError>;
}

/// Identifies one crawl's export to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportKey {
    pub spider_name: String,
    pub region: String,
    pub country: String,
    pub domain: String,
    pub seller: String,
}

#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Receives the deduplicated listings of a run. Called even when empty.
    async fn export(&self, key: &ExportKey, listings: &[Listing]) -> Result<(), ScraperError>;
}

#[async_trait]
pub trait StateUpdater: Send + Sync {
    /// Marks listings seen alive again.
    async fn update_last_seen(&self, live: &[TakenDownRef]) -> Result<(), ScraperError>;

    /// Backfills resolved seller names.
    async fn update_sellers(&self, resolved: &[MissingSellerRef]) -> Result<(), ScraperError>;
}

/// The full set of services one crawl needs.
#[derive(Clone)]
pub struct Collaborators {
    pub seeds: Arc<dyn SeedProvider>,
    pub rechecks: Arc<dyn RecheckSource>,
    pub regions: Arc<dyn RegionDirectory>,
    pub export: Arc<dyn ExportSink>,
    pub state: Arc<dyn StateUpdater>,
}
