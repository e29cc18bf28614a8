//! Postgres-backed implementations of the crawl's collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;
use listwatch_core::{Listing, MissingSellerRef, Seed, TakenDownRef};
use listwatch_scraper::{
    Collaborators, ExportKey, ExportSink, RecheckSource, RegionDirectory, ScraperError,
    SeedProvider, StateUpdater,
};
use sqlx::PgPool;

pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One store behind every collaborator seam.
    pub(crate) fn into_collaborators(self) -> Collaborators {
        let store = Arc::new(self);
        Collaborators {
            seeds: store.clone(),
            rechecks: store.clone(),
            regions: store.clone(),
            export: store.clone(),
            state: store,
        }
    }
}

#[async_trait]
impl SeedProvider for PgStore {
    async fn seeds(&self, search_template: &str) -> Result<Vec<Seed>, ScraperError> {
        let rows = listwatch_db::list_active_seeds(&self.pool, search_template)
            .await
            .map_err(|e| ScraperError::collaborator("seed lookup", e))?;
        Ok(rows.into_iter().map(listwatch_db::SeedRow::into_seed).collect())
    }
}

#[async_trait]
impl RecheckSource for PgStore {
    async fn missing_seller_urls(&self, domain: &str) -> Result<Vec<String>, ScraperError> {
        listwatch_db::list_missing_seller_urls(&self.pool, domain)
            .await
            .map_err(|e| ScraperError::collaborator("missing-seller lookup", e))
    }

    async fn taken_down_adverts(&self, domain: &str) -> Result<Vec<TakenDownRef>, ScraperError> {
        let rows = listwatch_db::list_taken_down_adverts(&self.pool, domain)
            .await
            .map_err(|e| ScraperError::collaborator("taken-down lookup", e))?;
        Ok(rows.into_iter().map(TakenDownRef::from).collect())
    }
}

#[async_trait]
impl RegionDirectory for PgStore {
    async fn register(&self, region: &str, country: &str) -> Result<(), ScraperError> {
        let inserted = listwatch_db::register_region(&self.pool, region, country)
            .await
            .map_err(|e| ScraperError::collaborator("region registration", e))?;
        if inserted {
            tracing::info!(region, country, "registered new region");
        }
        Ok(())
    }
}

#[async_trait]
impl ExportSink for PgStore {
    async fn export(&self, key: &ExportKey, listings: &[Listing]) -> Result<(), ScraperError> {
        let export = listwatch_db::NewCrawlExport {
            spider_name: &key.spider_name,
            region: &key.region,
            country: &key.country,
            domain: &key.domain,
            seller: &key.seller,
        };
        let id = listwatch_db::record_export(&self.pool, export, listings)
            .await
            .map_err(|e| ScraperError::collaborator("export", e))?;
        tracing::info!(export_id = id, listings = listings.len(), "export recorded");
        Ok(())
    }
}

#[async_trait]
impl StateUpdater for PgStore {
    async fn update_last_seen(&self, live: &[TakenDownRef]) -> Result<(), ScraperError> {
        let updated = listwatch_db::mark_adverts_seen(&self.pool, live)
            .await
            .map_err(|e| ScraperError::collaborator("last-seen update", e))?;
        tracing::info!(updated, "adverts marked live");
        Ok(())
    }

    async fn update_sellers(&self, resolved: &[MissingSellerRef]) -> Result<(), ScraperError> {
        let updated = listwatch_db::resolve_sellers(&self.pool, resolved)
            .await
            .map_err(|e| ScraperError::collaborator("seller update", e))?;
        tracing::info!(updated, "sellers resolved");
        Ok(())
    }
}
