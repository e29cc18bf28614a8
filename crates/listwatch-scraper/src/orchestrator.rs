//! One crawl run, from seed lookup to export.
//!
//! Phases run strictly in order: register the region, load and filter seeds,
//! crawl each seed (render, scroll, enumerate links, fetch details), recheck
//! listings missing a seller, recheck listings recorded as taken down, then
//! export and report updates. Shutdown happens exactly once, after every
//! queued fetch has finished.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::StreamExt;
use listwatch_core::{MissingSellerRef, Provenance, Seed, SeedTag, SiteProfile, TakenDownRef};

use crate::client::PageFetcher;
use crate::collaborators::{Collaborators, ExportKey};
use crate::error::ScraperError;
use crate::export::finalize;
use crate::extract::{extract_fields, extract_listing, extract_seller_name, listing_links, ListingContext};
use crate::render::{RenderSession, Renderer};
use crate::run_state::RunState;
use crate::scroll::{converge, ScrollLimits};

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub region: String,
    pub country: String,
    /// Detail fetches in flight at once.
    pub max_concurrent_requests: usize,
    /// How long a search page gets to show its first card.
    pub ready_timeout: Duration,
    pub scroll: ScrollLimits,
    pub output_dir: PathBuf,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub seeds_total: usize,
    pub seeds_accepted: usize,
    pub listing_urls: usize,
    pub listings_collected: usize,
    pub listings_exported: usize,
    pub failures: usize,
    pub taken_down_live: usize,
    pub sellers_resolved: usize,
    pub output_file: Option<PathBuf>,
}

/// Why a detail page is being fetched; decides what happens to the response.
#[derive(Debug, Clone)]
enum RequestOrigin {
    Search(SeedTag),
    MissingSeller,
    TakenDown(TakenDownRef),
}

#[derive(Debug, Clone)]
struct DetailJob {
    url: String,
    origin: RequestOrigin,
}

pub struct Orchestrator<R, F> {
    site: SiteProfile,
    settings: CrawlSettings,
    provenance: Provenance,
    renderer: R,
    fetcher: F,
    collaborators: Collaborators,
}

impl<R, F> Orchestrator<R, F>
where
    R: Renderer,
    F: PageFetcher,
{
    #[must_use]
    pub fn new(
        site: SiteProfile,
        settings: CrawlSettings,
        renderer: R,
        fetcher: F,
        collaborators: Collaborators,
    ) -> Self {
        let provenance = site.provenance(&settings.region, &settings.country);
        Self {
            site,
            settings,
            provenance,
            renderer,
            fetcher,
            collaborators,
        }
    }

    /// Runs one complete crawl.
    ///
    /// # Errors
    ///
    /// Region registration, seed lookup and export failures end the run with
    /// an error. Per-listing failures and recheck lookup failures are logged
    /// and counted, never fatal. State updates still run when the export
    /// fails; the export error is returned afterwards.
    pub async fn run(&self) -> Result<RunSummary, ScraperError> {
        let region = self.settings.region.as_str();
        let country = self.settings.country.as_str();
        tracing::info!(spider = %self.site.spider_name, region, country, "crawl starting");

        self.collaborators.regions.register(region, country).await?;

        let seeds = self
            .collaborators
            .seeds
            .seeds(&self.site.search_template)
            .await?;
        let seeds_total = seeds.len();
        let accepted: Vec<Seed> = seeds
            .into_iter()
            .filter(|s| s.applies_to(region, country))
            .collect();
        tracing::info!(seeds_total, accepted = accepted.len(), "seeds loaded");

        let crawl_date = Local::now().date_naive();
        let state = RunState::new();
        let mut listing_urls = 0;

        for seed in &accepted {
            let urls = self.discover(seed).await;
            tracing::info!(keyword = %seed.keyword, urls = urls.len(), "search page enumerated");
            listing_urls += urls.len();

            let tag = seed.tag();
            let jobs = urls.into_iter().map(|url| DetailJob {
                url,
                origin: RequestOrigin::Search(tag.clone()),
            });
            self.process(jobs, &state, crawl_date).await;
            let collected = state.listing_count().await;
            tracing::info!(keyword = %seed.keyword, collected, "seed finished");
        }

        match self
            .collaborators
            .rechecks
            .missing_seller_urls(&self.site.domain)
            .await
        {
            Ok(urls) => {
                tracing::info!(count = urls.len(), "rechecking listings without seller");
                let jobs = urls.into_iter().map(|url| DetailJob {
                    url,
                    origin: RequestOrigin::MissingSeller,
                });
                self.process(jobs, &state, crawl_date).await;
            }
            Err(e) => tracing::warn!(error = %e, "missing-seller lookup failed; skipping recheck"),
        }

        match self
            .collaborators
            .rechecks
            .taken_down_adverts(&self.site.domain)
            .await
        {
            Ok(adverts) => {
                tracing::info!(count = adverts.len(), "rechecking taken-down listings");
                let jobs = adverts.into_iter().map(|advert| DetailJob {
                    url: advert.url.clone(),
                    origin: RequestOrigin::TakenDown(advert),
                });
                self.process(jobs, &state, crawl_date).await;
            }
            Err(e) => tracing::warn!(error = %e, "taken-down lookup failed; skipping recheck"),
        }

        let mut summary = self.shutdown(state).await?;
        summary.seeds_total = seeds_total;
        summary.seeds_accepted = accepted.len();
        summary.listing_urls = listing_urls;
        tracing::info!(
            listings = summary.listings_exported,
            failures = summary.failures,
            taken_down_live = summary.taken_down_live,
            sellers_resolved = summary.sellers_resolved,
            "crawl finished"
        );
        Ok(summary)
    }

    /// Renders a seed's search page and returns its listing URLs. Any browser
    /// failure yields no URLs. The session is closed on every path.
    async fn discover(&self, seed: &Seed) -> Vec<String> {
        let mut session = match self.renderer.open(&seed.target_url).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, url = %seed.target_url, "could not open search page");
                return Vec::new();
            }
        };

        let links = self.enumerate(&mut session, &seed.target_url).await;

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, url = %seed.target_url, "closing render session failed");
        }

        links.unwrap_or_else(|e| {
            tracing::warn!(error = %e, url = %seed.target_url, "search page failed");
            Vec::new()
        })
    }

    async fn enumerate(
        &self,
        session: &mut R::Session,
        url: &str,
    ) -> Result<Vec<String>, ScraperError> {
        let selectors = &self.site.selectors;
        if !session
            .wait_for(&selectors.card, self.settings.ready_timeout)
            .await?
        {
            tracing::warn!(
                url,
                timeout_secs = self.settings.ready_timeout.as_secs(),
                "no listing cards appeared; treating as no results"
            );
            return Ok(Vec::new());
        }

        let outcome = converge(session, &selectors.card, &self.settings.scroll).await;
        tracing::debug!(
            url,
            iterations = outcome.iterations,
            cards = outcome.last_count,
            stop = ?outcome.stop,
            "scroll converged"
        );

        let html = session.page_html().await?;
        Ok(listing_links(&html, selectors, &self.site.base_url)?)
    }

    async fn process<I>(&self, jobs: I, state: &RunState, crawl_date: NaiveDate)
    where
        I: Iterator<Item = DetailJob>,
    {
        let limit = self.settings.max_concurrent_requests.max(1);
        futures::stream::iter(jobs)
            .for_each_concurrent(limit, |job| self.process_job(job, state, crawl_date))
            .await;
    }

    async fn process_job(&self, job: DetailJob, state: &RunState, crawl_date: NaiveDate) {
        let page = match self.fetcher.fetch(&job.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, url = %job.url, "detail fetch failed");
                state.record_failure(&job.url, e.to_string()).await;
                return;
            }
        };
        let selectors = &self.site.selectors;

        match job.origin {
            RequestOrigin::Search(tag) => {
                if !page.is_success() {
                    let e = ScraperError::UnexpectedStatus {
                        status: page.status,
                        url: job.url.clone(),
                    };
                    tracing::warn!(error = %e, "listing page not available");
                    state.record_failure(&job.url, e.to_string()).await;
                    return;
                }
                let context = ListingContext {
                    provenance: self.provenance.clone(),
                    tag,
                    created_at: crawl_date,
                    url: job.url.clone(),
                };
                match extract_listing(&page.body, &context, selectors) {
                    Ok(listing) => state.push_listing(listing).await,
                    Err(e) => {
                        tracing::warn!(error = %e, url = %job.url, "skipping listing");
                        state.record_failure(&job.url, e.to_string()).await;
                    }
                }
            }
            RequestOrigin::MissingSeller => {
                if !page.is_success() {
                    tracing::debug!(url = %job.url, status = page.status, "missing-seller listing unavailable");
                    return;
                }
                match extract_seller_name(&page.body, selectors) {
                    Ok(Some(seller)) => {
                        state
                            .push_missing_seller(MissingSellerRef {
                                url: job.url,
                                seller,
                            })
                            .await;
                    }
                    Ok(None) => tracing::debug!(url = %job.url, "seller still not shown"),
                    Err(e) => {
                        tracing::warn!(error = %e, url = %job.url, "seller extraction failed");
                        state.record_failure(&job.url, e.to_string()).await;
                    }
                }
            }
            RequestOrigin::TakenDown(advert) => {
                if !page.is_success() {
                    tracing::debug!(url = %job.url, status = page.status, "listing still down");
                    return;
                }
                match extract_fields(&page.body, selectors) {
                    Ok(fields) if !fields.title.is_empty() => {
                        tracing::info!(advert_id = advert.advert_id, url = %job.url, "taken-down listing is live");
                        state.push_taken_down(advert).await;
                    }
                    Ok(_) => tracing::debug!(url = %job.url, "no listing on page; still down"),
                    Err(e) => {
                        tracing::warn!(error = %e, url = %job.url, "taken-down recheck extraction failed");
                        state.record_failure(&job.url, e.to_string()).await;
                    }
                }
            }
        }
    }

    async fn shutdown(&self, state: RunState) -> Result<RunSummary, ScraperError> {
        let acc = state.into_inner();
        let key = ExportKey {
            spider_name: self.site.spider_name.clone(),
            region: self.settings.region.clone(),
            country: self.settings.country.clone(),
            domain: self.site.domain.clone(),
            seller: self.site.seller.clone(),
        };
        let listings_collected = acc.listings.len();

        let exported = finalize(
            acc.listings,
            &self.settings.output_dir,
            &self.site.file_prefix,
            Local::now().naive_local(),
            &key,
            self.collaborators.export.as_ref(),
        )
        .await;
        if let Err(e) = &exported {
            tracing::error!(error = %e, "export failed");
        }

        if !acc.taken_down.is_empty() {
            if let Err(e) = self
                .collaborators
                .state
                .update_last_seen(&acc.taken_down)
                .await
            {
                tracing::warn!(error = %e, count = acc.taken_down.len(), "last-seen update failed");
            }
        }
        if !acc.missing_seller.is_empty() {
            if let Err(e) = self
                .collaborators
                .state
                .update_sellers(&acc.missing_seller)
                .await
            {
                tracing::warn!(error = %e, count = acc.missing_seller.len(), "seller update failed");
            }
        }

        let report = exported?;
        Ok(RunSummary {
            listings_collected,
            listings_exported: report.unique,
            failures: acc.failures.len(),
            taken_down_live: acc.taken_down.len(),
            sellers_resolved: acc.missing_seller.len(),
            output_file: report.file,
            ..RunSummary::default()
        })
    }
}
