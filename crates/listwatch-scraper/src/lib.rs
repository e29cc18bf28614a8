pub mod client;
pub mod collaborators;
pub mod error;
pub mod export;
pub mod extract;
pub mod orchestrator;
pub mod render;
pub mod run_state;
pub mod scroll;
pub mod throttle;

mod rate_limit;

pub use client::{FetchSettings, FetchedPage, HttpFetcher, PageFetcher};
pub use collaborators::{
    Collaborators, ExportKey, ExportSink, RecheckSource, RegionDirectory, SeedProvider,
    StateUpdater,
};
pub use error::ScraperError;
pub use export::{dedup_listings, finalize, output_filename, write_csv, ExportReport};
pub use extract::{
    extract_fields, extract_listing, extract_seller_name, listing_links, ExtractError,
    ListingContext,
};
pub use orchestrator::{CrawlSettings, Orchestrator, RunSummary};
pub use render::{ChromeConfig, ChromeRenderer, RenderSession, Renderer};
pub use run_state::{Accumulated, FetchFailure, RunState};
pub use scroll::{converge, ScrollLimits, ScrollOutcome, StopReason};
pub use throttle::{AutoThrottle, ThrottleConfig};
