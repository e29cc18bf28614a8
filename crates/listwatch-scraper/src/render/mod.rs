//! Headless rendering of client-side search pages.
//!
//! [`Renderer`] opens one [`RenderSession`] per search page. Callers must
//! `close()` every session they open, on every path; the chromiumoxide
//! implementation also tears the browser down on drop as a backstop.

mod chrome;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

pub use chrome::{ChromeConfig, ChromeRenderer, ChromeSession};

#[async_trait]
pub trait Renderer: Send + Sync {
    type Session: RenderSession;

    /// Loads `url` in a fresh session.
    async fn open(&self, url: &str) -> Result<Self::Session, ScraperError>;
}

#[async_trait]
pub trait RenderSession: Send {
    /// Resolves `true` once `selector` matches, `false` if `timeout` passes first.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, ScraperError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), ScraperError>;

    /// Current `document.body.scrollHeight`.
    async fn document_height(&mut self) -> Result<u64, ScraperError>;

    /// Number of elements currently matching `selector`.
    async fn count_matches(&mut self, selector: &str) -> Result<usize, ScraperError>;

    /// Serialized DOM as it stands now.
    async fn page_html(&mut self) -> Result<String, ScraperError>;

    /// Releases the page and browser. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), ScraperError>;
}
