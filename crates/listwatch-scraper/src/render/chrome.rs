//! chromiumoxide-backed render driver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{RenderSession, Renderer};
use crate::error::ScraperError;

/// Common Chrome executable locations, checked when no path is configured.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";
const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Explicit executable; falls back to [`CHROME_PATHS`], then to
    /// chromiumoxide's own lookup.
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    /// Timeout for individual CDP requests.
    pub request_timeout: Duration,
}

fn cdp_error(context: &'static str) -> impl FnOnce(CdpError) -> ScraperError {
    move |e| ScraperError::Browser {
        context,
        reason: e.to_string(),
    }
}

fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    CHROME_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Launches one headless, sandbox-free, incognito browser per session.
pub struct ChromeRenderer {
    config: ChromeConfig,
}

impl ChromeRenderer {
    #[must_use]
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .incognito()
            .request_timeout(self.config.request_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--user-agent={}", self.config.user_agent));

        if let Some(path) = find_chrome(self.config.executable.as_deref()) {
            tracing::debug!(path = %path.display(), "using chrome executable");
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(|reason| ScraperError::Browser {
            context: "building browser config",
            reason,
        })
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    type Session = ChromeSession;

    async fn open(&self, url: &str) -> Result<ChromeSession, ScraperError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(cdp_error("launching browser"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromeSession {
            browser,
            page: None,
            handler,
            closed: false,
        };

        match session.browser.new_page(url).await {
            Ok(page) => {
                session.page = Some(page);
                Ok(session)
            }
            Err(e) => {
                // Never hand back a half-open session; the caller has nothing to close.
                if let Err(close_err) = session.close().await {
                    tracing::warn!(error = %close_err, "failed to close browser after navigation error");
                }
                Err(cdp_error("opening page")(e))
            }
        }
    }
}

pub struct ChromeSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    closed: bool,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, ScraperError> {
        self.page.as_ref().ok_or(ScraperError::Browser {
            context: "using page",
            reason: "session already closed".to_owned(),
        })
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, ScraperError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match tokio::time::timeout(remaining, page.find_element(selector)).await {
                Ok(Ok(_)) => return Ok(true),
                Ok(Err(_)) => {}
                Err(_) => return Ok(false),
            }
            tokio::time::sleep(READY_POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScraperError> {
        self.page()?
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(cdp_error("scrolling"))?;
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, ScraperError> {
        let result = self
            .page()?
            .evaluate(HEIGHT_SCRIPT)
            .await
            .map_err(cdp_error("reading document height"))?;
        result
            .into_value::<u64>()
            .map_err(|e| ScraperError::Browser {
                context: "reading document height",
                reason: e.to_string(),
            })
    }

    async fn count_matches(&mut self, selector: &str) -> Result<usize, ScraperError> {
        // JSON string syntax is valid JS string syntax, which keeps quotes
        // inside the selector from breaking the expression.
        let literal = serde_json::to_string(selector).map_err(|e| ScraperError::Browser {
            context: "encoding selector",
            reason: e.to_string(),
        })?;
        let script = format!("document.querySelectorAll({literal}).length");
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(cdp_error("counting elements"))?;
        result
            .into_value::<usize>()
            .map_err(|e| ScraperError::Browser {
                context: "counting elements",
                reason: e.to_string(),
            })
    }

    async fn page_html(&mut self) -> Result<String, ScraperError> {
        self.page()?
            .content()
            .await
            .map_err(cdp_error("reading page content"))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "page close failed; closing browser anyway");
            }
        }
        let closed = self
            .browser
            .close()
            .await
            .map_err(cdp_error("closing browser"));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit failed");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed {
            // chromiumoxide kills the child process when `Browser` drops; the
            // handler task has to go too or it spins on a dead socket.
            tracing::warn!("render session dropped without close()");
            self.handler.abort();
        }
    }
}
