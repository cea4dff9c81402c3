//! The page-interaction protocol every scraper is written against.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::cookies::BrowserCookie;
use crate::scrapers::error::{Result, ScrapeError};

/// How often waits re-check the page.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One browser tab, addressed by CSS selectors.
///
/// Selector-taking methods act on the first match. Every call is a
/// suspension point; callers never issue two actions against the same page
/// concurrently.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Full current markup.
    async fn content(&self) -> Result<String>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Whether any match is rendered: not `display:none`, not
    /// `visibility:hidden`, and not inside a hidden ancestor.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Click the first match; `ElementMissing` if there is none.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first match whose text contains `text`.
    async fn click_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn scroll_into_view(&self, selector: &str) -> Result<()>;

    /// Choose `value` in a `<select>` and fire its change event.
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// Type into an input one key at a time.
    async fn type_text(&self, selector: &str, text: &str, per_key_delay: Duration) -> Result<()>;

    /// Attribute of the first match; `None` if absent (or no match).
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    async fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    /// Full-page PNG.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    /// Headers sent with every request of the session.
    async fn extra_headers(&self) -> HashMap<String, String>;

    async fn set_extra_headers(&self, headers: HashMap<String, String>) -> Result<()>;

    /// Wait until `selector` matches.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.wait_for_any(&[selector], timeout).await.map(|_| ())
    }

    /// Wait until any selector matches; returns the index of the first that
    /// did. Selectors are checked in order on each poll.
    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            for (i, selector) in selectors.iter().enumerate() {
                if self.exists(selector).await? {
                    return Ok(i);
                }
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::timeout(selectors.join(" | "), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until `ready` matches (`0`) or `marker` is visible (`1`).
    ///
    /// Pages often ship their empty-state marker hidden while content is
    /// still loading, so mere presence of `marker` does not count.
    async fn wait_for_ready_or_visible(
        &self,
        ready: &str,
        marker: &str,
        timeout: Duration,
    ) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(ready).await? {
                return Ok(0);
            }
            if self.is_visible(marker).await? {
                return Ok(1);
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::timeout(
                    format!("{} | visible {}", ready, marker),
                    timeout,
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until `selector` no longer matches.
    async fn wait_for_detached(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.exists(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::timeout(
                    format!("{} to detach", selector),
                    timeout,
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
