//! The interface every site operation implements.

use std::time::Duration;

use async_trait::async_trait;

use super::browser::PageDriver;
use super::consent::ConsentHandler;
use super::debug_capture::DebugCapture;
use super::error::{Outcome, Result, ScrapeError};
use super::http_client::FileFetcher;
use super::pagination::Pagination;
use crate::config::{Settings, SiteConfig};
use crate::models::{ScrapeTask, TaskKind};
use crate::services::output::{OutputWriter, TaskReport};

/// What a running task may touch: its session's page and fetcher, the
/// immutable settings and its output destination.
pub struct TaskContext<'a> {
    pub page: &'a dyn PageDriver,
    pub fetcher: &'a dyn FileFetcher,
    pub settings: &'a Settings,
    pub debug: &'a DebugCapture,
    pub output: &'a OutputWriter,
}

impl TaskContext<'_> {
    pub fn action_timeout(&self) -> Duration {
        self.settings.browser.action_timeout()
    }

    pub fn consent(&self, selector: &str) -> ConsentHandler {
        ConsentHandler::new(selector, self.settings.browser.settle(), self.action_timeout())
    }

    /// Paged-table walker with the configured settle delay and page cap.
    pub fn pagination(&self, container: &str, rows: &str, next: &str) -> Pagination {
        Pagination::new(container, rows, next)
            .configured(&self.settings.pagination, self.action_timeout())
    }

    /// Same as `pagination`, choosing the configured page size first.
    pub fn sized_pagination(
        &self,
        container: &str,
        rows: &str,
        next: &str,
        page_size_select: &str,
    ) -> Pagination {
        self.pagination(container, rows, next)
            .with_page_size(page_size_select, &self.settings.pagination.page_size)
    }
}

/// One site operation.
#[async_trait]
pub trait ScraperTask: Send + Sync {
    fn kind(&self) -> TaskKind;

    /// Cookies and headers to seed the session with.
    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig>;

    /// URL the session lands on.
    fn build_target(&self, settings: &Settings, key: &str) -> Result<String>;

    /// Overlay to dismiss right after landing.
    fn consent_selector(&self) -> Option<&'static str> {
        None
    }

    /// Land on `target` and clear the overlay.
    async fn open_target(&self, ctx: &TaskContext<'_>, target: &str) -> Result<()> {
        ctx.page.goto(target).await?;
        if let Some(selector) = self.consent_selector() {
            ctx.consent(selector).maybe_dismiss(ctx.page).await;
        }
        Ok(())
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>>;
}

/// Reject blank keys and keys that would break out of a URL.
pub fn require_key<'k>(kind: TaskKind, key: &'k str) -> Result<&'k str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ScrapeError::InvalidParams(format!(
            "{} requires a {}",
            kind,
            kind.key_name()
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&')) {
        return Err(ScrapeError::InvalidParams(format!(
            "'{}' is not a valid {}",
            key,
            kind.key_name()
        )));
    }
    Ok(key)
}
