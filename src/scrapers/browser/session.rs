//! Scoped ownership of a browser session.

use async_trait::async_trait;

use super::config::SessionConfig;
use super::page::PageDriver;
use crate::scrapers::error::Result;
use crate::scrapers::http_client::FileFetcher;

/// One isolated browsing context: a page plus an HTTP client sharing its
/// cookies and headers. Owned by exactly one task.
#[async_trait]
pub trait Session: Send + Sync {
    fn page(&self) -> &dyn PageDriver;

    fn fetcher(&self) -> &dyn FileFetcher;

    /// Release the page, context and browser. Never fails; problems are logged.
    async fn close(self: Box<Self>);
}

/// Opens sessions. Launch failures propagate to the caller unretried.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>>;
}
