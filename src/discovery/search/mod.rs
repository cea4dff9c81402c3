//! Web search engines that feed document discovery.
//!
//! Each engine knows how to build a results URL for a query, which element
//! marks its results as rendered, and how to read organic hits out of the
//! results markup.

mod duckduckgo;
mod google;

pub use duckduckgo::DuckDuckGo;
pub use google::Google;

use std::sync::Arc;

use crate::config::SearchEngineKind;
use crate::scrapers::error::Result;

/// An organic search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// A search engine driven through a browser page.
pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Results page for `query`, asking for about `max_results` hits.
    fn search_url(&self, query: &str, max_results: usize) -> String;

    /// Present once results have rendered.
    fn results_ready(&self) -> &'static str;

    /// Organic hits in page order. Only absolute http(s) URLs are returned.
    fn parse_results(&self, html: &str) -> Result<Vec<SearchHit>>;
}

/// Create the engine selected in config.
pub fn create_search_engine(kind: SearchEngineKind) -> Arc<dyn SearchEngine> {
    match kind {
        SearchEngineKind::Google => Arc::new(Google),
        SearchEngineKind::DuckDuckGo => Arc::new(DuckDuckGo),
    }
}

/// Parse an engine name as given on the command line.
pub fn parse_engine_name(name: &str) -> std::result::Result<SearchEngineKind, String> {
    match name.trim().to_lowercase().as_str() {
        "google" => Ok(SearchEngineKind::Google),
        "duckduckgo" | "ddg" => Ok(SearchEngineKind::DuckDuckGo),
        other => Err(format!(
            "Unknown search engine: {}. Available: google, duckduckgo",
            other
        )),
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
