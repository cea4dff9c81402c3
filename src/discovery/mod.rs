//! Finding a document through web search and accepting it by content.
//!
//! Discovery runs a search (retrying with backoff), turns the results into
//! [`CandidateDocument`]s, then walks them in order: direct file links are
//! fetched as-is, HTML pages are loaded and scanned for embedded file
//! links. The first file that passes [`DocumentVerifier`] wins.

mod search;
mod verify;

pub use search::{
    create_search_engine, parse_engine_name, DuckDuckGo, Google, SearchEngine, SearchHit,
};
pub use verify::{DocumentVerifier, KeywordVerifier};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::models::{is_file_link, CandidateDocument, VerifiedDocument};
use crate::scrapers::error::{Outcome, Result};
use crate::scrapers::TaskContext;
use crate::utils::parse_selector;

/// Search-then-verify document lookup.
pub struct DocumentDiscovery {
    engine: Arc<dyn SearchEngine>,
    /// Target file extension, without the dot.
    extension: String,
    wait_timeout: Duration,
    backoff: Duration,
}

impl DocumentDiscovery {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        extension: &str,
        wait_timeout: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            engine,
            extension: extension.trim_start_matches('.').to_lowercase(),
            wait_timeout,
            backoff,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            create_search_engine(settings.search.engine),
            &settings.verification.extension,
            settings.browser.action_timeout(),
            settings.search.backoff(),
        )
    }

    pub fn engine(&self) -> &dyn SearchEngine {
        self.engine.as_ref()
    }

    /// Run `query`, making up to `retries` attempts in total.
    ///
    /// An attempt fails on navigation error, timeout or when it yields no
    /// candidates; each failed attempt is captured as a debug artifact, and
    /// once more when every attempt failed.
    pub async fn search(
        &self,
        ctx: &TaskContext<'_>,
        query: &str,
        max_results: usize,
        retries: usize,
    ) -> Result<Outcome<Vec<CandidateDocument>>> {
        let url = self.engine.search_url(query, max_results);
        let attempts = retries.max(1);

        for attempt in 1..=attempts {
            info!(
                "Searching {} for '{}' (attempt {}/{})",
                self.engine.name(),
                query,
                attempt,
                attempts
            );
            let label = match self.attempt(ctx, &url, max_results).await {
                Ok(candidates) if !candidates.is_empty() => {
                    info!("Found {} candidates", candidates.len());
                    return Ok(Outcome::Found(candidates));
                }
                Ok(_) => {
                    warn!("Search attempt {} returned no candidates", attempt);
                    format!("search_empty{}", attempt)
                }
                Err(e) if e.is_timeout() => {
                    warn!("Search attempt {} timed out: {}", attempt, e);
                    format!("search_timeout{}", attempt)
                }
                Err(e) => {
                    warn!("Search attempt {} failed: {}", attempt, e);
                    format!("search_error{}", attempt)
                }
            };
            ctx.debug.capture(ctx.page, &label).await;

            if attempt < attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        warn!("Search for '{}' failed after {} attempts", query, attempts);
        ctx.debug.capture(ctx.page, "search_final_failure").await;
        Ok(Outcome::Empty)
    }

    async fn attempt(
        &self,
        ctx: &TaskContext<'_>,
        url: &str,
        max_results: usize,
    ) -> Result<Vec<CandidateDocument>> {
        ctx.page.goto(url).await?;
        ctx.page
            .wait_for(self.engine.results_ready(), self.wait_timeout)
            .await?;
        let html = ctx.page.content().await?;
        collect_candidates(self.engine.as_ref(), &html, max_results, &self.extension)
    }

    /// Walk `candidates` in order and return the first verified file.
    pub async fn resolve(
        &self,
        ctx: &TaskContext<'_>,
        candidates: &[CandidateDocument],
        verifier: &DocumentVerifier,
    ) -> Result<Outcome<VerifiedDocument>> {
        for (idx, candidate) in candidates.iter().enumerate() {
            debug!("Candidate {}: {} ({})", idx, candidate.title, candidate.url);

            if candidate.is_direct_file {
                let accepted = self
                    .try_file(ctx, idx, &candidate.url, &candidate.url, verifier)
                    .await;
                if let Some(doc) = accepted {
                    return Ok(Outcome::Found(doc));
                }
                continue;
            }

            let links = match self.embedded_links(ctx, &candidate.url).await {
                Ok(links) => links,
                Err(e) => {
                    warn!("Could not load candidate page {}: {}", candidate.url, e);
                    ctx.debug.capture(ctx.page, &format!("load_{}", idx)).await;
                    continue;
                }
            };
            info!("{} embedded file links on {}", links.len(), candidate.url);

            for link in links {
                if let Some(doc) = self.try_file(ctx, idx, &candidate.url, &link, verifier).await {
                    return Ok(Outcome::Found(doc));
                }
            }
        }

        info!("No candidate passed verification");
        Ok(Outcome::Empty)
    }

    /// Fetch and verify one file. Failures reject the file.
    async fn try_file(
        &self,
        ctx: &TaskContext<'_>,
        idx: usize,
        candidate_url: &str,
        file_url: &str,
        verifier: &DocumentVerifier,
    ) -> Option<VerifiedDocument> {
        let file = match ctx.fetcher.fetch(file_url).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Fetching {} failed: {}", file_url, e);
                ctx.debug.capture(ctx.page, &format!("pdf_{}", idx)).await;
                return None;
            }
        };
        let keyword_matches = verifier.verify(file_url, &file.bytes).await?;
        Some(VerifiedDocument {
            candidate_url: candidate_url.to_string(),
            file_url: file_url.to_string(),
            bytes: file.bytes,
            keyword_matches,
        })
    }

    /// Load an HTML candidate and list its file links, absolute and deduplicated.
    async fn embedded_links(&self, ctx: &TaskContext<'_>, page_url: &str) -> Result<Vec<String>> {
        ctx.page.goto(page_url).await?;
        let html = ctx.page.content().await?;
        let base = ctx.page.current_url().await.unwrap_or_else(|_| page_url.to_string());
        file_links(&html, &base, &self.extension)
    }

    /// Search for `query` and resolve the results.
    pub async fn find_document(
        &self,
        ctx: &TaskContext<'_>,
        query: &str,
        max_results: usize,
        retries: usize,
        verifier: &DocumentVerifier,
    ) -> Result<Outcome<VerifiedDocument>> {
        match self.search(ctx, query, max_results, retries).await? {
            Outcome::Found(candidates) => self.resolve(ctx, &candidates, verifier).await,
            Outcome::Empty => Ok(Outcome::Empty),
        }
    }
}

/// Organic hits first, then bare file URLs scanned from the markup when
/// fewer than `max_results` hits were found. Deduplicated by URL.
fn collect_candidates(
    engine: &dyn SearchEngine,
    html: &str,
    max_results: usize,
    extension: &str,
) -> Result<Vec<CandidateDocument>> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for hit in engine.parse_results(html)? {
        if candidates.len() >= max_results {
            break;
        }
        if seen.insert(hit.url.clone()) {
            candidates.push(CandidateDocument::new(hit.title, hit.url, extension));
        }
    }

    if candidates.len() < max_results {
        let pattern = format!(r#"(?i)https?://[^\s"'<>]+\.{}"#, regex::escape(extension));
        if let Ok(re) = Regex::new(&pattern) {
            for m in re.find_iter(html) {
                if candidates.len() >= max_results {
                    break;
                }
                let url = m.as_str().to_string();
                if seen.insert(url.clone()) {
                    debug!("Markup scan found {}", url);
                    candidates.push(CandidateDocument::from_url(url, extension));
                }
            }
        }
    }

    Ok(candidates)
}

/// Every `a[href]` on the page that points at a file of `extension`.
fn file_links(html: &str, base: &str, extension: &str) -> Result<Vec<String>> {
    let anchors = parse_selector("a[href]")?;
    let base = Url::parse(base).ok();
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&anchors) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let absolute = match base.as_ref().and_then(|b| b.join(href.trim()).ok()) {
            Some(url) => url.to_string(),
            None => href.trim().to_string(),
        };
        if is_file_link(&absolute, extension) && seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    Ok(links)
}
