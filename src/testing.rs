//! Scripted stand-ins for a browser page, an HTTP client and a session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::Settings;
use crate::ocr::{ExtractionError, TextExtraction};
use crate::scrapers::browser::{BrowserCookie, PageDriver, Session, SessionConfig, SessionLauncher};
use crate::scrapers::error::{Result, ScrapeError};
use crate::scrapers::http_client::{FetchedFile, FileFetcher};

/// Settings with every delay zeroed and short waits.
pub fn fast_settings(root: &std::path::Path) -> Settings {
    let mut settings = Settings::with_dirs(root.join("out"), root.join("debug"));
    settings.browser.action_timeout_secs = 1;
    settings.browser.navigation_timeout_secs = 1;
    settings.browser.settle_ms = 0;
    settings.pagination.settle_ms = 0;
    settings.search.backoff_ms = 0;
    settings.politeness_delay = Duration::ZERO;
    settings
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Result<Option<scraper::ElementRef<'a>>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ScrapeError::Config(format!("invalid selector {}: {:?}", selector, e)))?;
    Ok(doc.select(&parsed).next())
}

fn is_hidden(el: scraper::ElementRef<'_>) -> bool {
    if el.value().attr("hidden").is_some() {
        return true;
    }
    let style: String = el
        .value()
        .attr("style")
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    style.contains("display:none") || style.contains("visibility:hidden")
}

#[derive(Default)]
struct PageState {
    states: Vec<String>,
    current: usize,
    /// (state, selector) -> next state.
    transitions: HashMap<(usize, String), usize>,
    /// selector -> next state, from any state.
    any_transitions: HashMap<String, usize>,
    routes: HashMap<String, usize>,
    /// state -> (checks left, next state): the page re-renders on its own.
    renders: HashMap<usize, (usize, usize)>,
    url: String,
    goto_failures: usize,
    visited: Vec<String>,
    clicks: Vec<String>,
    selected: Vec<(String, String)>,
    typed: Vec<(String, String)>,
    headers: HashMap<String, String>,
    cookies: Vec<BrowserCookie>,
    no_screenshots: bool,
}

impl PageState {
    fn html(&self) -> &str {
        &self.states[self.current]
    }

    fn advance(&mut self, selector: &str) {
        let key = (self.current, selector.to_string());
        if let Some(&next) = self.transitions.get(&key) {
            self.current = next;
        } else if let Some(&next) = self.any_transitions.get(selector) {
            self.current = next;
        }
    }

    /// Count one element check; a pending render fires once its checks run out.
    fn tick(&mut self) {
        let Some(&(left, next)) = self.renders.get(&self.current) else {
            return;
        };
        if left == 0 {
            self.renders.remove(&self.current);
            self.current = next;
        } else {
            self.renders.insert(self.current, (left - 1, next));
        }
    }

    fn first_attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let doc = Html::parse_document(self.html());
        Ok(select_first(&doc, selector)?.and_then(|el| el.value().attr(name).map(String::from)))
    }

    /// A match counts as hidden when it or an ancestor carries an inline
    /// `display:none`, `visibility:hidden` or the `hidden` attribute.
    fn visible(&self, selector: &str) -> Result<bool> {
        let doc = Html::parse_document(self.html());
        let parsed = Selector::parse(selector)
            .map_err(|e| ScrapeError::Config(format!("invalid selector {}: {:?}", selector, e)))?;
        let any = doc.select(&parsed).any(|el| {
            std::iter::once(el)
                .chain(el.ancestors().filter_map(scraper::ElementRef::wrap))
                .all(|node| !is_hidden(node))
        });
        Ok(any)
    }

    fn has(&self, selector: &str) -> Result<bool> {
        let doc = Html::parse_document(self.html());
        Ok(select_first(&doc, selector)?.is_some())
    }
}

/// A page that moves through fixed HTML states as it is clicked.
pub struct ScriptedPage {
    state: Mutex<PageState>,
}

impl ScriptedPage {
    pub fn new(html: &str) -> Self {
        Self::with_states(vec![html.to_string()])
    }

    pub fn with_states(states: Vec<String>) -> Self {
        Self {
            state: Mutex::new(PageState {
                states,
                url: "about:blank".to_string(),
                ..Default::default()
            }),
        }
    }

    /// Clicking (or selecting/typing into) `selector` in state `from` moves to `to`.
    pub fn on_click(self, from: usize, selector: &str, to: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .transitions
            .insert((from, selector.to_string()), to);
        self
    }

    /// Like `on_click`, from whatever state the page is in.
    pub fn on_click_any(self, selector: &str, to: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .any_transitions
            .insert(selector.to_string(), to);
        self
    }

    /// After `checks` element checks in state `from`, the page moves to `to`
    /// by itself, as when content arrives late.
    pub fn renders_after(self, from: usize, checks: usize, to: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .renders
            .insert(from, (checks, to));
        self
    }

    /// Navigating to exactly `url` shows state `to`.
    pub fn route(self, url: &str, to: usize) -> Self {
        self.state.lock().unwrap().routes.insert(url.to_string(), to);
        self
    }

    /// The next `n` navigations fail.
    pub fn failing_goto(self, n: usize) -> Self {
        self.state.lock().unwrap().goto_failures = n;
        self
    }

    pub fn with_cookies(self, cookies: Vec<BrowserCookie>) -> Self {
        self.state.lock().unwrap().cookies = cookies;
        self
    }

    pub fn without_screenshots(self) -> Self {
        self.state.lock().unwrap().no_screenshots = true;
        self
    }

    pub fn clicks(&self, selector: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .clicks
            .iter()
            .filter(|s| *s == selector)
            .count()
    }

    pub fn total_clicks(&self) -> usize {
        self.state.lock().unwrap().clicks.len()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn selected(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().selected.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.state.lock().unwrap().headers.clone()
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.goto_failures > 0 {
            state.goto_failures -= 1;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        state.visited.push(url.to_string());
        state.url = url.to_string();
        if let Some(&to) = state.routes.get(url) {
            state.current = to;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().html().to_string())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.tick();
        state.has(selector)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.tick();
        state.visible(selector)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.has(selector)? {
            return Err(ScrapeError::ElementMissing(selector.to_string()));
        }
        state.clicks.push(selector.to_string());
        state.advance(selector);
        Ok(())
    }

    async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let found = {
            let doc = Html::parse_document(state.html());
            let parsed = Selector::parse(selector)
                .map_err(|e| ScrapeError::Config(format!("invalid selector {}: {:?}", selector, e)))?;
            let any = doc
                .select(&parsed)
                .any(|el| el.text().collect::<String>().contains(text));
            any
        };
        if !found {
            return Err(ScrapeError::ElementMissing(format!(
                "{} containing '{}'",
                selector, text
            )));
        }
        state.clicks.push(selector.to_string());
        state.advance(selector);
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.has(selector)? {
            Ok(())
        } else {
            Err(ScrapeError::ElementMissing(selector.to_string()))
        }
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.has(selector)? {
            return Err(ScrapeError::ElementMissing(selector.to_string()));
        }
        state
            .selected
            .push((selector.to_string(), value.to_string()));
        state.advance(selector);
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, _per_key_delay: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.has(selector)? {
            return Err(ScrapeError::ElementMissing(selector.to_string()));
        }
        state.typed.push((selector.to_string(), text.to_string()));
        state.advance(selector);
        Ok(())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.state.lock().unwrap().first_attr(selector, name)
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let doc = Html::parse_document(state.html());
        Ok(select_first(&doc, selector)?.map(|el| el.text().collect::<String>()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        if self.state.lock().unwrap().no_screenshots {
            return Err(ScrapeError::Browser("target closed".to_string()));
        }
        Ok(b"\x89PNG scripted".to_vec())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn extra_headers(&self) -> HashMap<String, String> {
        self.state.lock().unwrap().headers.clone()
    }

    async fn set_extra_headers(&self, headers: HashMap<String, String>) -> Result<()> {
        self.state.lock().unwrap().headers = headers;
        Ok(())
    }
}

/// Serves fixed bodies by URL and records every fetch.
#[derive(Default)]
pub struct RecordingFetcher {
    files: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), body.into());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl FileFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.files.get(url) {
            Some(bytes) => Ok(FetchedFile {
                url: url.to_string(),
                status: 200,
                content_type: Some("application/pdf".to_string()),
                bytes: bytes.clone(),
            }),
            None => Err(ScrapeError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Treats file bytes as UTF-8 text.
pub struct PlainText;

#[async_trait]
impl TextExtraction for PlainText {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    async fn extract(&self, bytes: &[u8]) -> std::result::Result<String, ExtractionError> {
        Ok(String::from_utf8_lossy(bytes).to_string())
    }
}

/// Hands out sessions over one shared scripted page and fetcher.
pub struct ScriptedLauncher {
    pub page: Arc<ScriptedPage>,
    pub fetcher: Arc<RecordingFetcher>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicBool>,
    pub last_config: Mutex<Option<SessionConfig>>,
}

impl ScriptedLauncher {
    pub fn new(page: ScriptedPage, fetcher: RecordingFetcher) -> Self {
        Self {
            page: Arc::new(page),
            fetcher: Arc::new(fetcher),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
            last_config: Mutex::new(None),
        }
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    page: Arc<ScriptedPage>,
    fetcher: Arc<RecordingFetcher>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Session for ScriptedSession {
    fn page(&self) -> &dyn PageDriver {
        &*self.page
    }

    fn fetcher(&self) -> &dyn FileFetcher {
        &*self.fetcher
    }

    async fn close(self: Box<Self>) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config);
        Ok(Box::new(ScriptedSession {
            page: self.page.clone(),
            fetcher: self.fetcher.clone(),
            closed: self.closed.clone(),
        }))
    }
}
