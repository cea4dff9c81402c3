//! Chromium sessions driven over the DevTools protocol (chromiumoxide).

use async_trait::async_trait;

use super::config::SessionConfig;
use super::session::{Session, SessionLauncher};
use crate::scrapers::error::Result;

#[cfg(feature = "browser")]
pub use enabled::{find_chrome, BrowserSession, ChromePage};

/// Launches local Chrome/Chromium, or connects to a remote DevTools endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

#[cfg(feature = "browser")]
#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>> {
        Ok(Box::new(BrowserSession::open(config).await?))
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn open(&self, _config: SessionConfig) -> Result<Box<dyn Session>> {
        Err(crate::scrapers::error::ScrapeError::Browser(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(feature = "browser")]
mod enabled {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::network::{
        CookieParam, Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
    };
    use chromiumoxide::page::ScreenshotParams;
    use chromiumoxide::{Browser, BrowserConfig, Element, Page};
    use futures::StreamExt;
    use tempfile::TempDir;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    use crate::scrapers::browser::config::SessionConfig;
    use crate::scrapers::browser::cookies::BrowserCookie;
    use crate::scrapers::browser::page::PageDriver;
    use crate::scrapers::browser::session::Session;
    use crate::scrapers::error::{Result, ScrapeError};
    use crate::scrapers::http_client::{FileFetcher, SessionHttpClient, SharedHeaders};

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Find Chrome executable.
    pub fn find_chrome() -> Result<PathBuf> {
        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(ScrapeError::Browser(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set browser.remote_url / MUNISCRAPE_CHROME_URL"
                .to_string(),
        ))
    }

    fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        })
    }

    /// A launched (or connected) browser with one page and its HTTP client.
    pub struct BrowserSession {
        browser: Browser,
        handler: JoinHandle<()>,
        page: ChromePage,
        http: SessionHttpClient,
        remote: bool,
        // Removed when the session is dropped.
        _profile: Option<TempDir>,
    }

    impl BrowserSession {
        pub async fn open(config: SessionConfig) -> Result<Self> {
            let (browser, handler, profile) = match config.remote_url.clone() {
                Some(url) => {
                    let (browser, handler) = connect_remote(&url, &config).await?;
                    (browser, handler, None)
                }
                None => {
                    let (browser, handler, profile) = launch(&config).await?;
                    (browser, handler, Some(profile))
                }
            };
            let remote = profile.is_none();

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    handler.abort();
                    return Err(ScrapeError::browser(e));
                }
            };

            let headers = SharedHeaders::default();
            let page = ChromePage {
                page,
                headers: headers.clone(),
                action_timeout: config.action_timeout,
                navigation_timeout: config.navigation_timeout,
            };
            let http = SessionHttpClient::new(
                &config.user_agent,
                config.navigation_timeout,
                config.proxy.as_deref(),
                headers,
            )?;

            let session = Self {
                browser,
                handler,
                page,
                http,
                remote,
                _profile: profile,
            };
            session.page.prepare(&config).await?;
            Ok(session)
        }
    }

    async fn launch(config: &SessionConfig) -> Result<(Browser, JoinHandle<()>, TempDir)> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = find_chrome()?;
        let profile = tempfile::Builder::new()
            .prefix("muniscrape-profile-")
            .tempdir()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .request_timeout(config.navigation_timeout);

        // Set headless mode (with_head means NOT headless, confusingly)
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {}", e)))?;

        Ok((browser, spawn_handler(handler), profile))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(
        url: &str,
        config: &SessionConfig,
    ) -> Result<(Browser, JoinHandle<()>)> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await?
            .json()
            .await?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScrapeError::Browser("No webSocketDebuggerUrl in response".to_string())
            })?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: config.navigation_timeout,
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| {
                ScrapeError::Browser(format!("Failed to connect to remote browser: {}", e))
            })?;

        Ok((browser, spawn_handler(handler)))
    }

    #[async_trait]
    impl Session for BrowserSession {
        fn page(&self) -> &dyn PageDriver {
            &self.page
        }

        fn fetcher(&self) -> &dyn FileFetcher {
            &self.http
        }

        async fn close(mut self: Box<Self>) {
            if let Err(e) = self.page.page.clone().close().await {
                debug!("Closing page failed: {}", e);
            }
            // A remote browser is shared; only our page is ours to close.
            if !self.remote {
                if let Err(e) = self.browser.close().await {
                    warn!("Closing browser failed: {}", e);
                }
                let _ = self.browser.wait().await;
            }
            self.handler.abort();
            debug!("Browser session closed");
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    /// One Chromium tab.
    #[derive(Clone)]
    pub struct ChromePage {
        page: Page,
        headers: SharedHeaders,
        action_timeout: Duration,
        navigation_timeout: Duration,
    }

    impl ChromePage {
        /// Apply user agent, seed cookies and extra headers before the first
        /// navigation.
        async fn prepare(&self, config: &SessionConfig) -> Result<()> {
            self.page
                .execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
                .await
                .map_err(ScrapeError::browser)?;

            let mut params = Vec::with_capacity(config.cookies.len());
            for cookie in &config.cookies {
                match CookieParam::builder()
                    .name(cookie.name.clone())
                    .value(cookie.value.clone())
                    .domain(cookie.domain.clone())
                    .path(cookie.path.clone())
                    .build()
                {
                    Ok(param) => params.push(param),
                    Err(e) => warn!("Failed to build cookie {}: {}", cookie.name, e),
                }
            }
            if !params.is_empty() {
                self.page
                    .set_cookies(params)
                    .await
                    .map_err(ScrapeError::browser)?;
            }

            if !config.extra_headers.is_empty() {
                self.set_extra_headers(config.extra_headers.clone()).await?;
            }
            Ok(())
        }

        async fn first(&self, selector: &str) -> Result<Option<Element>> {
            match self.page.find_elements(selector).await {
                Ok(mut elements) => Ok(if elements.is_empty() {
                    None
                } else {
                    Some(elements.swap_remove(0))
                }),
                Err(e) => {
                    // Transient while a navigation replaces the document.
                    debug!("Querying {} failed: {}", selector, e);
                    Ok(None)
                }
            }
        }

        async fn require(&self, selector: &str) -> Result<Element> {
            self.first(selector)
                .await?
                .ok_or_else(|| ScrapeError::ElementMissing(selector.to_string()))
        }

        async fn evaluate_bool(&self, script: String) -> Result<bool> {
            let result = tokio::time::timeout(self.action_timeout, self.page.evaluate(script))
                .await
                .map_err(|_| ScrapeError::timeout("script evaluation", self.action_timeout))?
                .map_err(ScrapeError::browser)?;
            result.into_value::<bool>().map_err(ScrapeError::browser)
        }
    }

    #[async_trait]
    impl PageDriver for ChromePage {
        async fn goto(&self, url: &str) -> Result<()> {
            info!("Navigating to {}", url);
            match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
                Err(_) => Err(ScrapeError::timeout(
                    format!("navigation to {}", url),
                    self.navigation_timeout,
                )),
            }
        }

        async fn current_url(&self) -> Result<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(ScrapeError::browser)?
                .unwrap_or_default())
        }

        async fn content(&self) -> Result<String> {
            self.page.content().await.map_err(ScrapeError::browser)
        }

        async fn exists(&self, selector: &str) -> Result<bool> {
            Ok(self.first(selector).await?.is_some())
        }

        async fn is_visible(&self, selector: &str) -> Result<bool> {
            let script = format!(
                r#"(() => {{
                    return Array.from(document.querySelectorAll({sel})).some(el => {{
                        const style = window.getComputedStyle(el);
                        return style.display !== 'none'
                            && style.visibility !== 'hidden'
                            && el.getClientRects().length > 0;
                    }});
                }})()"#,
                sel = serde_json::to_string(selector)?,
            );
            self.evaluate_bool(script).await
        }

        async fn click(&self, selector: &str) -> Result<()> {
            let element = self.require(selector).await?;
            tokio::time::timeout(self.action_timeout, element.click())
                .await
                .map_err(|_| ScrapeError::timeout(format!("click on {}", selector), self.action_timeout))?
                .map_err(ScrapeError::browser)?;
            Ok(())
        }

        async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
            let elements = self.page.find_elements(selector).await.unwrap_or_default();
            for element in elements {
                let label = element.inner_text().await.ok().flatten().unwrap_or_default();
                if label.contains(text) {
                    tokio::time::timeout(self.action_timeout, element.click())
                        .await
                        .map_err(|_| {
                            ScrapeError::timeout(format!("click on {}", selector), self.action_timeout)
                        })?
                        .map_err(ScrapeError::browser)?;
                    return Ok(());
                }
            }
            Err(ScrapeError::ElementMissing(format!(
                "{} containing '{}'",
                selector, text
            )))
        }

        async fn scroll_into_view(&self, selector: &str) -> Result<()> {
            let element = self.require(selector).await?;
            element
                .scroll_into_view()
                .await
                .map_err(ScrapeError::browser)?;
            Ok(())
        }

        async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
            let script = format!(
                r#"(() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    el.value = {val};
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()"#,
                sel = serde_json::to_string(selector)?,
                val = serde_json::to_string(value)?,
            );
            if self.evaluate_bool(script).await? {
                Ok(())
            } else {
                Err(ScrapeError::ElementMissing(selector.to_string()))
            }
        }

        async fn type_text(
            &self,
            selector: &str,
            text: &str,
            per_key_delay: Duration,
        ) -> Result<()> {
            let element = self.require(selector).await?;
            element.click().await.map_err(ScrapeError::browser)?;
            for ch in text.chars() {
                element
                    .type_str(ch.to_string())
                    .await
                    .map_err(ScrapeError::browser)?;
                tokio::time::sleep(per_key_delay).await;
            }
            Ok(())
        }

        async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
            match self.first(selector).await? {
                Some(element) => element.attribute(name).await.map_err(ScrapeError::browser),
                None => Ok(None),
            }
        }

        async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
            match self.first(selector).await? {
                Some(element) => element.inner_text().await.map_err(ScrapeError::browser),
                None => Ok(None),
            }
        }

        async fn screenshot(&self) -> Result<Vec<u8>> {
            self.page
                .screenshot(ScreenshotParams::builder().full_page(true).build())
                .await
                .map_err(ScrapeError::browser)
        }

        async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
            let cookies = self.page.get_cookies().await.map_err(ScrapeError::browser)?;
            debug!("Got {} cookies from browser", cookies.len());
            Ok(cookies
                .iter()
                .map(|c| BrowserCookie {
                    name: c.name.clone(),
                    value: c.value.clone(),
                    domain: c.domain.clone(),
                    path: c.path.clone(),
                    secure: c.secure,
                    http_only: c.http_only,
                })
                .collect())
        }

        async fn extra_headers(&self) -> HashMap<String, String> {
            self.headers.snapshot()
        }

        async fn set_extra_headers(&self, headers: HashMap<String, String>) -> Result<()> {
            let value = serde_json::to_value(&headers)?;
            self.page
                .execute(SetExtraHttpHeadersParams::new(Headers::new(value)))
                .await
                .map_err(ScrapeError::browser)?;
            self.headers.replace(headers);
            Ok(())
        }
    }
}
