//! Per-session browser configuration.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use super::cookies::{cookies_from_header, BrowserCookie};
use crate::config::{BrowserConfig, SiteConfig};

/// Everything needed to open one isolated browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub user_agent: String,
    /// Cookies set before the first navigation.
    pub cookies: Vec<BrowserCookie>,
    /// Headers sent with every request of the session.
    pub extra_headers: HashMap<String, String>,
    pub action_timeout: Duration,
    pub navigation_timeout: Duration,
    pub chrome_args: Vec<String>,
    /// Remote Chrome DevTools URL; connect instead of launching when set.
    pub remote_url: Option<String>,
    pub proxy: Option<String>,
}

impl SessionConfig {
    pub fn new(browser: &BrowserConfig, user_agent: String) -> Self {
        Self {
            headless: browser.headless,
            user_agent,
            cookies: Vec::new(),
            extra_headers: HashMap::new(),
            action_timeout: browser.action_timeout(),
            navigation_timeout: browser.navigation_timeout(),
            chrome_args: browser.chrome_args.clone(),
            remote_url: browser.remote_url.clone(),
            proxy: browser.proxy.clone(),
        }
    }

    /// Seed cookies and headers configured for the site rooted at `base_url`.
    pub fn with_site(mut self, site: &SiteConfig, base_url: &str) -> Self {
        if let Some(ref header) = site.cookies {
            let domain = Url::parse(base_url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
                .unwrap_or_default();
            self.cookies.extend(cookies_from_header(header, &domain));
            self.extra_headers
                .insert("Cookie".to_string(), header.trim().to_string());
        }
        self.extra_headers
            .extend(site.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}
