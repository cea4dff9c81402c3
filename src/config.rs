//! Configuration management for muniscrape using the prefer crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scrapers::browser::{UserAgentRotation, IMPERSONATE_USER_AGENTS};

/// Keywords whose presence marks a document as a bond prospectus.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "prospectus",
    "coupon rate",
    "maturity date",
    "use of proceeds",
    "risk factors",
    "underwriter",
    "trustee",
    "credit rating",
];

/// Browser launch and page-interaction timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true).
    pub headless: bool,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    pub remote_url: Option<String>,
    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    pub proxy: Option<String>,
    /// Budget for a single element wait or click, in seconds.
    pub action_timeout_secs: u64,
    /// Budget for a page navigation, in seconds.
    pub navigation_timeout_secs: u64,
    /// Pause after scrolling an overlay control into view, in milliseconds.
    pub settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_args: Vec::new(),
            remote_url: None,
            proxy: None,
            action_timeout_secs: 30,
            navigation_timeout_secs: 60,
            settle_ms: 1000,
        }
    }
}

impl BrowserConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// User-agent pool and how to pick from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub pool: Vec<String>,
    pub rotation: UserAgentRotation,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            pool: IMPERSONATE_USER_AGENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rotation: UserAgentRotation::default(),
        }
    }
}

/// Paged-table traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Value chosen in a "rows per page" control before traversal starts.
    pub page_size: String,
    /// Pause after clicking "next", in milliseconds.
    pub settle_ms: u64,
    /// Hard upper bound on pages read in one traversal.
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: "100".to_string(),
            settle_ms: 1500,
            max_pages: 500,
        }
    }
}

impl PaginationConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Which web search engine feeds document discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchEngineKind {
    #[default]
    Google,
    #[serde(rename = "duckduckgo", alias = "ddg")]
    DuckDuckGo,
}

/// Document discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: SearchEngineKind,
    /// Organic results to take before falling back to scanning raw markup.
    pub max_results: usize,
    /// Total search attempts before giving up.
    pub retries: usize,
    /// Pause between failed attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngineKind::default(),
            max_results: 5,
            retries: 3,
            backoff_ms: 2000,
        }
    }
}

impl SearchConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Keyword-density acceptance of fetched documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub keywords: Vec<String>,
    pub min_matches: usize,
    /// Extension (without dot) that marks a direct-file link.
    pub extension: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            min_matches: 3,
            extension: "pdf".to_string(),
        }
    }
}

/// Per-site overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Replaces the built-in site root.
    pub base_url: Option<String>,
    /// Cookies seeded into the session before the first navigation,
    /// as a header string (`"name=value; other=value"`).
    pub cookies: Option<String>,
    /// Extra HTTP headers sent with every request.
    pub headers: HashMap<String, String>,
}

impl SiteConfig {
    pub fn base_url<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or(default)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Debug artifact directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<String>,
    /// Delay between targets of an aggregate run, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub politeness_delay_ms: Option<u64>,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub user_agents: UserAgentConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub emma: SiteConfig,
    #[serde(default)]
    pub fitch: SiteConfig,
    #[serde(default)]
    pub frankfurt: SiteConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers muniscrape config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("muniscrape").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.debug_dir {
            settings.debug_dir = resolve_path(dir, base_dir);
        }
        if let Some(ms) = self.politeness_delay_ms {
            settings.politeness_delay = Duration::from_millis(ms);
        }
        settings.browser = self.browser.clone();
        settings.user_agents = self.user_agents.clone();
        settings.pagination = self.pagination.clone();
        settings.search = self.search.clone();
        settings.verification = self.verification.clone();
        settings.emma = self.emma.clone();
        settings.fitch = self.fitch.clone();
        settings.frankfurt = self.frankfurt.clone();
    }
}

/// Absolute paths are returned as-is; relative ones are joined onto `base_dir`.
fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(path_str);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Application settings. Immutable once loaded; shared as `Arc<Settings>`.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root under which task results are written.
    pub output_dir: PathBuf,
    /// Where screenshots and markup of failed steps go.
    pub debug_dir: PathBuf,
    /// Pause between consecutive targets of an aggregate run.
    pub politeness_delay: Duration,
    pub browser: BrowserConfig,
    pub user_agents: UserAgentConfig,
    pub pagination: PaginationConfig,
    pub search: SearchConfig,
    pub verification: VerificationConfig,
    pub emma: SiteConfig,
    pub fitch: SiteConfig,
    pub frankfurt: SiteConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            debug_dir: PathBuf::from("debug"),
            politeness_delay: Duration::from_secs(2),
            browser: BrowserConfig::default(),
            user_agents: UserAgentConfig::default(),
            pagination: PaginationConfig::default(),
            search: SearchConfig::default(),
            verification: VerificationConfig::default(),
            emma: SiteConfig::default(),
            fitch: SiteConfig::default(),
            frankfurt: SiteConfig::default(),
        }
    }
}

impl Settings {
    /// Settings writing under the given directories, everything else default.
    pub fn with_dirs(output_dir: PathBuf, debug_dir: PathBuf) -> Self {
        Self {
            output_dir,
            debug_dir,
            ..Default::default()
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config), String> {
    // An explicit --config must parse; discovered files fall back to defaults.
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd.clone()
    } else {
        config.base_dir().unwrap_or_else(|| cwd.clone())
    };
    settings.output_dir = cwd.join(&settings.output_dir);
    settings.debug_dir = cwd.join(&settings.debug_dir);

    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    Ok((settings, config))
}

/// Environment variables take precedence over the config file.
fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| var(key).filter(|s| !s.is_empty());

    if let Some(dir) = var("MUNISCRAPE_OUTPUT_DIR") {
        tracing::debug!("Using MUNISCRAPE_OUTPUT_DIR from environment: {}", dir);
        settings.output_dir = PathBuf::from(dir);
    }
    if let Some(dir) = var("MUNISCRAPE_DEBUG_DIR") {
        tracing::debug!("Using MUNISCRAPE_DEBUG_DIR from environment: {}", dir);
        settings.debug_dir = PathBuf::from(dir);
    }
    if let Some(headless) = var("MUNISCRAPE_HEADLESS") {
        settings.browser.headless =
            !(headless.eq_ignore_ascii_case("0") || headless.eq_ignore_ascii_case("false"));
    }
    if let Some(url) = var("MUNISCRAPE_CHROME_URL") {
        tracing::debug!("Using MUNISCRAPE_CHROME_URL from environment: {}", url);
        settings.browser.remote_url = Some(url);
    }
}
