//! Scrape task identification.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The site operations this crate knows how to perform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Trade summary, ratings, disclosures and final scale for one CUSIP
    SecurityDetail,
    /// Every issuer listed for one US state
    StateIssuers,
    /// Issues, official statements and financial disclosures of one issuer
    IssuerDetail,
    /// Securities table of one issue
    IssueDetail,
    /// Exchange price history for one ISIN
    PriceHistory,
    /// Security name lookup by ISIN
    NameLookup,
    /// Web search for a verified prospectus PDF by ISIN
    ProspectusSearch,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::SecurityDetail,
        TaskKind::StateIssuers,
        TaskKind::IssuerDetail,
        TaskKind::IssueDetail,
        TaskKind::PriceHistory,
        TaskKind::NameLookup,
        TaskKind::ProspectusSearch,
    ];

    /// Stable identifier used on the command line, in config and in paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityDetail => "security-detail",
            Self::StateIssuers => "state-issuers",
            Self::IssuerDetail => "issuer-detail",
            Self::IssueDetail => "issue-detail",
            Self::PriceHistory => "price-history",
            Self::NameLookup => "name-lookup",
            Self::ProspectusSearch => "prospectus-search",
        }
    }

    /// What the key parameter means for this kind.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::SecurityDetail => "CUSIP",
            Self::StateIssuers => "state code",
            Self::IssuerDetail => "issuer id",
            Self::IssueDetail => "issue id",
            Self::PriceHistory | Self::NameLookup | Self::ProspectusSearch => "ISIN",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid task kind '{}'. Valid options: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Where a task's results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    /// Write tables and files under this directory.
    Directory(PathBuf),
    /// Return rows to the caller instead of writing them.
    Aggregate,
}

impl OutputDestination {
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Directory(p) => Some(p),
            Self::Aggregate => None,
        }
    }
}

/// One unit of scraping work.
#[derive(Debug, Clone)]
pub struct ScrapeTask {
    pub kind: TaskKind,
    /// CUSIP, ISIN, state code or issuer/issue id depending on `kind`.
    pub key: String,
    pub destination: OutputDestination,
}

impl ScrapeTask {
    pub fn new(kind: TaskKind, key: impl Into<String>, destination: OutputDestination) -> Self {
        Self {
            kind,
            key: key.into().trim().to_string(),
            destination,
        }
    }

    /// Task writing under `base/<kind>/<key>`.
    pub fn in_dir(kind: TaskKind, key: impl Into<String>, base: &Path) -> Self {
        let key = key.into().trim().to_string();
        let dir = base.join(kind.as_str()).join(sanitize_path_segment(&key));
        Self::new(kind, key, OutputDestination::Directory(dir))
    }

    pub fn aggregate(kind: TaskKind, key: impl Into<String>) -> Self {
        Self::new(kind, key, OutputDestination::Aggregate)
    }

    /// Label used for debug artifacts: namespaced by kind and key.
    pub fn label(&self) -> String {
        format!("{}_{}", self.kind.as_str(), sanitize_path_segment(&self.key))
    }
}

/// Make a key safe for use as a single path component.
pub fn sanitize_path_segment(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
