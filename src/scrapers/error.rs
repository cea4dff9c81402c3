//! Error and outcome types shared by every scraper.

use std::time::Duration;

use thiserror::Error;

use crate::ocr::ExtractionError;

/// Errors that can occur while driving a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A wait for an element, a navigation or a request exceeded its budget.
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Unknown task kind: {0}")]
    UnknownTask(String),

    #[error("Invalid task parameters: {0}")]
    InvalidParams(String),
}

impl ScrapeError {
    /// Shorthand for a timeout waiting on a selector or step.
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn browser(err: impl std::fmt::Display) -> Self {
        Self::Browser(err.to_string())
    }

    /// True for the timeout class of failures.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Short label used to name debug artifacts for this failure.
    pub fn debug_label(&self) -> &'static str {
        if self.is_timeout() {
            "timeout"
        } else {
            "error"
        }
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

/// Result of an operation that may legitimately find nothing.
///
/// "Nothing there" is a normal outcome and is never reported through
/// [`ScrapeError`]; failures are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Found(T),
    Empty,
}

impl<T> Outcome<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(v) => Some(v),
            Outcome::Empty => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Found(v) => Outcome::Found(f(v)),
            Outcome::Empty => Outcome::Empty,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Outcome::Found(v),
            None => Outcome::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_classified() {
        let err = ScrapeError::timeout("#lvIssuers", Duration::from_secs(15));
        assert!(err.is_timeout());
        assert_eq!(err.debug_label(), "timeout");
        assert_eq!(
            ScrapeError::ElementMissing("a".into()).debug_label(),
            "error"
        );
    }

    #[test]
    fn outcome_from_option() {
        assert_eq!(Outcome::from(Some(3)), Outcome::Found(3));
        assert!(Outcome::<u8>::from(None).is_empty());
        assert_eq!(Outcome::Found(2).map(|v| v * 2).found(), Some(4));
    }
}
