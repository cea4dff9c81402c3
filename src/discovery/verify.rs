//! Content verification of fetched documents.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::VerificationConfig;
use crate::ocr::ExtractionChain;

/// Keyword-density acceptance: a text is accepted when at least
/// `min_matches` distinct keywords occur in it, case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordVerifier {
    keywords: Vec<String>,
    min_matches: usize,
}

impl KeywordVerifier {
    pub fn new(keywords: &[String], min_matches: usize) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            min_matches,
        }
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self::new(&config.keywords, config.min_matches)
    }

    /// Number of distinct keywords present in `text`.
    pub fn count_matches(&self, text: &str) -> usize {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .count()
    }

    pub fn accepts(&self, text: &str) -> bool {
        self.count_matches(text) >= self.min_matches
    }

    pub fn min_matches(&self) -> usize {
        self.min_matches
    }
}

/// Extracts text from file bytes and scores it.
pub struct DocumentVerifier {
    chain: Arc<ExtractionChain>,
    keywords: KeywordVerifier,
}

impl DocumentVerifier {
    pub fn new(chain: Arc<ExtractionChain>, keywords: KeywordVerifier) -> Self {
        Self { chain, keywords }
    }

    /// Keyword matches of an accepted file; `None` when text extraction
    /// fails or the file scores below the threshold.
    pub async fn verify(&self, url: &str, bytes: &[u8]) -> Option<usize> {
        let Some(text) = self.chain.extract_text(bytes).await else {
            info!("No text could be extracted from {}", url);
            return None;
        };
        let matches = self.keywords.count_matches(&text);
        if matches >= self.keywords.min_matches() {
            info!("Accepted {} ({} keyword matches)", url, matches);
            Some(matches)
        } else {
            debug!(
                "Rejected {}: {} of {} required keyword matches",
                url,
                matches,
                self.keywords.min_matches()
            );
            None
        }
    }
}
