//! Search candidates and verified documents.

use std::path::Path;

use url::Url;

/// A search result that may lead to the wanted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDocument {
    pub title: String,
    pub url: String,
    /// True if `url` itself is the file; false if it is an HTML page to be
    /// searched for embedded file links.
    pub is_direct_file: bool,
}

impl CandidateDocument {
    /// Build a candidate, classifying the URL by the target file extension.
    pub fn new(title: impl Into<String>, url: impl Into<String>, extension: &str) -> Self {
        let url = url.into();
        let is_direct_file = is_file_link(&url, extension);
        Self {
            title: title.into(),
            url,
            is_direct_file,
        }
    }

    /// Candidate titled after the final path segment of its URL.
    pub fn from_url(url: impl Into<String>, extension: &str) -> Self {
        let url = url.into();
        let title = file_name_from_url(&url).unwrap_or_else(|| url.clone());
        Self::new(title, url, extension)
    }
}

/// A fetched file that passed verification.
#[derive(Debug, Clone)]
pub struct VerifiedDocument {
    /// The search result this file was reached from.
    pub candidate_url: String,
    /// The URL the accepted bytes were fetched from.
    pub file_url: String,
    pub bytes: Vec<u8>,
    pub keyword_matches: usize,
}

/// True if the URL path ends in `.{extension}` (case-insensitive),
/// ignoring any query string or fragment.
pub fn is_file_link(url: &str, extension: &str) -> bool {
    let suffix = format!(".{}", extension.trim_start_matches('.').to_lowercase());
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };
    path.ends_with(&suffix)
}

/// Final path segment of a URL, if it has a non-empty one.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_direct_file_links() {
        assert!(is_file_link("https://x.com/docs/OS.PDF", "pdf"));
        assert!(is_file_link("https://x.com/a.pdf?download=1", "pdf"));
        assert!(!is_file_link("https://x.com/a.pdf.html", "pdf"));
        assert!(!is_file_link("https://x.com/listing?file=a.pdf", "pdf"));
        assert!(is_file_link("/relative/a.pdf", ".pdf"));
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            file_name_from_url("https://emma.msrb.org/P11/ER123.pdf?x=1").as_deref(),
            Some("ER123.pdf")
        );
        assert_eq!(file_name_from_url("https://emma.msrb.org/"), None);
    }

    #[test]
    fn candidate_from_url_uses_file_name_as_title() {
        let c = CandidateDocument::from_url("https://x.com/p/prospectus.pdf", "pdf");
        assert_eq!(c.title, "prospectus.pdf");
        assert!(c.is_direct_file);
    }
}
