//! Cookie parsing and cookie-header merging for browser sessions.

use serde::{Deserialize, Serialize};

/// Cookie extracted from or seeded into a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl BrowserCookie {
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: false,
            http_only: false,
        }
    }
}

/// Parse a `Cookie:` header value (`"a=1; b=2"`) into ordered pairs.
///
/// Segments without `=` or with an empty name are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Seed cookies for `domain` from a header string.
pub fn cookies_from_header(header: &str, domain: &str) -> Vec<BrowserCookie> {
    parse_cookie_header(header)
        .into_iter()
        .map(|(name, value)| BrowserCookie::new(&name, &value, domain))
        .collect()
}

/// Merge browser cookies into an existing cookie header.
///
/// Existing pairs keep their position; cookies from the browser replace a
/// pair of the same name, and new names are appended.
pub fn merge_cookie_header(existing: Option<&str>, cookies: &[BrowserCookie]) -> String {
    let mut pairs = existing.map(parse_cookie_header).unwrap_or_default();
    for cookie in cookies {
        match pairs.iter_mut().find(|(name, _)| *name == cookie.name) {
            Some(pair) => pair.1 = cookie.value.clone(),
            None => pairs.push((cookie.name.clone(), cookie.value.clone())),
        }
    }
    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}
