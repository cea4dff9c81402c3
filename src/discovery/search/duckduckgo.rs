//! DuckDuckGo's script-free HTML endpoint.

use scraper::Html;
use url::Url;

use super::{is_http, SearchEngine, SearchHit};
use crate::scrapers::error::Result;
use crate::utils::{element_text, parse_selector};

pub struct DuckDuckGo;

/// Result links point at a `/l/?uddg=<target>` redirect; return the target.
fn unwrap_redirect(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com").ok()?;
    let url = base.join(href).ok()?;
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned());
    match target {
        Some(t) => Some(t),
        None => Some(url.to_string()),
    }
}

impl SearchEngine for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    fn search_url(&self, query: &str, _max_results: usize) -> String {
        format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        )
    }

    fn results_ready(&self) -> &'static str {
        "div#links"
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchHit>> {
        let links = parse_selector("a.result__a")?;
        let doc = Html::parse_document(html);

        let hits = doc
            .select(&links)
            .filter_map(|a| {
                let url = unwrap_redirect(a.value().attr("href")?)?;
                if !is_http(&url) {
                    return None;
                }
                Some(SearchHit {
                    title: element_text(a),
                    url,
                })
            })
            .collect();
        Ok(hits)
    }
}
