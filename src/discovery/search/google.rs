//! Google web search.

use scraper::Html;

use super::{is_http, SearchEngine, SearchHit};
use crate::scrapers::error::Result;
use crate::utils::{element_text, parse_selector};

/// Organic results are the `h3` headings inside result links.
pub struct Google;

impl SearchEngine for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn search_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "https://www.google.com/search?q={}&num={}",
            urlencoding::encode(query),
            max_results
        )
    }

    fn results_ready(&self) -> &'static str {
        "div#search"
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchHit>> {
        let links = parse_selector("div#search div.g a")?;
        let heading = parse_selector("h3")?;
        let doc = Html::parse_document(html);

        let hits = doc
            .select(&links)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                if !is_http(href) {
                    return None;
                }
                let title = a.select(&heading).next().map(element_text)?;
                Some(SearchHit {
                    title,
                    url: href.to_string(),
                })
            })
            .collect();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headed_links_only() {
        let html = r#"<div id="search">
            <div class="g"><a href="https://example.com/os.pdf"><h3>Official Statement</h3></a></div>
            <div class="g"><a href="/search?q=related">Related</a></div>
            <div class="g"><a href="https://example.com/cached">Cached</a></div>
            <div class="g"><a href="https://muni.example.org/bonds"><h3> Series  2020 </h3></a></div>
        </div>"#;
        let hits = Google.parse_results(html).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "Series 2020");
        assert_eq!(hits[0].url, "https://example.com/os.pdf");
    }

    #[test]
    fn query_is_encoded() {
        assert_eq!(
            Google.search_url("US912828ZZ90 prospectus pdf", 5),
            "https://www.google.com/search?q=US912828ZZ90%20prospectus%20pdf&num=5"
        );
    }
}
