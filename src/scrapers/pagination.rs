//! Walking a paged table until its "next" control runs out.

use std::time::Duration;

use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use super::browser::{PageDriver, POLL_INTERVAL};
use super::error::Result;
use crate::config::PaginationConfig;
use crate::models::ExtractedRow;
use crate::utils::parse_selector;

/// State of the "next page" control as rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Absent,
    Disabled,
    Enabled,
}

/// Selectors and limits for one paged table.
#[derive(Debug, Clone)]
pub struct Pagination {
    /// Waited for before every read.
    pub container: String,
    /// One match per data row.
    pub rows: String,
    pub next: String,
    /// `<select>` and value chosen once before the first read.
    pub page_size: Option<(String, String)>,
    pub wait_timeout: Duration,
    pub settle: Duration,
    pub max_pages: usize,
}

impl Pagination {
    pub fn new(container: &str, rows: &str, next: &str) -> Self {
        let defaults = PaginationConfig::default();
        Self {
            container: container.to_string(),
            rows: rows.to_string(),
            next: next.to_string(),
            page_size: None,
            wait_timeout: Duration::from_secs(30),
            settle: defaults.settle(),
            max_pages: defaults.max_pages,
        }
    }

    /// Apply configured settle delay, page cap and wait budget.
    pub fn configured(mut self, config: &PaginationConfig, wait_timeout: Duration) -> Self {
        self.settle = config.settle();
        self.max_pages = config.max_pages.max(1);
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn with_page_size(mut self, selector: &str, value: &str) -> Self {
        self.page_size = Some((selector.to_string(), value.to_string()));
        self
    }

    /// Read every page, in traversal order.
    ///
    /// Stops when the next control is absent or disabled, when a page still
    /// repeats the previous one after a second look, or after `max_pages`. Fails with a timeout if
    /// the row container does not appear.
    pub async fn collect_all<F>(&self, page: &dyn PageDriver, mapper: F) -> Result<Vec<ExtractedRow>>
    where
        F: Fn(ElementRef<'_>) -> Option<ExtractedRow> + Send,
    {
        if let Some((ref selector, ref value)) = self.page_size {
            page.wait_for(&self.container, self.wait_timeout).await?;
            debug!("Setting page size {} via {}", value, selector);
            page.select_option(selector, value).await?;
            tokio::time::sleep(self.settle).await;
        }

        let mut collected = Vec::new();
        let mut previous: Option<Vec<ExtractedRow>> = None;

        for page_no in 1..=self.max_pages {
            page.wait_for(&self.container, self.wait_timeout).await?;
            let html = page.content().await?;
            let (mut rows, mut next) = read_page(&html, &self.rows, &self.next, &mapper)?;

            if previous.as_ref() == Some(&rows) {
                // The click may not have re-rendered yet; look once more.
                debug!("Page {} matches the previous page, re-reading", page_no);
                tokio::time::sleep(self.settle.max(POLL_INTERVAL)).await;
                page.wait_for(&self.container, self.wait_timeout).await?;
                let html = page.content().await?;
                (rows, next) = read_page(&html, &self.rows, &self.next, &mapper)?;
            }
            if previous.as_ref() == Some(&rows) {
                warn!(
                    "Page {} repeats the previous page; next control {} looks stuck",
                    page_no, self.next
                );
                break;
            }
            debug!("Page {}: {} rows, next {:?}", page_no, rows.len(), next);
            collected.extend(rows.iter().cloned());
            previous = Some(rows);

            if next != NextControl::Enabled {
                break;
            }
            if page_no == self.max_pages {
                warn!("Stopping after {} pages (limit reached)", self.max_pages);
                break;
            }
            page.click(&self.next).await?;
            tokio::time::sleep(self.settle).await;
        }

        info!("Collected {} rows", collected.len());
        Ok(collected)
    }
}

/// Rows of a table that is never paged.
pub async fn read_rows<F>(page: &dyn PageDriver, rows: &str, mapper: F) -> Result<Vec<ExtractedRow>>
where
    F: Fn(ElementRef<'_>) -> Option<ExtractedRow> + Send,
{
    let html = page.content().await?;
    let selector = parse_selector(rows)?;
    let doc = Html::parse_document(&html);
    let extracted = doc.select(&selector).filter_map(mapper).collect();
    Ok(extracted)
}

/// Rows of the current page plus the state of its next control.
fn read_page<F>(
    html: &str,
    rows: &str,
    next: &str,
    mapper: &F,
) -> Result<(Vec<ExtractedRow>, NextControl)>
where
    F: Fn(ElementRef<'_>) -> Option<ExtractedRow>,
{
    let rows_sel = parse_selector(rows)?;
    let next_sel = parse_selector(next)?;
    let doc = Html::parse_document(html);

    let extracted = doc.select(&rows_sel).filter_map(mapper).collect();
    let control = match doc.select(&next_sel).next() {
        None => NextControl::Absent,
        Some(el) if is_disabled(el) => NextControl::Disabled,
        Some(_) => NextControl::Enabled,
    };
    Ok((extracted, control))
}

fn is_disabled(el: ElementRef<'_>) -> bool {
    let value = el.value();
    value.classes().any(|c| c.contains("disabled"))
        || value.attr("disabled").is_some()
        || value
            .attr("aria-disabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}
