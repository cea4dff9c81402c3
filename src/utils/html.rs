//! Markup helpers shared by the table readers.

use scraper::{ElementRef, Selector};

use crate::scrapers::error::{Result, ScrapeError};

/// Parse a CSS selector, reporting a bad one as a configuration error.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Config(format!("Invalid selector '{}': {:?}", selector, e)))
}

/// Text content of an element with runs of whitespace collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Direct `td`/`th` children of a table row.
pub fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Collapsed text of every cell of a row.
pub fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    row_cells(row).into_iter().map(element_text).collect()
}

/// First descendant of `el` matching `selector`.
pub fn descendant<'a>(el: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let parsed = Selector::parse(selector).ok()?;
    let found = el.select(&parsed).next();
    found
}

/// Attribute of the first descendant matching `selector`.
pub fn descendant_attr(el: ElementRef<'_>, selector: &str, attr: &str) -> Option<String> {
    descendant(el, selector).and_then(|d| d.value().attr(attr).map(|v| v.trim().to_string()))
}
