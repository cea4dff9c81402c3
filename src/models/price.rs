//! Typed price-history records parsed from a scraped table.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::table::{normalize_field_name, Table};

/// One trading day of exchange price history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: Option<i64>,
    pub volume_nominal: Option<i64>,
}

impl PricePoint {
    /// Parse every row of a price-history table.
    ///
    /// Headers are normalized with [`normalize_field_name`]; rows missing a
    /// date or any of open/close/high/low are skipped.
    pub fn parse_table(table: &Table) -> Vec<PricePoint> {
        let index: HashMap<String, usize> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (normalize_field_name(c), i))
            .collect();

        table
            .rows
            .iter()
            .filter_map(|row| {
                let field = |name: &str| {
                    index
                        .get(name)
                        .and_then(|&i| row.fields().get(i))
                        .map(|s| s.as_str())
                };
                Some(PricePoint {
                    date: parse_day_first_date(field("date")?)?,
                    open: parse_price(field("open")?)?,
                    close: parse_price(field("close")?)?,
                    high: parse_price(field("high")?)?,
                    low: parse_price(field("low")?)?,
                    volume: field("volume").and_then(parse_count),
                    volume_nominal: field("volume_nominal").and_then(parse_count),
                })
            })
            .collect()
    }
}

/// Parse a date written day-first (`31/12/2024`, `31.12.2024`), falling back
/// to ISO `2024-12-31`.
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%d/%m/%y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a price such as `101.25%` or `1,001.50`.
pub fn parse_price(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse().ok()
}

/// Parse a count such as `12,000`; blank or `nan` is `None`.
pub fn parse_count(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s == "-" {
        return None;
    }
    s.replace(',', "").parse().ok()
}
