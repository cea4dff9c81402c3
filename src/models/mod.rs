//! Scrape-time data structures.

mod document;
mod price;
mod table;
mod task;

pub use document::{file_name_from_url, is_file_link, CandidateDocument, VerifiedDocument};
pub use price::{parse_count, parse_day_first_date, parse_price, PricePoint};
pub use table::{
    normalize_field_name, ExtractedRow, Table, TableSchema, DISCLOSURES, FINAL_SCALE, ISSUERS,
    ISSUERS_BY_STATE, ISSUES, SECURITIES, TRADE_SUMMARY,
};
pub use task::{sanitize_path_segment, OutputDestination, ScrapeTask, TaskKind};
