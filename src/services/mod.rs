//! Output, download and multi-target services used by the scrapers and CLI.

pub mod aggregate;
pub mod download;
pub mod output;
