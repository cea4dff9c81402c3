//! muniscrape - municipal bond and fixed-income reference data scraper.
//!
//! Drives a headless browser through EMMA, Fitch and Börse Frankfurt, and
//! searches the web for verified prospectus documents.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod models;
pub mod ocr;
pub mod scrapers;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
