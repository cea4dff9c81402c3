//! Issuers of every state, combined into one table.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::models::{OutputDestination, ScrapeTask, Table, TaskKind, ISSUERS, ISSUERS_BY_STATE};
use crate::scrapers::error::{Outcome, Result, ScrapeError};
use crate::scrapers::TaskRunner;
use crate::services::output::OutputWriter;

/// US states, DC and the territories EMMA lists issuers for.
pub const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "AS", "GU", "MP", "PR", "VI",
];

pub fn default_state_codes() -> Vec<String> {
    STATE_CODES.iter().map(|s| s.to_string()).collect()
}

/// State codes from the `Abbreviation` column of a CSV file.
pub async fn load_state_codes(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("abbreviation"))
        .ok_or_else(|| {
            ScrapeError::Config(format!(
                "{} has no Abbreviation column",
                path.display()
            ))
        })?;

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(code) = record.get(column).map(str::trim).filter(|c| !c.is_empty()) {
            codes.push(code.to_uppercase());
        }
    }
    Ok(codes)
}

/// How an all-states run went.
#[derive(Debug)]
pub struct AggregateSummary {
    pub table: Table,
    pub succeeded: usize,
    pub empty: usize,
    /// (state code, error message)
    pub failed: Vec<(String, String)>,
    pub path: Option<PathBuf>,
}

/// Run `state-issuers` for each code in turn, pausing between states, and
/// write the combined table to `<output_dir>/state-issuers/issuers.csv`.
///
/// A failing state is logged and skipped; its debug artifacts are captured
/// by the runner.
pub async fn scrape_all_states(runner: &TaskRunner, states: &[String]) -> Result<AggregateSummary> {
    let settings = runner.settings();
    let mut summary = AggregateSummary {
        table: Table::new(ISSUERS_BY_STATE),
        succeeded: 0,
        empty: 0,
        failed: Vec::new(),
        path: None,
    };

    for (i, code) in states.iter().enumerate() {
        if i > 0 && !settings.politeness_delay.is_zero() {
            tokio::time::sleep(settings.politeness_delay).await;
        }
        info!("[{}/{}] Issuers of {}", i + 1, states.len(), code);

        let task = ScrapeTask::aggregate(TaskKind::StateIssuers, code.as_str());
        match runner.run(&task).await {
            Ok(Outcome::Found(mut report)) => {
                let rows = report.take_table(ISSUERS.name).map(|t| t.rows).unwrap_or_default();
                info!("{}: {} issuers", code, rows.len());
                summary
                    .table
                    .extend(rows.iter().map(|row| row.prepended(&task.key)));
                summary.succeeded += 1;
            }
            Ok(Outcome::Empty) => summary.empty += 1,
            Err(e) => {
                warn!("Skipping {}: {}", code, e);
                summary.failed.push((code.clone(), e.to_string()));
            }
        }
    }

    let out = OutputWriter::new(&OutputDestination::Directory(
        settings.output_dir.join(TaskKind::StateIssuers.as_str()),
    ));
    summary.path = out.write_table(&summary.table).await?;
    Ok(summary)
}
