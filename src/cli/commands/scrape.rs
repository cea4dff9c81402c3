//! Scrape commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use console::style;

use crate::cli::icons::{arrow, error, success, warning};
use crate::config::Settings;
use crate::models::{PricePoint, ScrapeTask, TaskKind};
use crate::scrapers::browser::ChromeLauncher;
use crate::scrapers::{Outcome, TaskRunner};
use crate::services::aggregate::{default_state_codes, load_state_codes, scrape_all_states};
use crate::services::output::{write_csv_to, TaskReport};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeOptions {
    /// Print tables to stdout instead of writing them.
    pub aggregate: bool,
    /// Print price history as JSON records.
    pub json: bool,
}

/// Run one task and report what it produced.
pub async fn cmd_scrape(
    settings: Settings,
    kind: TaskKind,
    key: &str,
    options: ScrapeOptions,
) -> anyhow::Result<()> {
    let settings = Arc::new(settings);
    let runner = TaskRunner::new(Arc::new(ChromeLauncher), settings.clone());

    let task = if options.aggregate {
        ScrapeTask::aggregate(kind, key)
    } else {
        ScrapeTask::in_dir(kind, key, &settings.output_dir)
    };

    eprintln!("{} {} {} ({})", arrow(), style(kind).bold(), key, kind.key_name());
    let outcome = runner
        .run(&task)
        .await
        .with_context(|| format!("{} for {} failed", kind, key))?;

    let report = match outcome {
        Outcome::Found(report) => report,
        Outcome::Empty => {
            eprintln!("{} Nothing found for {}", warning(), key);
            return Ok(());
        }
    };

    if options.json && kind == TaskKind::PriceHistory {
        print_price_json(&report)?;
    } else if options.aggregate {
        print_tables(&report)?;
    }
    for (name, text) in &report.texts {
        eprintln!("  {} {}: {}", arrow(), name, text);
    }
    for path in &report.written {
        eprintln!("{} Wrote {}", success(), path.display());
    }
    Ok(())
}

fn print_tables(report: &TaskReport) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    for table in &report.tables {
        eprintln!("{} {} ({} rows)", arrow(), table.name, table.len());
        write_csv_to(stdout.lock(), table)?;
    }
    Ok(())
}

fn print_price_json(report: &TaskReport) -> anyhow::Result<()> {
    let points: Vec<PricePoint> = report.tables.iter().flat_map(PricePoint::parse_table).collect();
    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

/// Collect every state's issuers into one table.
pub async fn cmd_all_states(settings: Settings, states_file: Option<&Path>) -> anyhow::Result<()> {
    let states = match states_file {
        Some(path) => load_state_codes(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => default_state_codes(),
    };
    if states.is_empty() {
        anyhow::bail!("No state codes to scrape");
    }

    let runner = TaskRunner::new(Arc::new(ChromeLauncher), Arc::new(settings));
    eprintln!("{} Scraping issuers of {} states", arrow(), states.len());
    let summary = scrape_all_states(&runner, &states).await?;

    eprintln!(
        "{} {} states, {} issuers ({} empty)",
        success(),
        summary.succeeded,
        summary.table.len(),
        summary.empty
    );
    for (code, message) in &summary.failed {
        eprintln!("  {} {}: {}", error(), code, message);
    }
    if let Some(path) = summary.path {
        eprintln!("{} Wrote {}", success(), path.display());
    }
    Ok(())
}

pub fn cmd_kinds() {
    for kind in TaskKind::ALL {
        println!("{:<20} {}", kind.as_str(), style(kind.key_name()).dim());
    }
}
