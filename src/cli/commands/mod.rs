//! CLI parser and dispatch.

mod check;
mod config_cmd;
mod scrape;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions, SearchEngineKind};
use crate::discovery::parse_engine_name;
use crate::models::TaskKind;

#[derive(Parser, Debug)]
#[command(name = "muniscrape")]
#[command(about = "Municipal bond and fixed-income reference data scraper")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one scrape task
    Scrape {
        /// Task to run
        #[arg(value_enum)]
        kind: TaskKind,
        /// CUSIP, ISIN, state code or issuer/issue id, depending on the task
        key: String,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Print results to stdout instead of writing files
        #[arg(long)]
        aggregate: bool,
        /// Print price history as JSON records
        #[arg(long)]
        json: bool,
        /// Search engine for prospectus search: google, duckduckgo
        #[arg(long, value_parser = parse_engine_name)]
        engine: Option<SearchEngineKind>,
        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Collect the issuers of every state into one table
    AllStates {
        /// CSV file with an Abbreviation column (default: built-in list)
        #[arg(long)]
        states_file: Option<PathBuf>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List the task kinds and the key each expects
    Kinds,

    /// Check for the browser and text extraction tools
    Check,

    /// Print the effective configuration
    Config {
        /// Output format: json, toml or yaml
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (mut settings, config) = load_settings_with_options(options)
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Scrape {
            kind,
            key,
            output_dir,
            aggregate,
            json,
            engine,
            headed,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if let Some(engine) = engine {
                settings.search.engine = engine;
            }
            if headed {
                settings.browser.headless = false;
            }
            let options = scrape::ScrapeOptions { aggregate, json };
            scrape::cmd_scrape(settings, kind, &key, options).await
        }
        Commands::AllStates {
            states_file,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            scrape::cmd_all_states(settings, states_file.as_deref()).await
        }
        Commands::Kinds => {
            scrape::cmd_kinds();
            Ok(())
        }
        Commands::Check => check::cmd_check(&settings),
        Commands::Config { format } => config_cmd::cmd_config_show(&config, &format),
    }
}
