//! Environment checks.

use console::style;

use crate::cli::icons::{error, success};
use crate::config::Settings;
use crate::ocr::{check_tools, ExtractionChain};

/// Report whether a browser and the extraction tools are available.
pub fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", style("Browser").bold());
    match settings.browser.remote_url.as_deref() {
        Some(url) => println!("  {} remote browser at {}", success(), url),
        None => check_local_browser(),
    }

    println!("{}", style("Text extraction").bold());
    println!(
        "  {}",
        style(ExtractionChain::default().method_names().join(" → ")).dim()
    );
    let mut missing = 0;
    for (tool, available) in check_tools() {
        if available {
            println!("  {} {}", success(), tool);
        } else {
            missing += 1;
            println!("  {} {} not found", error(), tool);
        }
    }
    if missing > 0 {
        println!(
            "  {}",
            style("Install poppler-utils and tesseract-ocr for scanned documents").dim()
        );
    }
    Ok(())
}

#[cfg(feature = "browser")]
fn check_local_browser() {
    match crate::scrapers::browser::find_chrome() {
        Ok(path) => println!("  {} {}", success(), path.display()),
        Err(e) => println!("  {} {}", error(), e),
    }
}

#[cfg(not(feature = "browser"))]
fn check_local_browser() {
    println!("  {} built without the browser feature", error());
}
