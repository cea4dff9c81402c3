//! Exchange price history from Börse Frankfurt.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::error::{Outcome, Result, ScrapeError};
use super::task::{require_key, ScraperTask, TaskContext};
use crate::config::{Settings, SiteConfig};
use crate::models::{ExtractedRow, ScrapeTask, Table, TaskKind};
use crate::services::output::TaskReport;
use crate::utils::{cell_texts, element_text, parse_selector};

pub const BASE_URL: &str = "https://www.boerse-frankfurt.de";

pub const CONSENT: &str = "button#cookie-hint-btn-accept";

const SEARCH_INPUT: &str = "input#mat-input-0";
const SUGGESTION: &str = "div.global-search-result-option";
const VIEW_MENU: &str = "button.data-menue-button";
const TABLE: &str = "table.widget-table";
const HEADER_CELLS: &str = "table.widget-table thead tr th";
const ROWS: &str = "table.widget-table tbody tr";
const NEXT: &str = "button.page-bar-type-button.btn.btn-lg:last-child";

/// Per-keystroke delay; the suggestion list only reacts to typed input.
const KEY_DELAY: Duration = Duration::from_millis(150);

pub const PRICE_HISTORY: &str = "price_history";

/// Column names exactly as the source table shows them.
fn read_header(html: &str) -> Result<Vec<String>> {
    let selector = parse_selector(HEADER_CELLS)?;
    let doc = Html::parse_document(html);
    let header = doc.select(&selector).map(element_text).collect();
    Ok(header)
}

fn price_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    let cells = cell_texts(row);
    if cells.iter().all(|c| c.is_empty()) {
        None
    } else {
        Some(ExtractedRow::new(cells))
    }
}

/// Searches an ISIN, opens its price history view and pages through it.
pub struct PriceHistory;

#[async_trait]
impl ScraperTask for PriceHistory {
    fn kind(&self) -> TaskKind {
        TaskKind::PriceHistory
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.frankfurt)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        require_key(self.kind(), key)?;
        Ok(format!("{}/en", settings.frankfurt.base_url(BASE_URL)))
    }

    fn consent_selector(&self) -> Option<&'static str> {
        Some(CONSENT)
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let page = ctx.page;
        let timeout = ctx.action_timeout();
        let isin = task.key.to_uppercase();

        page.wait_for(SEARCH_INPUT, timeout).await?;
        page.type_text(SEARCH_INPUT, &isin, KEY_DELAY).await?;

        match page.wait_for(SUGGESTION, timeout).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                info!("No search suggestions for {}", isin);
                return Ok(Outcome::Empty);
            }
            Err(e) => return Err(e),
        }
        match page.click_text(SUGGESTION, &isin).await {
            Ok(()) => {}
            Err(ScrapeError::ElementMissing(_)) => {
                info!("No suggestion matches {}", isin);
                return Ok(Outcome::Empty);
            }
            Err(e) => return Err(e),
        }
        ctx.consent(CONSENT).maybe_dismiss(page).await;

        page.wait_for(VIEW_MENU, timeout).await?;
        page.click_text(VIEW_MENU, "Price History").await?;
        page.wait_for(TABLE, timeout).await?;

        let header = read_header(&page.content().await?)?;
        debug!("Price history columns: {:?}", header);

        let rows = ctx
            .pagination(TABLE, ROWS, NEXT)
            .collect_all(page, price_row)
            .await?;

        let mut table = Table::with_columns(PRICE_HISTORY, header);
        table.extend(rows);

        let mut report = TaskReport::default();
        report.add_table(ctx.output, table).await?;
        Ok(Outcome::Found(report))
    }
}
