//! EMMA (MSRB) municipal securities pages.

use async_trait::async_trait;
use scraper::ElementRef;
use tracing::{info, warn};
use url::Url;

use super::error::{Outcome, Result, ScrapeError};
use super::pagination::read_rows;
use super::tabs::{extract_tab, Tab};
use super::task::{require_key, ScraperTask, TaskContext};
use crate::config::{Settings, SiteConfig};
use crate::models::{
    ExtractedRow, ScrapeTask, Table, TaskKind, DISCLOSURES, FINAL_SCALE, ISSUERS, ISSUES,
    SECURITIES, TRADE_SUMMARY,
};
use crate::services::download::{download_missing, DownloadSummary};
use crate::services::output::TaskReport;
use crate::utils::{cell_texts, descendant, descendant_attr, element_text, row_cells};

pub const BASE_URL: &str = "https://emma.msrb.org";

/// Terms-of-use "Accept" button.
pub const CONSENT: &str = "#ctl00_mainContentArea_disclaimerContent_yesButton";

fn base_url(settings: &Settings) -> &str {
    settings.emma.base_url(BASE_URL)
}

/// Absolute form of an href found on an EMMA page.
fn absolute(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

fn parse_base(settings: &Settings) -> Result<Url> {
    Url::parse(base_url(settings))
        .map_err(|e| ScrapeError::Config(format!("Invalid EMMA base URL: {}", e)))
}

/// DataTables renders a single `dataTables_empty` cell for an empty table.
fn is_placeholder(row: ElementRef<'_>) -> bool {
    descendant(row, "td.dataTables_empty").is_some()
}

fn text_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    if is_placeholder(row) {
        return None;
    }
    let cells = cell_texts(row);
    if cells.is_empty() {
        None
    } else {
        Some(cells.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Security detail
// ---------------------------------------------------------------------------

const TRADE_TAB: Tab<'static> = Tab {
    name: "trade summary",
    control: "ul.nav.TA-nav li a",
    label: Some("Trade Summary"),
    ready: "#lvRollup_wrapper",
    no_records: None,
};

const RATINGS_TAB: Tab<'static> = Tab {
    name: "ratings",
    control: "a#ui-id-3",
    label: None,
    ready: "#ratings",
    no_records: None,
};

const DISCLOSURES_TAB: Tab<'static> = Tab {
    name: "disclosures",
    control: "a#ui-id-4",
    label: None,
    ready: "#officialStatementContainer table",
    no_records: None,
};

const FINAL_SCALE_TAB: Tab<'static> = Tab {
    name: "final scale",
    control: "a#ui-id-5",
    label: None,
    ready: "table#dtSecurities tbody tr",
    no_records: None,
};

fn disclosure_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    let cells = row_cells(row);
    let document = element_text(descendant(row, "a")?);
    let posted = cells.last().map(|c| element_text(*c)).unwrap_or_default();
    Some(ExtractedRow::from_iter([document, posted]))
}

/// CUSIP, principal, coupon, maturity and the comma-joined rating images.
fn final_scale_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    let cells = row_cells(row);
    if cells.len() < 5 {
        return None;
    }
    let cusip = descendant_attr(cells[0], "img", "data-cusip9")
        .unwrap_or_else(|| element_text(cells[0]));
    let ratings: Vec<String> = cells
        .iter()
        .skip(7)
        .filter_map(|c| descendant_attr(*c, "img", "data-rating"))
        .collect();
    Some(ExtractedRow::from_iter([
        cusip,
        element_text(cells[1]),
        element_text(cells[3]),
        element_text(cells[4]),
        ratings.join(","),
    ]))
}

/// Trade summary, ratings, disclosures and final scale of one CUSIP.
pub struct SecurityDetail;

#[async_trait]
impl ScraperTask for SecurityDetail {
    fn kind(&self) -> TaskKind {
        TaskKind::SecurityDetail
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.emma)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let cusip = require_key(self.kind(), key)?;
        Ok(format!(
            "{}/Security/Details/?id={}",
            base_url(settings),
            urlencoding::encode(&cusip.to_uppercase())
        ))
    }

    fn consent_selector(&self) -> Option<&'static str> {
        Some(CONSENT)
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let page = ctx.page;
        let timeout = ctx.action_timeout();
        let consent = ctx.consent(CONSENT);

        if page.exists("div.error-content").await? {
            let message = page
                .inner_text("div.error-content span")
                .await?
                .unwrap_or_default();
            warn!("No records for CUSIP {}: {}", task.key, message.trim());
            return Ok(Outcome::Empty);
        }

        let mut report = TaskReport::default();

        let trades = extract_tab(
            page,
            Some(&consent),
            &TRADE_TAB,
            timeout,
            read_rows(page, "table#lvRollup tbody tr", text_row),
        )
        .await?;
        if let Outcome::Found(rows) = trades {
            report
                .add_table(ctx.output, Table::from_rows(TRADE_SUMMARY, rows))
                .await?;
        }

        let ratings = extract_tab(page, Some(&consent), &RATINGS_TAB, timeout, async {
            Ok::<_, ScrapeError>(page.inner_text("#ratings").await?.unwrap_or_default())
        })
        .await?;
        if let Outcome::Found(text) = ratings {
            report
                .add_text(ctx.output, "ratings.txt", text.trim().to_string())
                .await?;
        }

        let disclosures = extract_tab(
            page,
            Some(&consent),
            &DISCLOSURES_TAB,
            timeout,
            read_rows(page, "#officialStatementContainer tbody tr", disclosure_row),
        )
        .await?;
        if let Outcome::Found(rows) = disclosures {
            report
                .add_table(ctx.output, Table::from_rows(DISCLOSURES, rows))
                .await?;
        }

        let final_scale = extract_tab(
            page,
            Some(&consent),
            &FINAL_SCALE_TAB,
            timeout,
            read_rows(page, "table#dtSecurities tbody tr", final_scale_row),
        )
        .await?;
        if let Outcome::Found(rows) = final_scale {
            report
                .add_table(ctx.output, Table::from_rows(FINAL_SCALE, rows))
                .await?;
        }

        Ok(Outcome::Found(report))
    }
}

// ---------------------------------------------------------------------------
// State issuers
// ---------------------------------------------------------------------------

/// Issuer name plus the `id` and `type` query parameters of its link.
fn issuer_row(base: &Url, row: ElementRef<'_>) -> Option<ExtractedRow> {
    let link = descendant(row, "td a")?;
    let name = element_text(link);
    let href = link.value().attr("href")?;
    let url = base.join(href.trim()).ok()?;

    let param = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    };
    Some(ExtractedRow::from_iter([name, param("id"), param("type")]))
}

/// Every issuer listed for one state.
pub struct StateIssuers;

#[async_trait]
impl ScraperTask for StateIssuers {
    fn kind(&self) -> TaskKind {
        TaskKind::StateIssuers
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.emma)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let state = require_key(self.kind(), key)?;
        Ok(format!(
            "{}/IssuerHomePage/State?state={}",
            base_url(settings),
            urlencoding::encode(&state.to_uppercase())
        ))
    }

    fn consent_selector(&self) -> Option<&'static str> {
        Some(CONSENT)
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let base = parse_base(ctx.settings)?;
        let rows = ctx
            .sized_pagination(
                "table#lvIssuers",
                "table#lvIssuers tbody tr",
                "a#lvIssuers_next",
                "select[name='lvIssuers_length']",
            )
            .collect_all(ctx.page, |row| issuer_row(&base, row))
            .await?;
        info!("{} issuers for {}", rows.len(), task.key);

        let mut report = TaskReport::default();
        report
            .add_table(ctx.output, Table::from_rows(ISSUERS, rows))
            .await?;
        Ok(Outcome::Found(report))
    }
}

// ---------------------------------------------------------------------------
// Issuer detail
// ---------------------------------------------------------------------------

const ISSUES_TAB: Tab<'static> = Tab {
    name: "issues",
    control: "li[data-cid='t-iss']",
    label: None,
    ready: "select[name='lvIssues_length']",
    no_records: None,
};

const OFFICIAL_STATEMENTS_TAB: Tab<'static> = Tab {
    name: "official statements",
    control: "li[data-cid='t-os']",
    label: None,
    ready: "select[name='lvOS_length']",
    no_records: None,
};

const FINANCIAL_DISCLOSURES_TAB: Tab<'static> = Tab {
    name: "financial disclosures",
    control: "li[data-cid='t-fcd']",
    label: None,
    ready: "select[name='lvFCD_length']",
    no_records: Some("div#t-fcd p.no-record"),
};

/// Issue id (last path segment of the link), description, dated date and
/// maturity dates.
fn issue_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    let cells = row_cells(row);
    if cells.len() < 3 {
        return None;
    }
    let link = descendant(cells[0], "a")?;
    let href = link.value().attr("href")?;
    let issue_id = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Some(ExtractedRow::from_iter([
        issue_id,
        element_text(link),
        element_text(cells[1]),
        element_text(cells[2]),
    ]))
}

/// Absolute URL of the document link in a file-listing row.
fn listing_row(base: &Url, row: ElementRef<'_>) -> Option<ExtractedRow> {
    let href = descendant_attr(row, "td.fidW a", "href")?;
    absolute(base, &href).map(|url| ExtractedRow::from_iter([url]))
}

/// Issues plus the official statement and financial disclosure files of
/// one issuer.
pub struct IssuerDetail;

impl IssuerDetail {
    /// Page through a file listing and download what is not on disk yet.
    async fn listing(
        &self,
        ctx: &TaskContext<'_>,
        base: &Url,
        table: &str,
        subdir: &str,
    ) -> Result<DownloadSummary> {
        let rows = ctx
            .sized_pagination(
                &format!("table#{}", table),
                &format!("table#{} tbody tr", table),
                &format!("a#{}_next", table),
                &format!("select[name='{}_length']", table),
            )
            .collect_all(ctx.page, |row| listing_row(base, row))
            .await?;

        let mut urls: Vec<String> = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(url) = row.into_fields().into_iter().next() {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        match ctx.output.subdir(subdir) {
            Some(dir) => download_missing(ctx.fetcher, &urls, &dir).await,
            None => {
                info!("Aggregate run; not downloading {} listed files", urls.len());
                Ok(DownloadSummary::default())
            }
        }
    }
}

#[async_trait]
impl ScraperTask for IssuerDetail {
    fn kind(&self) -> TaskKind {
        TaskKind::IssuerDetail
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.emma)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let id = require_key(self.kind(), key)?;
        Ok(format!(
            "{}/IssuerHomePage/Issuer?id={}",
            base_url(settings),
            urlencoding::encode(id)
        ))
    }

    fn consent_selector(&self) -> Option<&'static str> {
        Some(CONSENT)
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let page = ctx.page;
        let timeout = ctx.action_timeout();
        let consent = ctx.consent(CONSENT);
        let base = parse_base(ctx.settings)?;
        let mut report = TaskReport::default();

        let pager = ctx.sized_pagination(
            "table#lvIssues",
            "table#lvIssues tbody tr",
            "a#lvIssues_next",
            "select[name='lvIssues_length']",
        );
        let issues = extract_tab(
            page,
            Some(&consent),
            &ISSUES_TAB,
            timeout,
            pager.collect_all(page, issue_row),
        )
        .await?;
        if let Outcome::Found(rows) = issues {
            report
                .add_table(ctx.output, Table::from_rows(ISSUES, rows))
                .await?;
        }

        let official = extract_tab(
            page,
            Some(&consent),
            &OFFICIAL_STATEMENTS_TAB,
            timeout,
            self.listing(ctx, &base, "lvOS", "official_statements"),
        )
        .await?;
        if let Outcome::Found(summary) = official {
            info!(
                "Downloaded or skipped {} official statements for issuer {}",
                summary.fetched + summary.skipped,
                task.key
            );
            report.files.extend(summary.files);
        }

        let financial = extract_tab(
            page,
            Some(&consent),
            &FINANCIAL_DISCLOSURES_TAB,
            timeout,
            self.listing(ctx, &base, "lvFCD", "financial_disclosures"),
        )
        .await?;
        match financial {
            Outcome::Found(summary) => {
                info!(
                    "Downloaded or skipped {} financial disclosures for issuer {}",
                    summary.fetched + summary.skipped,
                    task.key
                );
                report.files.extend(summary.files);
            }
            Outcome::Empty => warn!("No financial disclosures for issuer {}", task.key),
        }

        Ok(Outcome::Found(report))
    }
}

// ---------------------------------------------------------------------------
// Issue detail
// ---------------------------------------------------------------------------

/// Twelve securities columns; rating cells prefer the rating image's
/// `data-rating` over the cell text.
fn security_row(row: ElementRef<'_>) -> Option<ExtractedRow> {
    let cells = row_cells(row);
    if cells.len() < 12 {
        return None;
    }
    let mut fields = Vec::with_capacity(12);
    fields.push(
        descendant_attr(cells[0], "img", "data-cusip9").unwrap_or_else(|| element_text(cells[0])),
    );
    fields.extend(cells[1..8].iter().map(|c| element_text(*c)));
    for cell in &cells[8..12] {
        let rating = match descendant(*cell, "img") {
            Some(img) => img.value().attr("data-rating").unwrap_or_default().to_string(),
            None => element_text(*cell),
        };
        fields.push(rating);
    }
    Some(ExtractedRow::new(fields))
}

/// Securities table of one issue.
pub struct IssueDetail;

#[async_trait]
impl ScraperTask for IssueDetail {
    fn kind(&self) -> TaskKind {
        TaskKind::IssueDetail
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.emma)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let id = require_key(self.kind(), key)?;
        Ok(format!(
            "{}/IssueView/Details/{}",
            base_url(settings),
            urlencoding::encode(id)
        ))
    }

    fn consent_selector(&self) -> Option<&'static str> {
        Some(CONSENT)
    }

    async fn run(&self, ctx: &TaskContext<'_>, _task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        ctx.page
            .wait_for("table#dtSecurities tbody tr", ctx.action_timeout())
            .await?;
        let rows = read_rows(ctx.page, "table#dtSecurities tbody tr", security_row).await?;

        let mut report = TaskReport::default();
        report
            .add_table(ctx.output, Table::from_rows(SECURITIES, rows))
            .await?;
        Ok(Outcome::Found(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::debug_capture::DebugCapture;
    use crate::services::output::OutputWriter;
    use crate::testing::{fast_settings, RecordingFetcher, ScriptedPage};
    use crate::utils::parse_selector;
    use scraper::Html;

    fn with_row<T>(html: &str, f: impl Fn(ElementRef<'_>) -> T) -> T {
        let doc = Html::parse_document(html);
        let sel = parse_selector("tr").unwrap();
        let row = doc.select(&sel).next().unwrap();
        f(row)
    }

    #[test]
    fn builds_targets() {
        let settings = Settings::default();
        assert_eq!(
            SecurityDetail.build_target(&settings, "912828zz9").unwrap(),
            "https://emma.msrb.org/Security/Details/?id=912828ZZ9"
        );
        assert_eq!(
            StateIssuers.build_target(&settings, "ak").unwrap(),
            "https://emma.msrb.org/IssuerHomePage/State?state=AK"
        );
        assert_eq!(
            IssueDetail.build_target(&settings, "P21234567").unwrap(),
            "https://emma.msrb.org/IssueView/Details/P21234567"
        );
    }

    #[test]
    fn issuer_row_reads_query_parameters() {
        let base = Url::parse(BASE_URL).unwrap();
        let row = with_row(
            "<table><tr><td><a href='/IssuerHomePage/Issuer?id=F5A1B2&amp;type=M'>Anchorage (AK)</a></td></tr></table>",
            |r| issuer_row(&base, r),
        )
        .unwrap();
        assert_eq!(row.fields(), ["Anchorage (AK)", "F5A1B2", "M"]);
    }

    #[test]
    fn issue_row_takes_last_path_segment() {
        let row = with_row(
            "<table><tr><td><a href='/IssueView/Details/ER355993'>GO Bonds 2019</a></td>\
             <td>06/01/2019</td><td>2020-2039</td></tr></table>",
            issue_row,
        )
        .unwrap();
        assert_eq!(row.fields(), ["ER355993", "GO Bonds 2019", "06/01/2019", "2020-2039"]);
    }

    #[test]
    fn security_row_prefers_rating_images() {
        let row = with_row(
            "<table><tr><td><img data-cusip9='011770AA1'></td><td>1,000,000</td><td>Serial</td>\
             <td>5.000</td><td>06/01/2030</td><td>Yield</td><td>101.2</td><td>2.1</td>\
             <td><img data-rating='AA'></td><td>NR</td><td><img data-rating='Aa2'></td><td></td></tr></table>",
            security_row,
        )
        .unwrap();
        assert_eq!(row.len(), 12);
        assert_eq!(row.fields()[0], "011770AA1");
        assert_eq!(&row.fields()[8..], ["AA", "NR", "Aa2", ""]);
    }

    #[test]
    fn placeholder_rows_are_skipped() {
        assert!(with_row(
            "<table><tr><td class='dataTables_empty'>No data available</td></tr></table>",
            text_row
        )
        .is_none());
    }

    fn nav() -> &'static str {
        "<ul class='nav TA-nav'><li><a>Trade Summary</a></li></ul>\
         <a id='ui-id-3'>Ratings</a><a id='ui-id-4'>Disclosures</a><a id='ui-id-5'>Final Scale</a>"
    }

    /// Detail page for CUSIP 912828ZZ9: 2 trades, no ratings text,
    /// 1 disclosure, 3 final-scale rows.
    fn security_page() -> ScriptedPage {
        security_page_with(true)
    }

    /// Same page; the disclosures tab never renders unless `disclosures_render`.
    fn security_page_with(disclosures_render: bool) -> ScriptedPage {
        let trades = format!(
            "{}<div id='lvRollup_wrapper'><table id='lvRollup'><tbody>\
             <tr><td>05/01/2025</td><td>99.1/98.7</td><td>4.1/4.2</td><td>3</td><td>150,000</td></tr>\
             <tr><td>04/30/2025</td><td>99.0/98.9</td><td>4.1/4.1</td><td>1</td><td>25,000</td></tr>\
             </tbody></table></div>",
            nav()
        );
        let ratings = format!("{}<div id='ratings'></div>", nav());
        let disclosures = if disclosures_render {
            format!(
                "{}<div id='officialStatementContainer'><table><tbody>\
                 <tr><td><a href='/P1.pdf'>Official Statement</a></td><td>03/02/2020</td></tr>\
                 </tbody></table></div>",
                nav()
            )
        } else {
            format!("{}<div class='loading'></div>", nav())
        };
        let scale_row = |cusip: &str| {
            format!(
                "<tr><td><img data-cusip9='{}'></td><td>500,000</td><td>x</td><td>5.000</td>\
                 <td>2030</td><td></td><td></td><td><img data-rating='AA'></td><td><img data-rating='Aa2'></td></tr>",
                cusip
            )
        };
        let final_scale = format!(
            "{}<table id='dtSecurities'><tbody>{}{}{}</tbody></table>",
            nav(),
            scale_row("912828ZZ9"),
            scale_row("912828ZZ7"),
            scale_row("912828ZZ5")
        );

        ScriptedPage::with_states(vec![
            nav().to_string(),
            trades,
            ratings,
            disclosures,
            final_scale,
        ])
        .on_click_any("ul.nav.TA-nav li a", 1)
        .on_click_any("a#ui-id-3", 2)
        .on_click_any("a#ui-id-4", 3)
        .on_click_any("a#ui-id-5", 4)
    }

    #[tokio::test]
    async fn security_detail_writes_every_tab() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = security_page();
        let fetcher = RecordingFetcher::new();
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::SecurityDetail, "912828ZZ9", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        let report = SecurityDetail.run(&ctx, &task).await.unwrap().found().unwrap();

        let out = settings.output_dir.join("security-detail/912828ZZ9");
        let lines = |name: &str| {
            std::fs::read_to_string(out.join(name))
                .unwrap()
                .lines()
                .count()
        };
        assert_eq!(lines("trades.csv"), 3);
        assert_eq!(lines("disclosures.csv"), 2);
        assert_eq!(lines("final_scale.csv"), 4);
        assert_eq!(std::fs::read_to_string(out.join("ratings.txt")).unwrap(), "");
        assert_eq!(
            report.table("final_scale").unwrap().rows[0].fields(),
            ["912828ZZ9", "500,000", "5.000", "2030", "AA,Aa2"]
        );
    }

    #[tokio::test]
    async fn earlier_tabs_survive_a_later_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = security_page_with(false);
        let fetcher = RecordingFetcher::new();
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::SecurityDetail, "912828ZZ9", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        let err = SecurityDetail.run(&ctx, &task).await.unwrap_err();
        assert!(err.is_timeout());

        let out = settings.output_dir.join("security-detail/912828ZZ9");
        assert_eq!(
            std::fs::read_to_string(out.join("trades.csv")).unwrap().lines().count(),
            3
        );
        assert!(out.join("ratings.txt").exists());
        assert!(!out.join("disclosures.csv").exists());
        assert!(!out.join("final_scale.csv").exists());
    }

    #[tokio::test]
    async fn missing_cusip_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = ScriptedPage::new(
            "<div class='error-content'><span>No records found</span></div>",
        );
        let fetcher = RecordingFetcher::new();
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::SecurityDetail, "000000000", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        assert!(SecurityDetail.run(&ctx, &task).await.unwrap().is_empty());
        assert!(!settings.output_dir.exists());
    }

    fn issuer_table(first: usize, count: usize, next_disabled: bool) -> String {
        let rows: String = (first..first + count)
            .map(|i| {
                format!(
                    "<tr><td><a href='/IssuerHomePage/Issuer?id=ID{i}&amp;type=M'>Issuer {i}</a></td></tr>"
                )
            })
            .collect();
        format!(
            "<select name='lvIssuers_length'><option>10</option><option>100</option></select>\
             <table id='lvIssuers'><tbody>{}</tbody></table>\
             <a id='lvIssuers_next' class='paginate_button next{}'>Next</a>",
            rows,
            if next_disabled { " disabled" } else { "" }
        )
    }

    #[tokio::test]
    async fn state_issuers_collects_both_pages() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = ScriptedPage::with_states(vec![
            issuer_table(0, 10, false),
            issuer_table(0, 100, false),
            issuer_table(100, 50, true),
        ])
        .on_click(0, "select[name='lvIssuers_length']", 1)
        .on_click(1, "a#lvIssuers_next", 2);
        let fetcher = RecordingFetcher::new();
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::StateIssuers, "AK", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        StateIssuers.run(&ctx, &task).await.unwrap();

        let csv = std::fs::read_to_string(settings.output_dir.join("state-issuers/AK/issuers.csv"))
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 151);
        assert_eq!(lines[0], "Issuer Name,Issuer ID,Issuer Type");
        assert_eq!(lines[1], "Issuer 0,ID0,M");
        assert_eq!(lines[150], "Issuer 149,ID149,M");
    }

    fn listing(table: &str, files: &[&str]) -> String {
        let rows: String = files
            .iter()
            .map(|f| format!("<tr><td class='fidW'><a href='/{}'>{}</a></td></tr>", f, f))
            .collect();
        format!(
            "<select name='{t}_length'></select><table id='{t}'><tbody>{r}</tbody></table>",
            t = table,
            r = rows
        )
    }

    fn issuer_tabs() -> &'static str {
        "<ul><li data-cid='t-iss'>Issues</li><li data-cid='t-os'>OS</li><li data-cid='t-fcd'>FCD</li></ul>"
    }

    fn issuer_page(fcd: &str) -> ScriptedPage {
        let issues = format!(
            "{}<select name='lvIssues_length'></select><table id='lvIssues'><tbody>\
             <tr><td><a href='/IssueView/Details/ER1'>Series 2019</a></td><td>06/01/2019</td><td>2039</td></tr>\
             </tbody></table>",
            issuer_tabs()
        );
        ScriptedPage::with_states(vec![
            issuer_tabs().to_string(),
            issues,
            format!("{}{}", issuer_tabs(), listing("lvOS", &["P1-OS.pdf", "P2-OS.pdf"])),
            format!("{}{}", issuer_tabs(), fcd),
        ])
        .on_click_any("li[data-cid='t-iss']", 1)
        .on_click_any("li[data-cid='t-os']", 2)
        .on_click_any("li[data-cid='t-fcd']", 3)
    }

    #[tokio::test]
    async fn issuer_detail_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let fetcher = RecordingFetcher::new()
            .with_file("https://emma.msrb.org/P1-OS.pdf", b"%PDF 1".to_vec())
            .with_file("https://emma.msrb.org/P2-OS.pdf", b"%PDF 2".to_vec())
            .with_file("https://emma.msrb.org/F1.pdf", b"%PDF 3".to_vec());
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::IssuerDetail, "F5A1B2", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);

        let mut file_lists = Vec::new();
        for _ in 0..2 {
            let page = issuer_page(&listing("lvFCD", &["F1.pdf"]));
            let ctx = TaskContext {
                page: &page,
                fetcher: &fetcher,
                settings: &settings,
                debug: &debug,
                output: &output,
            };
            let report = IssuerDetail.run(&ctx, &task).await.unwrap().found().unwrap();
            file_lists.push(report.files);
        }

        assert_eq!(fetcher.count(), 3);
        assert_eq!(file_lists[0], file_lists[1]);
        let out = settings.output_dir.join("issuer-detail/F5A1B2");
        assert!(out.join("official_statements/P2-OS.pdf").exists());
        assert!(out.join("financial_disclosures/F1.pdf").exists());
        assert!(out.join("issues.csv").exists());
    }

    #[tokio::test]
    async fn hidden_no_record_marker_still_downloads_disclosures() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let fetcher = RecordingFetcher::new()
            .with_file("https://emma.msrb.org/P1-OS.pdf", b"%PDF 1".to_vec())
            .with_file("https://emma.msrb.org/P2-OS.pdf", b"%PDF 2".to_vec())
            .with_file("https://emma.msrb.org/F1.pdf", b"%PDF 3".to_vec());
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::IssuerDetail, "F5A1B2", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);

        let hidden = "<p class='no-record' style='display:none'>No records</p>";
        let loading = format!("<div id='t-fcd'>{}</div>", hidden);
        let rendered = format!(
            "{}<div id='t-fcd'>{}{}</div>",
            issuer_tabs(),
            hidden,
            listing("lvFCD", &["F1.pdf"])
        );
        let page = ScriptedPage::with_states(vec![
            issuer_tabs().to_string(),
            format!(
                "{}<select name='lvIssues_length'></select><table id='lvIssues'><tbody>\
                 <tr><td><a href='/IssueView/Details/ER1'>Series 2019</a></td><td>06/01/2019</td><td>2039</td></tr>\
                 </tbody></table>",
                issuer_tabs()
            ),
            format!("{}{}", issuer_tabs(), listing("lvOS", &["P1-OS.pdf", "P2-OS.pdf"])),
            format!("{}{}", issuer_tabs(), loading),
            rendered,
        ])
        .on_click_any("li[data-cid='t-iss']", 1)
        .on_click_any("li[data-cid='t-os']", 2)
        .on_click_any("li[data-cid='t-fcd']", 3)
        .renders_after(3, 4, 4);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        let report = IssuerDetail.run(&ctx, &task).await.unwrap().found().unwrap();
        assert_eq!(report.files.len(), 3);
        assert!(settings
            .output_dir
            .join("issuer-detail/F5A1B2/financial_disclosures/F1.pdf")
            .exists());
    }

    #[tokio::test]
    async fn issuer_without_financial_disclosures() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let fetcher = RecordingFetcher::new()
            .with_file("https://emma.msrb.org/P1-OS.pdf", b"%PDF 1".to_vec())
            .with_file("https://emma.msrb.org/P2-OS.pdf", b"%PDF 2".to_vec());
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::IssuerDetail, "F5A1B2", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let page = issuer_page("<div id='t-fcd'><p class='no-record'>No records</p></div>");
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };

        let report = IssuerDetail.run(&ctx, &task).await.unwrap().found().unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(fetcher.count(), 2);
    }
}
