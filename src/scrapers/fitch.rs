//! Security name lookup on Fitch Ratings.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::{Outcome, Result};
use super::task::{require_key, ScraperTask, TaskContext};
use crate::config::{Settings, SiteConfig};
use crate::models::{ScrapeTask, TaskKind};
use crate::services::output::TaskReport;

pub const BASE_URL: &str = "https://www.fitchratings.com";

const NO_RESULTS: &str = "div.column__left.search__no-results--title";
const RESULT_LINK: &str = "h3.heading--5 a";

/// The results page renders slowly; never wait less than this.
const MIN_RESULT_WAIT: Duration = Duration::from_secs(10);

/// Looks an ISIN up and reads the security name from the first result.
pub struct NameLookup;

#[async_trait]
impl ScraperTask for NameLookup {
    fn kind(&self) -> TaskKind {
        TaskKind::NameLookup
    }

    fn site<'s>(&self, settings: &'s Settings) -> Option<&'s SiteConfig> {
        Some(&settings.fitch)
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let isin = require_key(self.kind(), key)?;
        Ok(format!(
            "{}/search/?expanded=issue&isIdentifier=true&query={}",
            settings.fitch.base_url(BASE_URL),
            urlencoding::encode(&isin.to_uppercase())
        ))
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let wait = ctx.action_timeout().max(MIN_RESULT_WAIT);
        let winner = ctx.page.wait_for_any(&[NO_RESULTS, RESULT_LINK], wait).await?;
        if winner == 0 {
            info!("No Fitch results for {}", task.key);
            return Ok(Outcome::Empty);
        }

        let name = ctx
            .page
            .attribute(RESULT_LINK, "aria-label")
            .await?
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let Some(name) = name else {
            warn!("Result link for {} has no aria-label", task.key);
            return Ok(Outcome::Empty);
        };

        info!("{} is {}", task.key, name);
        let mut report = TaskReport::default();
        report.add_text(ctx.output, "name.txt", name).await?;
        Ok(Outcome::Found(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::debug_capture::DebugCapture;
    use crate::services::output::OutputWriter;
    use crate::testing::{fast_settings, RecordingFetcher, ScriptedPage};

    async fn lookup(html: &str) -> (tempfile::TempDir, Outcome<TaskReport>) {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = ScriptedPage::new(html);
        let fetcher = RecordingFetcher::new();
        let debug = DebugCapture::new(&settings.debug_dir);
        let task = ScrapeTask::in_dir(TaskKind::NameLookup, "US912828ZZ90", &settings.output_dir);
        let output = OutputWriter::new(&task.destination);
        let ctx = TaskContext {
            page: &page,
            fetcher: &fetcher,
            settings: &settings,
            debug: &debug,
            output: &output,
        };
        let outcome = NameLookup.run(&ctx, &task).await.unwrap();
        (dir, outcome)
    }

    #[test]
    fn target_carries_the_isin() {
        assert_eq!(
            NameLookup
                .build_target(&Settings::default(), "us912828zz90")
                .unwrap(),
            "https://www.fitchratings.com/search/?expanded=issue&isIdentifier=true&query=US912828ZZ90"
        );
    }

    #[tokio::test]
    async fn reads_name_from_aria_label() {
        let (dir, outcome) = lookup(
            "<h3 class='heading--5'><a aria-label=' Alaska Housing Finance Corp 5% 2030 ' href='/x'>AHFC</a></h3>",
        )
        .await;
        let report = outcome.found().unwrap();
        assert_eq!(report.text("name.txt"), Some("Alaska Housing Finance Corp 5% 2030"));
        let written = dir.path().join("out/name-lookup/US912828ZZ90/name.txt");
        assert_eq!(
            std::fs::read_to_string(written).unwrap(),
            "Alaska Housing Finance Corp 5% 2030"
        );
    }

    #[tokio::test]
    async fn no_results_marker_is_empty() {
        let (_dir, outcome) = lookup(
            "<div class='column__left search__no-results--title'>No results</div>",
        )
        .await;
        assert!(outcome.is_empty());
    }
}
