//! Runs one task inside its own browser session.

use std::sync::Arc;

use tracing::{error, info};

use super::browser::{SessionConfig, SessionLauncher, UserAgentPool};
use super::debug_capture::DebugCapture;
use super::error::{Outcome, Result};
use super::registry::TaskRegistry;
use super::task::{ScraperTask, TaskContext};
use crate::config::Settings;
use crate::models::ScrapeTask;
use crate::services::output::{OutputWriter, TaskReport};

/// Opens a session per task, runs it, captures debug artifacts on failure
/// and always closes the session.
pub struct TaskRunner {
    launcher: Arc<dyn SessionLauncher>,
    registry: TaskRegistry,
    settings: Arc<Settings>,
    user_agents: UserAgentPool,
    debug: DebugCapture,
}

impl TaskRunner {
    pub fn new(launcher: Arc<dyn SessionLauncher>, settings: Arc<Settings>) -> Self {
        let user_agents = UserAgentPool::new(
            settings.user_agents.pool.clone(),
            settings.user_agents.rotation,
        );
        let debug = DebugCapture::new(settings.debug_dir.clone());
        Self {
            launcher,
            registry: TaskRegistry::new(),
            settings,
            user_agents,
            debug,
        }
    }

    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `task` to completion.
    ///
    /// Launch failures propagate without a debug capture (there is no page
    /// yet). Anything failing after that is captured as
    /// `{kind}_{key}_{timeout|error}` before the error is returned.
    pub async fn run(&self, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let scraper = self.registry.get(task.kind)?;
        let target = scraper.build_target(&self.settings, &task.key)?;

        let mut config = SessionConfig::new(&self.settings.browser, self.user_agents.next());
        if let Some(site) = scraper.site(&self.settings) {
            config = config.with_site(site, &target);
        }

        info!("Starting {} for {}", task.kind, task.key);
        let session = self.launcher.open(config).await?;
        let output = OutputWriter::new(&task.destination);

        let result = {
            let ctx = TaskContext {
                page: session.page(),
                fetcher: session.fetcher(),
                settings: &self.settings,
                debug: &self.debug,
                output: &output,
            };
            let result = drive(scraper.as_ref(), &ctx, task, &target).await;
            if let Err(ref e) = result {
                error!("{} for {} failed: {}", task.kind, task.key, e);
                let label = format!("{}_{}", task.label(), e.debug_label());
                self.debug.capture(ctx.page, &label).await;
            }
            result
        };

        session.close().await;
        result
    }
}

async fn drive(
    scraper: &dyn ScraperTask,
    ctx: &TaskContext<'_>,
    task: &ScrapeTask,
    target: &str,
) -> Result<Outcome<TaskReport>> {
    scraper.open_target(ctx, target).await?;
    let outcome = scraper.run(ctx, task).await?;
    if outcome.is_empty() {
        info!("{} for {}: nothing found", task.kind, task.key);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskKind;
    use crate::testing::{fast_settings, RecordingFetcher, ScriptedLauncher, ScriptedPage};

    #[tokio::test]
    async fn failure_captures_debug_and_closes_session() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(fast_settings(dir.path()));
        let launcher = Arc::new(ScriptedLauncher::new(
            ScriptedPage::new("<p>Service unavailable</p>"),
            RecordingFetcher::new(),
        ));
        let runner = TaskRunner::new(launcher.clone(), settings.clone());

        let task = ScrapeTask::in_dir(TaskKind::IssueDetail, "P21234567", &settings.output_dir);
        let err = runner.run(&task).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(launcher.was_closed());

        let names: Vec<String> = std::fs::read_dir(&settings.debug_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names
            .iter()
            .all(|n| n.starts_with("issue-detail_P21234567_timeout_")));
    }

    #[tokio::test]
    async fn session_is_seeded_from_site_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = fast_settings(dir.path());
        settings.emma.cookies = Some("Disclaimer6=msrborg".to_string());
        let settings = Arc::new(settings);
        let launcher = Arc::new(ScriptedLauncher::new(
            ScriptedPage::new("<p></p>"),
            RecordingFetcher::new(),
        ));
        let runner = TaskRunner::new(launcher.clone(), settings.clone());

        let task = ScrapeTask::aggregate(TaskKind::IssueDetail, "P2");
        let _ = runner.run(&task).await;

        let config = launcher.last_config.lock().unwrap().clone().unwrap();
        assert_eq!(config.cookies[0].domain, "emma.msrb.org");
        assert_eq!(
            config.extra_headers.get("Cookie").map(String::as_str),
            Some("Disclaimer6=msrborg")
        );
        assert_eq!(
            launcher.page.visited(),
            vec!["https://emma.msrb.org/IssueView/Details/P2".to_string()]
        );
    }

    #[tokio::test]
    async fn invalid_key_never_opens_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Arc::new(ScriptedLauncher::new(
            ScriptedPage::new(""),
            RecordingFetcher::new(),
        ));
        let runner = TaskRunner::new(launcher.clone(), Arc::new(fast_settings(dir.path())));

        assert!(runner
            .run(&ScrapeTask::aggregate(TaskKind::NameLookup, ""))
            .await
            .is_err());
        assert_eq!(launcher.opened.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
