//! Prospectus lookup by ISIN through web search.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::{Outcome, Result};
use super::task::{require_key, ScraperTask, TaskContext};
use crate::config::{Settings, SiteConfig};
use crate::discovery::{DocumentDiscovery, DocumentVerifier, KeywordVerifier};
use crate::models::{ScrapeTask, TaskKind};
use crate::ocr::ExtractionChain;
use crate::services::output::{persist_file, TaskReport};

fn query_for(isin: &str) -> String {
    format!("{} prospectus pdf", isin)
}

/// Searches the web for a prospectus and keeps the first file whose text
/// reads like one.
pub struct ProspectusSearch {
    chain: Arc<ExtractionChain>,
}

impl ProspectusSearch {
    pub fn new(chain: Arc<ExtractionChain>) -> Self {
        Self { chain }
    }
}

impl Default for ProspectusSearch {
    fn default() -> Self {
        Self::new(Arc::new(ExtractionChain::default()))
    }
}

#[async_trait]
impl ScraperTask for ProspectusSearch {
    fn kind(&self) -> TaskKind {
        TaskKind::ProspectusSearch
    }

    fn site<'s>(&self, _settings: &'s Settings) -> Option<&'s SiteConfig> {
        None
    }

    fn build_target(&self, settings: &Settings, key: &str) -> Result<String> {
        let isin = require_key(self.kind(), key)?.to_uppercase();
        let engine = crate::discovery::create_search_engine(settings.search.engine);
        Ok(engine.search_url(&query_for(&isin), settings.search.max_results))
    }

    /// Every search attempt navigates on its own.
    async fn open_target(&self, _ctx: &TaskContext<'_>, _target: &str) -> Result<()> {
        Ok(())
    }

    async fn run(&self, ctx: &TaskContext<'_>, task: &ScrapeTask) -> Result<Outcome<TaskReport>> {
        let isin = task.key.to_uppercase();
        let extension = ctx.settings.verification.extension.trim_start_matches('.');
        let name = format!("{}-prospectus.{}", isin, extension);

        if let Some(dir) = ctx.output.directory() {
            let existing = dir.join(&name);
            if tokio::fs::try_exists(&existing).await? {
                info!("Skipping {}: {} already saved", isin, existing.display());
                let mut report = TaskReport::default();
                report.files.push(existing);
                return Ok(Outcome::Found(report));
            }
        }

        let search = &ctx.settings.search;
        let discovery = DocumentDiscovery::from_settings(ctx.settings);
        let verifier = DocumentVerifier::new(
            self.chain.clone(),
            KeywordVerifier::from_config(&ctx.settings.verification),
        );

        let found = discovery
            .find_document(ctx, &query_for(&isin), search.max_results, search.retries, &verifier)
            .await?;
        let Outcome::Found(doc) = found else {
            warn!("No verified prospectus found for {}", isin);
            return Ok(Outcome::Empty);
        };
        info!(
            "Prospectus for {} from {} ({} keyword matches)",
            isin, doc.file_url, doc.keyword_matches
        );

        let mut report = TaskReport::default();
        if let Some(dir) = ctx.output.directory() {
            let path = persist_file(dir, &name, doc.bytes).await?;
            info!("Saved {}", path.display());
            report.files.push(path.clone());
            report.written.push(path);
        }
        report
            .texts
            .push(("source.txt".to_string(), doc.file_url));
        Ok(Outcome::Found(report))
    }
}
