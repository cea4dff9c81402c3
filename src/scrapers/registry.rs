//! Dispatch table from task kind to implementation.

use std::collections::HashMap;
use std::sync::Arc;

use super::emma::{IssueDetail, IssuerDetail, SecurityDetail, StateIssuers};
use super::error::{Result, ScrapeError};
use super::fitch::NameLookup;
use super::frankfurt::PriceHistory;
use super::prospectus::ProspectusSearch;
use super::task::ScraperTask;
use crate::models::TaskKind;

/// Registry of scraper tasks.
pub struct TaskRegistry {
    tasks: HashMap<TaskKind, Arc<dyn ScraperTask>>,
}

impl TaskRegistry {
    /// Registry with every built-in task.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SecurityDetail));
        registry.register(Arc::new(StateIssuers));
        registry.register(Arc::new(IssuerDetail));
        registry.register(Arc::new(IssueDetail));
        registry.register(Arc::new(PriceHistory));
        registry.register(Arc::new(NameLookup));
        registry.register(Arc::new(ProspectusSearch::default()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Add or replace the implementation for the task's kind.
    pub fn register(&mut self, task: Arc<dyn ScraperTask>) {
        self.tasks.insert(task.kind(), task);
    }

    pub fn get(&self, kind: TaskKind) -> Result<Arc<dyn ScraperTask>> {
        self.tasks
            .get(&kind)
            .cloned()
            .ok_or_else(|| ScrapeError::UnknownTask(kind.to_string()))
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<TaskKind> {
        let mut kinds: Vec<_> = self.tasks.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_registered() {
        assert_eq!(TaskRegistry::new().kinds(), TaskKind::ALL.to_vec());
    }

    #[test]
    fn missing_kind_is_unknown_task() {
        let err = TaskRegistry::empty()
            .get(TaskKind::NameLookup)
            .err()
            .unwrap();
        assert!(matches!(err, ScrapeError::UnknownTask(k) if k == "name-lookup"));
    }
}
