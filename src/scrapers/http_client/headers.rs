//! Header set shared between a browser session and its HTTP client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Extra headers (including the cookie header) of one session.
///
/// Cloning shares the same underlying set, so the HTTP client sees updates
/// made after consent dismissal.
#[derive(Debug, Clone, Default)]
pub struct SharedHeaders(Arc<RwLock<HashMap<String, String>>>);

impl SharedHeaders {
    pub fn new(initial: HashMap<String, String>) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, headers: HashMap<String, String>) {
        match self.0.write() {
            Ok(mut guard) => *guard = headers,
            Err(poisoned) => *poisoned.into_inner() = headers,
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.snapshot()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}
