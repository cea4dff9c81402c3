//! User-agent selection strategies for rotating pools.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Real browser user agents used when no pool is configured.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Strategy for choosing the user agent of the next session.
pub trait UserAgentStrategy: Send + Sync {
    /// Select an index into a pool of `count` agents; `None` if the pool is empty.
    fn select(&self, count: usize) -> Option<usize>;
}

/// Always the first agent in the pool.
pub struct FixedStrategy;

impl UserAgentStrategy for FixedStrategy {
    fn select(&self, count: usize) -> Option<usize> {
        (count > 0).then_some(0)
    }
}

/// Round-robin selection - rotates through agents consecutively.
pub struct RoundRobinStrategy {
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentStrategy for RoundRobinStrategy {
    fn select(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % count)
    }
}

/// Random selection - picks a random agent each time.
pub struct RandomStrategy;

impl UserAgentStrategy for RandomStrategy {
    fn select(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..count))
    }
}

/// Configured rotation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAgentRotation {
    Fixed,
    RoundRobin,
    #[default]
    Random,
}

impl UserAgentRotation {
    /// Create the strategy for this policy.
    pub fn create_strategy(&self) -> Box<dyn UserAgentStrategy> {
        match self {
            UserAgentRotation::Fixed => Box::new(FixedStrategy),
            UserAgentRotation::RoundRobin => Box::new(RoundRobinStrategy::new()),
            UserAgentRotation::Random => Box::new(RandomStrategy),
        }
    }
}

/// A pool of user agents plus the strategy that rotates through it.
pub struct UserAgentPool {
    agents: Vec<String>,
    strategy: Box<dyn UserAgentStrategy>,
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>, rotation: UserAgentRotation) -> Self {
        Self {
            agents,
            strategy: rotation.create_strategy(),
        }
    }

    /// Next agent to use; falls back to a built-in agent if the pool is empty.
    pub fn next(&self) -> String {
        self.strategy
            .select(self.agents.len())
            .and_then(|i| self.agents.get(i))
            .cloned()
            .unwrap_or_else(|| IMPERSONATE_USER_AGENTS[0].to_string())
    }
}
