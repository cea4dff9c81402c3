//! Browser-driven scrapers and the engines they are built from.
//!
//! Every task runs in its own browser session (see [`runner::TaskRunner`]);
//! site adapters are written against [`browser::PageDriver`] and
//! [`http_client::FileFetcher`] so they can be exercised without a browser.

pub mod browser;
pub mod consent;
pub mod debug_capture;
pub mod emma;
pub mod error;
pub mod fitch;
pub mod frankfurt;
pub mod http_client;
pub mod pagination;
pub mod prospectus;
pub mod registry;
pub mod runner;
pub mod tabs;
pub mod task;

pub use error::{Outcome, Result, ScrapeError};
pub use registry::TaskRegistry;
pub use runner::TaskRunner;
pub use task::{ScraperTask, TaskContext};
