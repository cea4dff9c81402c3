//! Browser sessions and the page protocol scrapers are written against.
//!
//! Uses chromiumoxide (CDP) when the `browser` feature is enabled; without
//! it, opening a session fails with a rebuild hint.

mod chrome;
mod config;
mod cookies;
mod page;
mod selection;
mod session;

pub use chrome::ChromeLauncher;
#[cfg(feature = "browser")]
pub use chrome::{find_chrome, BrowserSession, ChromePage};
pub use config::SessionConfig;
pub use cookies::{cookies_from_header, merge_cookie_header, parse_cookie_header, BrowserCookie};
pub use page::{PageDriver, POLL_INTERVAL};
pub use selection::{
    FixedStrategy, RandomStrategy, RoundRobinStrategy, UserAgentPool, UserAgentRotation,
    UserAgentStrategy, IMPERSONATE_USER_AGENTS,
};
pub use session::{Session, SessionLauncher};
