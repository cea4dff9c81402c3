//! Named sub-views of one detail page.

use std::future::Future;
use std::time::Duration;

use tracing::info;

use super::browser::PageDriver;
use super::consent::ConsentHandler;
use super::error::{Outcome, Result};

/// Controls and markers of one tab.
#[derive(Debug, Clone, Copy)]
pub struct Tab<'a> {
    /// Used in log lines.
    pub name: &'a str,
    pub control: &'a str,
    /// When set, the control clicked is the first match containing this text.
    pub label: Option<&'a str>,
    /// Present once the tab's content has rendered.
    pub ready: &'a str,
    /// Shown instead of `ready` when the tab has nothing to show; only
    /// counts once visible.
    pub no_records: Option<&'a str>,
}

/// Open `tab` and run `extractor` against its content.
///
/// The overlay is re-checked after the click since the tab may navigate.
/// Returns `Empty` without running the extractor when the no-records marker
/// becomes visible before the content is ready.
pub async fn extract_tab<T, Fut>(
    page: &dyn PageDriver,
    consent: Option<&ConsentHandler>,
    tab: &Tab<'_>,
    timeout: Duration,
    extractor: Fut,
) -> Result<Outcome<T>>
where
    Fut: Future<Output = Result<T>>,
{
    info!("Opening {} tab", tab.name);
    page.wait_for(tab.control, timeout).await?;
    match tab.label {
        Some(label) => page.click_text(tab.control, label).await?,
        None => page.click(tab.control).await?,
    }
    if let Some(consent) = consent {
        consent.maybe_dismiss(page).await;
    }

    match tab.no_records {
        Some(no_records) => {
            if page
                .wait_for_ready_or_visible(tab.ready, no_records, timeout)
                .await?
                == 1
            {
                info!("No records in {} tab", tab.name);
                return Ok(Outcome::Empty);
            }
        }
        None => page.wait_for(tab.ready, timeout).await?,
    }

    extractor.await.map(Outcome::Found)
}
