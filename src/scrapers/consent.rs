//! Consent and terms-of-use overlays.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::browser::{merge_cookie_header, PageDriver};
use super::error::Result;

/// What a dismissal attempt saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentState {
    pub dismissed: bool,
    /// Cookie header after dismissal, as now sent with every request.
    pub cookie_header: Option<String>,
}

/// Dismisses one known overlay by clicking its accept control.
#[derive(Debug, Clone)]
pub struct ConsentHandler {
    selector: String,
    settle: Duration,
    detach_timeout: Duration,
}

impl ConsentHandler {
    pub fn new(selector: impl Into<String>, settle: Duration, detach_timeout: Duration) -> Self {
        Self {
            selector: selector.into(),
            settle,
            detach_timeout,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Dismiss the overlay if it is showing. A no-op when it is not, and
    /// never fails: errors are logged and the page is left as it is.
    pub async fn maybe_dismiss(&self, page: &dyn PageDriver) -> ConsentState {
        match self.dismiss(page).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Consent dismissal via {} failed: {}", self.selector, e);
                ConsentState::default()
            }
        }
    }

    async fn dismiss(&self, page: &dyn PageDriver) -> Result<ConsentState> {
        if !page.exists(&self.selector).await? {
            debug!("No consent overlay ({})", self.selector);
            return Ok(ConsentState::default());
        }

        info!("Dismissing consent overlay");
        page.scroll_into_view(&self.selector).await?;
        tokio::time::sleep(self.settle).await;
        page.click(&self.selector).await?;
        page.wait_for_detached(&self.selector, self.detach_timeout)
            .await?;

        let header = refresh_cookie_header(page).await?;
        Ok(ConsentState {
            dismissed: true,
            cookie_header: Some(header),
        })
    }
}

/// Fold the page's current cookies into the session's `Cookie` header so
/// direct fetches carry the same state as the page.
pub async fn refresh_cookie_header(page: &dyn PageDriver) -> Result<String> {
    let cookies = page.cookies().await?;
    let mut headers = page.extra_headers().await;

    let existing_key = headers
        .keys()
        .find(|k| k.eq_ignore_ascii_case("cookie"))
        .cloned();
    let existing = existing_key.as_ref().and_then(|k| headers.get(k)).cloned();
    let merged = merge_cookie_header(existing.as_deref(), &cookies);

    headers.insert(
        existing_key.unwrap_or_else(|| "Cookie".to_string()),
        merged.clone(),
    );
    page.set_extra_headers(headers).await?;
    debug!("Session cookie header refreshed ({} cookies)", cookies.len());
    Ok(merged)
}
