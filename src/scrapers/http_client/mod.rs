//! Direct file fetches that reuse a browser session's cookies and headers.

mod headers;

pub use headers::SharedHeaders;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::{Result, ScrapeError};

/// A fetched file body.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fetches raw bytes outside of page navigation.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// GET `url`; non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedFile>;
}

/// HTTP client authenticated with the owning browser session's state.
#[derive(Clone)]
pub struct SessionHttpClient {
    client: Client,
    headers: SharedHeaders,
}

impl SessionHttpClient {
    /// Create a client sending `user_agent` plus whatever `headers` holds at
    /// request time.
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        proxy: Option<&str>,
        headers: SharedHeaders,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            headers,
        })
    }
}

#[async_trait]
impl FileFetcher for SessionHttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedFile> {
        let mut request = self.client.get(url);
        for (name, value) in self.headers.snapshot() {
            request = request.header(name, value);
        }

        debug!("Fetching {}", url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?.to_vec();
        debug!("Fetched {} bytes from {}", bytes.len(), url);

        Ok(FetchedFile {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            bytes,
        })
    }
}
