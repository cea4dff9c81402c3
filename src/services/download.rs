//! Conditional download of listed files.
//!
//! Files are named from the last path segment of their URL; a file already
//! present under that name is never fetched again, so re-running a listing
//! only fetches what is missing.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::models::file_name_from_url;
use crate::scrapers::error::Result;
use crate::scrapers::http_client::FileFetcher;
use crate::services::output::persist_file;

/// Counts for one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Local paths of every listed file that is now on disk, in listing order.
    pub files: Vec<PathBuf>,
}

/// Download each URL into `dir` unless a file of the same name exists.
///
/// A failed fetch is logged and counted; the remaining files are still tried.
pub async fn download_missing(
    fetcher: &dyn FileFetcher,
    urls: &[String],
    dir: &Path,
) -> Result<DownloadSummary> {
    tokio::fs::create_dir_all(dir).await?;
    let mut summary = DownloadSummary::default();

    for url in urls {
        let Some(name) = file_name_from_url(url) else {
            warn!("Cannot derive a file name from {}; skipping", url);
            summary.failed += 1;
            continue;
        };
        let path = dir.join(&name);

        if tokio::fs::try_exists(&path).await? {
            debug!("Skipping existing {}", name);
            summary.skipped += 1;
            summary.files.push(path);
            continue;
        }

        info!("Downloading {} -> {}", url, name);
        match fetcher.fetch(url).await {
            Ok(file) => {
                let saved = persist_file(dir, &name, file.bytes).await?;
                summary.fetched += 1;
                summary.files.push(saved);
            }
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "{}: {} downloaded, {} already present, {} failed",
        dir.display(),
        summary.fetched,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingFetcher;

    const A: &str = "https://emma.msrb.org/P1234-P987-P1.pdf";
    const B: &str = "https://emma.msrb.org/ER5678-ER44.pdf?x=1";

    #[tokio::test]
    async fn second_run_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RecordingFetcher::new()
            .with_file(A, b"%PDF a".to_vec())
            .with_file(B, b"%PDF b".to_vec());
        let urls = vec![A.to_string(), B.to_string()];

        let first = download_missing(&fetcher, &urls, dir.path()).await.unwrap();
        assert_eq!(first.fetched, 2);
        assert_eq!(fetcher.count(), 2);

        let second = download_missing(&fetcher, &urls, dir.path()).await.unwrap();
        assert_eq!(second.fetched, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(fetcher.count(), 2);
        assert_eq!(first.files, second.files);
        assert!(dir.path().join("ER5678-ER44.pdf").exists());
    }

    #[tokio::test]
    async fn failed_fetch_does_not_stop_the_listing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RecordingFetcher::new().with_file(B, b"%PDF b".to_vec());
        let urls = vec![A.to_string(), B.to_string()];

        let summary = download_missing(&fetcher, &urls, dir.path()).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
        assert!(!dir.path().join("P1234-P987-P1.pdf").exists());
    }
}
