//! Screenshot + markup dumps for post-mortem inspection of failed steps.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::browser::PageDriver;
use crate::models::sanitize_path_segment;

/// Writes `{label}_{UTC timestamp}.png` and `.html` into one directory.
#[derive(Debug, Clone)]
pub struct DebugCapture {
    dir: PathBuf,
}

impl DebugCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact file name stem for `label` at the current second.
    fn stem(label: &str) -> String {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        format!("{}_{}", sanitize_path_segment(label), timestamp)
    }

    /// Capture the page. Never fails: each artifact that cannot be produced
    /// or written is logged and skipped. Returns the files written.
    pub async fn capture(&self, page: &dyn PageDriver, label: &str) -> Vec<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(
                "Cannot create debug directory {}: {}",
                self.dir.display(),
                e
            );
            return Vec::new();
        }

        let stem = Self::stem(label);
        let mut written = Vec::with_capacity(2);

        match page.screenshot().await {
            Ok(png) => {
                let path = self.dir.join(format!("{}.png", stem));
                match tokio::fs::write(&path, png).await {
                    Ok(()) => written.push(path),
                    Err(e) => warn!("Failed to write screenshot {}: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Screenshot for '{}' failed: {}", label, e),
        }

        match page.content().await {
            Ok(html) => {
                let path = self.dir.join(format!("{}.html", stem));
                match tokio::fs::write(&path, html).await {
                    Ok(()) => written.push(path),
                    Err(e) => warn!("Failed to write markup {}: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Reading markup for '{}' failed: {}", label, e),
        }

        if !written.is_empty() {
            info!("Saved debug artifacts for '{}' to {}", label, self.dir.display());
        }
        written
    }
}
