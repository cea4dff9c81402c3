//! Layered text extraction for fetched PDF bytes.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Handle command output, extracting stdout on success or returning appropriate error.
pub(super) fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Check command status, returning appropriate error on failure.
pub(super) fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ExtractionError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ExtractionError::ExtractionFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Copy bytes into a named temp file so external tools can read them.
pub(super) fn spill_to_temp(bytes: &[u8]) -> Result<NamedTempFile, ExtractionError> {
    let mut file = tempfile::Builder::new()
        .prefix("muniscrape-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("{0} produced no text")]
    Empty(&'static str),

    #[error("Extraction aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One way of turning file bytes into text.
#[async_trait]
pub trait TextExtraction: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Run blocking extraction work off the async runtime.
///
/// A panic inside `f` surfaces as [`ExtractionError::Aborted`] instead of
/// unwinding into the caller.
pub(super) async fn run_blocking<F>(f: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(ExtractionError::Aborted(e.to_string())),
    }
}

/// In-process extraction with the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtract;

#[async_trait]
impl TextExtraction for PdfExtract {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let bytes = bytes.to_vec();
        run_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))
        })
        .await
    }
}

/// Poppler's `pdftotext` command-line tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfToText;

impl PdfToText {
    fn run(file_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(file_path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }
}

#[async_trait]
impl TextExtraction for PdfToText {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let file = spill_to_temp(bytes)?;
        run_blocking(move || Self::run(file.path())).await
    }
}

/// Tries each method in order until one yields non-blank text.
pub struct ExtractionChain {
    methods: Vec<Box<dyn TextExtraction>>,
}

impl Default for ExtractionChain {
    /// pdf-extract, then pdftotext, then page OCR with Tesseract.
    fn default() -> Self {
        Self::new(vec![
            Box::new(PdfExtract),
            Box::new(PdfToText),
            Box::new(super::tesseract::TesseractOcr::default()),
        ])
    }
}

impl ExtractionChain {
    pub fn new(methods: Vec<Box<dyn TextExtraction>>) -> Self {
        Self { methods }
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Extract text from `bytes`, or `None` if every method failed or came
    /// back blank.
    pub async fn extract_text(&self, bytes: &[u8]) -> Option<String> {
        for method in &self.methods {
            match method.extract(bytes).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Extracted {} chars with {}", text.len(), method.name());
                    return Some(text);
                }
                Ok(_) => debug!("{}", ExtractionError::Empty(method.name())),
                Err(e) => warn!("{} failed: {}", method.name(), e),
            }
        }
        None
    }
}
