//! Last-resort OCR: rasterize with pdftoppm, read pages with Tesseract.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tempfile::TempDir;

use super::extractor::{
    check_cmd_status, handle_cmd_output, run_blocking, spill_to_temp, ExtractionError,
    TextExtraction,
};

/// Tesseract OCR over rasterized PDF pages.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    dpi: u32,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

impl TesseractOcr {
    fn ocr_pdf(&self, file_path: &Path) -> Result<String, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path();

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &self.dpi.to_string()])
            .arg(file_path)
            .arg(temp_path.join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            "pdftoppm failed to convert PDF",
        )?;

        let images = page_images(temp_path)?;
        if images.is_empty() {
            return Err(ExtractionError::ExtractionFailed(
                "No images generated from PDF".to_string(),
            ));
        }

        let mut all_text = String::new();
        for (i, image_path) in images.iter().enumerate() {
            match self.run_tesseract(image_path) {
                Ok(text) => {
                    if !all_text.is_empty() {
                        all_text.push_str("\n\n");
                    }
                    all_text.push_str(&text);
                }
                Err(e) => {
                    tracing::warn!("OCR failed for page {}: {}", i + 1, e);
                }
            }
        }

        Ok(all_text)
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        handle_cmd_output(output, "tesseract (install tesseract-ocr)", "tesseract failed")
    }
}

/// PNGs written by pdftoppm, in page order (`page-01.png`, `page-02.png`, ...).
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut images: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    images.sort();
    Ok(images)
}

#[async_trait]
impl TextExtraction for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let file = spill_to_temp(bytes)?;
        let this = self.clone();
        run_blocking(move || this.ocr_pdf(file.path())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_images_are_sorted_pngs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-02.png", "page-01.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let images = page_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["page-01.png", "page-02.png"]);
    }
}
