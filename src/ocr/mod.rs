//! Text extraction from downloaded documents.
//!
//! Extraction falls back across methods because real-world PDFs vary too
//! much for any one of them to be reliable:
//! - `pdf-extract` in-process
//! - pdftotext (Poppler)
//! - pdftoppm + Tesseract OCR for scanned files

mod extractor;
mod tesseract;

pub use extractor::{
    check_binary, ExtractionChain, ExtractionError, PdfExtract, PdfToText, TextExtraction,
};
pub use tesseract::TesseractOcr;

/// External tools the fallback chain can use, and whether each is on PATH.
pub fn check_tools() -> Vec<(String, bool)> {
    ["pdftotext", "pdftoppm", "tesseract"]
        .iter()
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect()
}
