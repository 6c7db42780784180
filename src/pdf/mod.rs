//! PDF to text conversion
//!
//! Statements are converted with `pdftotext -layout` so that column
//! positions survive; several importers infer the sign of an amount from
//! where it sits on the line. When poppler is not installed we fall back to
//! `pdf-extract`, which loses the layout.

use crate::error::{ImportError, Result};
use std::path::Path;
use std::process::Command;

/// PDF magic bytes
pub const PDF_MAGIC: &[u8] = b"%PDF";
/// Maximum PDF file size (100 MB)
pub const MAX_PDF_SIZE: usize = 100 * 1024 * 1024;

/// Check if pdftotext (poppler-utils) is available
pub fn is_pdftotext_installed() -> bool {
    Command::new("pdftotext")
        .arg("-v")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Convert a PDF to text with `pdftotext -layout <file> -`
pub fn pdf_to_text(path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ImportError::PdftotextMissing,
            _ => ImportError::PdfConversion(e.to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ImportError::PdfConversion(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn validate_pdf(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(ImportError::InvalidPdf("file too small".to_string()));
    }

    if bytes.len() > MAX_PDF_SIZE {
        return Err(ImportError::InvalidPdf(format!(
            "file too large ({} MB, maximum {} MB)",
            bytes.len() / (1024 * 1024),
            MAX_PDF_SIZE / (1024 * 1024)
        )));
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ImportError::InvalidPdf("missing PDF header".to_string()));
    }

    Ok(())
}

/// Extract the text of a PDF, preferring the layout-preserving converter
pub fn extract_text(path: &Path) -> Result<String> {
    if is_pdftotext_installed() {
        log::debug!("Converting {} with pdftotext", path.display());
        return pdf_to_text(path);
    }

    log::warn!(
        "pdftotext not found, using pdf-extract for {}: column based sign detection may be wrong",
        path.display()
    );

    let bytes = std::fs::read(path).map_err(|e| ImportError::io(path, e))?;
    validate_pdf(&bytes)?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ImportError::PdfConversion(e.to_string()))
}

/// True when a converted PDF has (almost) no text layer, e.g. a scan
pub fn is_text_too_short(extracted_text: &str, min_chars: usize) -> bool {
    let cleaned = extracted_text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{0}')
        .count();

    cleaned < min_chars
}
