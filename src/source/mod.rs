//! Input files handed to the importers
//!
//! Wraps a statement on disk with its sniffed MIME type and caches the
//! converted text, so that identification and extraction convert a PDF
//! only once.

use crate::error::{ImportError, Result};
use crate::pdf;
use once_cell::unsync::OnceCell;
use std::path::{Path, PathBuf};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JSON: &str = "application/json";
pub const MIME_QIF: &str = "application/x-qif";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    mimetype: &'static str,
    bytes: Vec<u8>,
    text: OnceCell<String>,
}

impl SourceFile {
    /// Read a file from disk and sniff its type
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ImportError::io(path, e))?;
        let mimetype = sniff_mimetype(path, &bytes);

        log::debug!("{}: {}", path.display(), mimetype);

        Ok(Self {
            path: path.to_path_buf(),
            mimetype,
            bytes,
            text: OnceCell::new(),
        })
    }

    /// In-memory file with text already converted
    pub fn from_text(name: impl Into<PathBuf>, mimetype: &'static str, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: name.into(),
            mimetype,
            bytes: text.as_bytes().to_vec(),
            text: OnceCell::from(text),
        }
    }

    /// In-memory file from raw bytes, type sniffed from name and content
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let path = name.into();
        let mimetype = sniff_mimetype(&path, &bytes);
        Self {
            path,
            mimetype,
            bytes,
            text: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full path as a string, used as `filename` in entry metadata
    pub fn name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn mimetype(&self) -> &'static str {
        self.mimetype
    }

    pub fn is_pdf(&self) -> bool {
        self.mimetype == MIME_PDF
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Converted text: `pdftotext` output for PDFs, UTF-8 content otherwise
    pub fn text(&self) -> Result<&str> {
        self.text
            .get_or_try_init(|| {
                if self.is_pdf() {
                    pdf::extract_text(&self.path)
                } else {
                    Ok(String::from_utf8_lossy(&self.bytes).into_owned())
                }
            })
            .map(String::as_str)
    }
}

fn sniff_mimetype(path: &Path, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(pdf::PDF_MAGIC) {
        return MIME_PDF;
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => MIME_PDF,
        "json" => MIME_JSON,
        "qif" => MIME_QIF,
        _ => MIME_TEXT,
    }
}
