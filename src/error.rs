//! Error types shared by the importers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while identifying, converting or extracting a statement
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pdftotext is not installed (install poppler-utils)")]
    PdftotextMissing,

    #[error("PDF conversion failed: {0}")]
    PdfConversion(String),

    #[error("invalid PDF file: {0}")]
    InvalidPdf(String),

    #[error("no ledger account configured for '{0}'")]
    UnknownAccount(String),

    #[error("{importer}: field not found in statement: {field}")]
    MissingField {
        importer: &'static str,
        field: &'static str,
    },

    #[error("invalid number: '{0}'")]
    InvalidNumber(String),

    #[error("invalid date: '{0}'")]
    InvalidDate(String),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{importer}: unsupported document ({reason})")]
    Unsupported {
        importer: &'static str,
        reason: String,
    },
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing(importer: &'static str, field: &'static str) -> Self {
        Self::MissingField { importer, field }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
