//! Statement importers
//!
//! One importer per institution and document family. Each one recognizes its
//! documents from their content (or file name), tells where the document
//! should be filed, and extracts ledger directives from it.

pub mod amex;
pub mod binck;
pub mod boursorama;
pub mod generali;
pub mod payslip;
pub mod qif;

use crate::config::Config;
use crate::error::Result;
use crate::ledger::{sort_directives, Directive, Meta};
use crate::source::SourceFile;
use crate::text::parse_day_first_date;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Importer protocol
pub trait Importer {
    /// Source tag written in the `source` metadata of every entry
    fn name(&self) -> &'static str;

    /// Check if this importer can handle the given file
    fn identify(&self, file: &SourceFile) -> Result<bool>;

    /// Ledger account the document belongs to
    fn file_account(&self, file: &SourceFile) -> Result<String>;

    /// Normalized document name, without the date prefix
    fn file_name(&self, file: &SourceFile) -> Result<String>;

    /// Statement date
    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>>;

    /// Extract transactions and balance assertions
    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>>;
}

/// Result of extracting one file
#[derive(Debug, Clone, Serialize)]
pub struct ExtractResult {
    pub importer: String,
    pub entries: Vec<Directive>,
    pub warnings: Vec<String>,
}

/// All available importers, in identification order
pub fn get_importers(config: &Config) -> Vec<Box<dyn Importer>> {
    vec![
        Box::new(boursorama::BoursoramaImporter::new(config.clone())),
        Box::new(amex::AmexImporter::new(config.clone())),
        Box::new(binck::BinckImporter::new(config.clone())),
        Box::new(payslip::PayslipImporter::new(config.clone())),
        Box::new(generali::GeneraliImporter::new(config.clone())),
        Box::new(qif::QifImporter::new(config.clone())),
    ]
}

/// First importer claiming the file
pub fn identify<'a>(importers: &'a [Box<dyn Importer>], file: &SourceFile) -> Result<Option<&'a dyn Importer>> {
    for importer in importers {
        if importer.identify(file)? {
            log::info!("{}: identified by {}", file.basename(), importer.name());
            return Ok(Some(importer.as_ref()));
        }
    }
    Ok(None)
}

/// `<date> <name>`: the name the document is archived under
pub fn filing_name(importer: &dyn Importer, file: &SourceFile) -> Result<String> {
    let name = importer.file_name(file)?;
    Ok(match importer.file_date(file)? {
        Some(date) => format!("{} {}", date, name),
        None => name,
    })
}

/// Metadata key an importer sets on entries that need a manual review
pub const WARNING_META: &str = "warning";

/// Tolerance used when checking that multi-leg transactions balance
pub fn balance_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Identify the file and extract its entries
pub fn extract_file(importers: &[Box<dyn Importer>], file: &SourceFile) -> Result<Option<ExtractResult>> {
    let Some(importer) = identify(importers, file)? else {
        log::warn!("{}: no importer recognizes this file", file.basename());
        return Ok(None);
    };

    let mut entries = importer.extract(file)?;
    sort_directives(&mut entries);

    let tolerance = balance_tolerance();
    let mut warnings = Vec::new();
    for entry in &entries {
        if let Some(message) = entry.meta().get(WARNING_META) {
            let warning = format!("{} {}: {}", entry.date(), file.basename(), message);
            log::warn!("{}", warning);
            warnings.push(warning);
        }
    }

    for txn in entries.iter().filter_map(Directive::as_transaction) {
        if txn.meta.get(WARNING_META).is_some() || txn.is_incomplete() || txn.is_balanced(tolerance) {
            continue;
        }
        let residual = txn
            .residual()
            .iter()
            .filter(|(_, v)| v.abs() > tolerance)
            .map(|(c, v)| format!("{} {}", v, c))
            .collect::<Vec<_>>()
            .join(", ");
        let warning = format!(
            "{} {:?}: transaction does not balance (residual {})",
            txn.date,
            txn.payee.as_deref().unwrap_or(""),
            residual
        );
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    log::info!(
        "{}: {} entries extracted by {}",
        file.basename(),
        entries.len(),
        importer.name()
    );

    Ok(Some(ExtractResult {
        importer: importer.name().to_string(),
        entries,
        warnings,
    }))
}

/// First capture group of `re` in `text`
pub(crate) fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First capture of `re` that parses as a day-first date
pub(crate) fn first_date(re: &Regex, text: &str) -> Option<NaiveDate> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .find_map(|m| parse_day_first_date(m.as_str()).ok())
}

/// Metadata shared by every entry: origin, source tag, filing name
pub(crate) fn entry_meta(file: &SourceFile, lineno: usize, source: &str, document: Option<&str>) -> Meta {
    let mut meta = Meta::new(file.name(), lineno).with("source", source);
    if let Some(document) = document {
        meta.insert("document", document);
    }
    meta
}

/// Balance assertions apply at the start of the day
pub(crate) fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MIME_PDF, MIME_TEXT};

    fn config() -> Config {
        Config::with_accounts([("00040754305", "Actif:Boursorama:CCJoint")])
    }

    #[test]
    fn test_identify_picks_matching_importer() {
        let importers = get_importers(&config());
        let file = SourceFile::from_text("releve.pdf", MIME_PDF, "BOURSORAMA BANQUE\n");
        let importer = identify(&importers, &file).unwrap().unwrap();
        assert_eq!(importer.name(), "pdfbourso");

        let file = SourceFile::from_text("notes.txt", MIME_TEXT, "rien a voir");
        assert!(identify(&importers, &file).unwrap().is_none());
    }

    #[test]
    fn test_extract_file_unknown_document() {
        let importers = get_importers(&config());
        let file = SourceFile::from_text("notes.txt", MIME_TEXT, "rien a voir");
        assert!(extract_file(&importers, &file).unwrap().is_none());
    }

    #[test]
    fn test_capture() {
        let re = Regex::new(r"N° compte :\s*(\S+)").unwrap();
        assert_eq!(capture(&re, "N° compte : 12.34.567"), Some("12.34.567"));
        assert_eq!(capture(&re, "rien"), None);
    }
}
