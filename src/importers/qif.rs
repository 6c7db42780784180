//! QIF Importer
//!
//! Bank exports in Quicken Interchange Format, as downloaded from the
//! Boursorama web site. The file name is the account number, browsers may
//! append ` (1)` to repeated downloads.
//!
//! ```text
//! !Type:Bank
//! D15/01/2024
//! T-45.10
//! PPRLV SEPA EDF
//! ^
//! ```
//!
//! Operations are not categorized: each one is booked against a single
//! to-classify account and flagged for review.

use super::{entry_meta, Importer};
use crate::config::Config;
use crate::error::Result;
use crate::ledger::{Amount, Directive, Flag, Posting, Transaction};
use crate::source::SourceFile;
use crate::text::{parse_day_first_date, parse_plain_decimal};
use chrono::NaiveDate;
use encoding_rs::WINDOWS_1250;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const NAME: &str = "qif";

static RE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.qif$").unwrap());
static RE_ACCOUNT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s?(\(\d*\))?\.qif$").unwrap());

/// One `^`-terminated record
#[derive(Debug, Clone, PartialEq)]
pub struct QifRecord {
    /// Position of the record in the file, starting at 1
    pub index: usize,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payee: Option<String>,
}

/// Decode a QIF export, Windows-1250 encoded
pub fn decode(bytes: &[u8]) -> String {
    let (text, _, had_errors) = WINDOWS_1250.decode(bytes);
    if had_errors {
        log::warn!("QIF file contains bytes invalid in Windows-1250");
    }
    text.into_owned()
}

/// Parse the records of a QIF file, skipping account headers
pub fn parse_records(text: &str) -> Vec<QifRecord> {
    let mut records = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut index = 0;

    for line in text.lines().map(|l| l.trim_end_matches('\r')) {
        if line.trim() == "^" {
            index += 1;
            if let Some(record) = parse_record(index, &chunk) {
                records.push(record);
            }
            chunk.clear();
        } else {
            chunk.push(line);
        }
    }

    if chunk.iter().any(|l| !l.trim().is_empty()) {
        index += 1;
        if let Some(record) = parse_record(index, &chunk) {
            records.push(record);
        }
    }

    records
}

fn parse_record(index: usize, lines: &[&str]) -> Option<QifRecord> {
    let lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .collect();

    match lines.first() {
        None => return None,
        Some(first) if first.trim() == "!Account" => return None,
        Some(_) => {}
    }

    let mut date = None;
    let mut amount = None;
    let mut payee = None;

    for line in lines {
        let mut chars = line.chars();
        let Some(code) = chars.next() else {
            continue;
        };
        let value = chars.as_str().trim();

        match code {
            '!' => {}
            'D' => match parse_day_first_date(value) {
                Ok(d) => date = Some(d),
                Err(e) => log::warn!("QIF record {}: {}", index, e),
            },
            'T' => match parse_plain_decimal(value) {
                Ok(a) => amount = Some(a),
                Err(e) => log::warn!("QIF record {}: {}", index, e),
            },
            'P' => payee = Some(value.to_string()).filter(|p| !p.is_empty()),
            _ => {}
        }
    }

    match (date, amount) {
        (Some(date), Some(amount)) => Some(QifRecord {
            index,
            date,
            amount,
            payee,
        }),
        _ => {
            log::warn!("QIF record {} has no date or amount, skipped", index);
            None
        }
    }
}

pub struct QifImporter {
    config: Config,
}

impl QifImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Account number from the file name: `00040754305 (2).qif` -> `00040754305`
    pub fn account_key(basename: &str) -> String {
        RE_ACCOUNT_SUFFIX.replace(basename, "").into_owned()
    }
}

impl Importer for QifImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        Ok(RE_EXTENSION.is_match(&file.basename()))
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        let key = Self::account_key(&file.basename());
        Ok(self.config.account(&key)?.to_string())
    }

    fn file_name(&self, file: &SourceFile) -> Result<String> {
        Ok(file.basename())
    }

    /// Date of the latest operation
    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        let records = parse_records(&decode(file.bytes()));
        Ok(records.iter().map(|r| r.date).max())
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        let account = self.file_account(file)?;
        let unclassified = &self.config.qif.unclassified_account;

        let entries = parse_records(&decode(file.bytes()))
            .into_iter()
            .map(|record| {
                Directive::Transaction(Transaction {
                    meta: entry_meta(file, record.index, NAME, None),
                    date: record.date,
                    flag: Flag::Warning,
                    payee: Some(record.payee.unwrap_or_else(|| "inconnu".to_string())),
                    narration: None,
                    postings: vec![
                        Posting::new(&account, Amount::eur(record.amount)),
                        Posting::new(unclassified, Amount::eur(-record.amount)),
                    ],
                })
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const EXPORT: &str = "!Account\nN00040754305\nTBank\n^\n!Type:Bank\nD15/01/2024\nT-1,045.10\nPPRLV SEPA EDF\n^\nD20/01/2024\nT2500.00\nPVIR SEPA EMPLOYEUR\n^\nD18/01/2024\nT-3.00\n^\nPSANS DATE\nT-1.00\n^\n";

    fn importer() -> QifImporter {
        QifImporter::new(Config::with_accounts([("00040754305", "Actif:Boursorama:CCJoint")]))
    }

    #[test]
    fn test_account_key() {
        assert_eq!(QifImporter::account_key("00040754305.qif"), "00040754305");
        assert_eq!(QifImporter::account_key("00040754305 (2).qif"), "00040754305");
        assert_eq!(QifImporter::account_key("00040754305(1).QIF"), "00040754305");
    }

    #[test]
    fn test_parse_records() {
        let records = parse_records(EXPORT);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].index, 2);
        assert_eq!(records[0].amount, d("-1045.10"));
        assert_eq!(records[0].payee.as_deref(), Some("PRLV SEPA EDF"));
        assert_eq!(records[2].payee, None);
    }

    #[test]
    fn test_crlf_lines() {
        let records = parse_records("!Type:Bank\r\nD01/02/2024\r\nT-5.00\r\nPCAFE\r\n^\r\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payee.as_deref(), Some("CAFE"));
    }

    #[test]
    fn test_extract() {
        let importer = importer();
        let file = SourceFile::from_bytes("00040754305 (1).qif", EXPORT.as_bytes().to_vec());

        assert!(importer.identify(&file).unwrap());
        assert_eq!(importer.file_account(&file).unwrap(), "Actif:Boursorama:CCJoint");
        assert_eq!(importer.file_name(&file).unwrap(), "00040754305 (1).qif");
        assert_eq!(
            importer.file_date(&file).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 20)
        );

        let entries = importer.extract(&file).unwrap();
        assert_eq!(entries.len(), 3);

        let txn = entries[0].as_transaction().unwrap();
        assert_eq!(txn.flag, Flag::Warning);
        assert_eq!(txn.meta.get("source"), Some("qif"));
        assert_eq!(txn.postings[0].account, "Actif:Boursorama:CCJoint");
        assert_eq!(txn.postings[0].units, Amount::eur(d("-1045.10")));
        assert_eq!(txn.postings[1].account, "Depenses:A-CLASSER");
        assert_eq!(txn.postings[1].units, Amount::eur(d("1045.10")));

        let unnamed = entries[2].as_transaction().unwrap();
        assert_eq!(unnamed.payee.as_deref(), Some("inconnu"));
    }

    #[test]
    fn test_windows_1250_payee() {
        let mut bytes = b"!Type:Bank\nD01/03/2024\nT-12.00\nPCAF".to_vec();
        bytes.push(0xC9);
        bytes.extend_from_slice(b" DE LA GARE\n^\n");
        let records = parse_records(&decode(&bytes));
        assert_eq!(records[0].payee.as_deref(), Some("CAFÉ DE LA GARE"));
    }

    #[test]
    fn test_unknown_account() {
        let file = SourceFile::from_bytes("99999999999.qif", EXPORT.as_bytes().to_vec());
        assert!(matches!(
            importer().extract(&file),
            Err(ImportError::UnknownAccount(key)) if key == "99999999999"
        ));
    }
}
