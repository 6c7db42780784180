//! BinckBank PDF Importer
//!
//! Files Binck operation statements. Transactions are not extracted.

use super::{capture, first_date, Importer};
use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::Directive;
use crate::source::SourceFile;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME: &str = "pdfbinck";

/// Start of Binck's IBANs
const IBAN_PREFIX: &str = "FR76158";

static RE_ACCOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"N° compte :\s*(\d{2}\.\d{2}\.\d{3})").unwrap());
static RE_OPERATIONS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Opérations :\s*(\d*-\d*)").unwrap());
static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Date:\s*(\d{2}-\d{2}-\d{4})").unwrap());

pub struct BinckImporter {
    config: Config,
}

impl BinckImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Importer for BinckImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        if !file.is_pdf() {
            return Ok(false);
        }
        Ok(file.text()?.contains(IBAN_PREFIX))
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        let number = capture(&RE_ACCOUNT, file.text()?)
            .ok_or_else(|| ImportError::missing(NAME, "account number"))?;
        Ok(self.config.account(number)?.to_string())
    }

    fn file_name(&self, file: &SourceFile) -> Result<String> {
        let range = capture(&RE_OPERATIONS, file.text()?)
            .ok_or_else(|| ImportError::missing(NAME, "operations range"))?;
        Ok(format!("Ope {} Binck.pdf", range))
    }

    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        Ok(first_date(&RE_DATE, file.text()?))
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        log::debug!("{}: filing only, no entries", file.basename());
        Ok(Vec::new())
    }
}
