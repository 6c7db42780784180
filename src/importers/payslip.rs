//! Payslip PDF Importer
//!
//! Books the monthly salary from the payslip: the gross net goes to the
//! employer's salary account, split between withholding tax and the amount
//! wired to the bank.

use super::{capture, entry_meta, filing_name, first_date, Importer};
use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::{Amount, Directive, Flag, Posting, Transaction};
use crate::source::SourceFile;
use crate::text::parse_french_decimal;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const NAME: &str = "fichepaye";

static RE_PAYMENT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Paiement\sle\s*(\d{2}/\d{2}/\d{2})").unwrap());
static RE_NET_BEFORE_TAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Cadre Net à payer\n\s*(\d{1,4},\d{2})").unwrap());
static RE_WITHHOLDING_TAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Impôt sur le revenu prélevé à la source.*\s(\d{1,4},\d{2})\n").unwrap()
});
static RE_NET_PAID: Lazy<Regex> = Lazy::new(|| Regex::new(r"NetAPayer.*\s(\d{1,4},\d{2})\n").unwrap());

pub struct PayslipImporter {
    config: Config,
}

impl PayslipImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn employer_account(&self, text: &str) -> Result<&str> {
        let employer_id = &self.config.payslip.employer_id;
        if !text.contains(employer_id.as_str()) {
            return Err(ImportError::missing(NAME, "employer identifier"));
        }
        self.config.account(employer_id)
    }

    fn amount(text: &str, re: &Regex, field: &'static str) -> Result<Decimal> {
        let raw = capture(re, text).ok_or_else(|| ImportError::missing(NAME, field))?;
        parse_french_decimal(raw)
    }
}

impl Importer for PayslipImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        if !file.is_pdf() {
            return Ok(false);
        }
        let text = file.text()?;
        log::debug!("{}", text);
        Ok(text.contains(self.config.payslip.marker.as_str()))
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        Ok(self.employer_account(file.text()?)?.to_string())
    }

    fn file_name(&self, _file: &SourceFile) -> Result<String> {
        Ok("Bulletin_Paye.pdf".to_string())
    }

    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        Ok(first_date(&RE_PAYMENT_DATE, file.text()?))
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        let text = file.text()?;
        let settings = &self.config.payslip;

        let employer = self.employer_account(text)?;
        let date = self
            .file_date(file)?
            .ok_or_else(|| ImportError::missing(NAME, "payment date"))?;
        let document = filing_name(self, file)?;

        let net_before_tax = Self::amount(text, &RE_NET_BEFORE_TAX, "net before tax")?;
        let withholding_tax = Self::amount(text, &RE_WITHHOLDING_TAX, "withholding tax")?;
        let net_paid = Self::amount(text, &RE_NET_PAID, "net paid")?;

        log::debug!(
            "net {} = tax {} + paid {}",
            net_before_tax,
            withholding_tax,
            net_paid
        );

        Ok(vec![Directive::Transaction(Transaction {
            meta: entry_meta(file, 0, NAME, Some(&document)),
            date,
            flag: Flag::Okay,
            payee: Some(settings.payee.clone()),
            narration: Some(settings.narration.clone()),
            postings: vec![
                Posting::new(format!("{}:Salaire", employer), Amount::eur(-net_before_tax)),
                Posting::new(&settings.tax_account, Amount::eur(withholding_tax)),
                Posting::new(&settings.bank_account, Amount::eur(net_paid)),
            ],
        })])
    }
}
