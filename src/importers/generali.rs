//! Generali life insurance JSON Importer
//!
//! Reads the JSON files produced by the Generali scraper, one file per
//! operation, named `YYYY-MM-DD-<anything>.generali.json`:
//!
//! ```json
//! {
//!   "compte": "P54112927",
//!   "ope": "Versement Libre",
//!   "table": [
//!     { "isin": "FR0010", "date": "15/03/2024", "valeurpart": "101,20", "nbpart": "2,4704", "montant": "250,00" }
//!   ]
//! }
//! ```

use super::{entry_meta, Importer, WARNING_META};
use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::{Amount, Cost, Directive, Flag, Posting, Transaction};
use crate::source::SourceFile;
use crate::text::parse_french_decimal;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

const NAME: &str = "jsongenerali";

/// Unit prices and costs are kept to 4 decimal places
const PRICE_PRECISION: u32 = 4;

static RE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.generali\.json$").unwrap());
static RE_DATE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})-").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct GeneraliDocument {
    /// Contract number
    pub compte: String,
    /// Operation type
    pub ope: String,
    #[serde(default)]
    pub table: Vec<GeneraliLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneraliLine {
    pub isin: String,
    #[serde(default)]
    pub date: String,
    /// Unit value, empty for the euro fund
    #[serde(default)]
    pub valeurpart: String,
    /// Number of units
    #[serde(default)]
    pub nbpart: String,
    pub montant: String,
}

/// Balancing leg of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    /// Money in from the counterpart account
    Contribution,
    ManagementFees,
    Dividends,
    /// Moves between funds, balanced by itself
    Arbitrage,
}

impl Operation {
    fn from_label(ope: &str) -> Option<Self> {
        match ope {
            "prélèvement" | "Versement Libre" => Some(Self::Contribution),
            "Frais de gestion" => Some(Self::ManagementFees),
            "Distribution de dividendes" => Some(Self::Dividends),
            "Arbitrage" | "Opération sur titres" => Some(Self::Arbitrage),
            _ => None,
        }
    }
}

pub struct GeneraliImporter {
    config: Config,
}

impl GeneraliImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn parse_document(file: &SourceFile) -> Result<GeneraliDocument> {
        Ok(serde_json::from_slice(file.bytes())?)
    }

    /// Fund posting of one line, with the amount it contributes to the total
    fn line_posting(&self, account: &str, line: &GeneraliLine) -> Result<(Posting, Decimal)> {
        let montant = parse_french_decimal(&line.montant)?;

        // The euro fund has no unit value: one unit per euro
        let nbpart_raw = if line.valeurpart.trim().is_empty() {
            line.montant.as_str()
        } else {
            line.nbpart.as_str()
        };
        let nbpart = parse_french_decimal(nbpart_raw)?;

        let unit_value = montant
            .checked_div(nbpart)
            .ok_or_else(|| ImportError::InvalidNumber(nbpart_raw.to_string()))?
            .round_dp(PRICE_PRECISION);

        let commodity: String = line
            .isin
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        let cost = (!nbpart_raw.trim_start().starts_with('-')).then(|| Cost {
            number: unit_value,
            currency: "EUR".to_string(),
        });

        let posting = Posting::new(
            format!("{}:{}", account, commodity),
            Amount::new(nbpart, commodity),
        )
        .with_cost(cost)
        .with_price(Some(Amount::eur(unit_value.abs())));

        Ok((posting, montant))
    }
}

impl Importer for GeneraliImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        Ok(RE_FILENAME.is_match(&file.basename()))
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        let doc = Self::parse_document(file)?;
        Ok(self.config.account(&doc.compte)?.to_string())
    }

    fn file_name(&self, file: &SourceFile) -> Result<String> {
        Ok(RE_DATE_PREFIX.replace_all(&file.basename(), "").into_owned())
    }

    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        let basename = file.basename();
        let Some(caps) = RE_DATE_PREFIX.captures(&basename) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ImportError::InvalidDate(caps[1].to_string()))
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        let doc = Self::parse_document(file)?;
        log::debug!("{}: {} ({} lines)", file.basename(), doc.ope, doc.table.len());

        let operation = Operation::from_label(&doc.ope);

        let account = self.config.account(&doc.compte)?;
        let date = self
            .file_date(file)?
            .ok_or_else(|| ImportError::missing(NAME, "date prefix in file name"))?;

        let mut postings = Vec::with_capacity(doc.table.len() + 1);
        let mut total = Decimal::ZERO;
        for line in &doc.table {
            let (posting, montant) = self.line_posting(account, line)?;
            postings.push(posting);
            total += montant;
        }

        let accounts = &self.config.generali;
        let mut meta = entry_meta(file, 0, NAME, None);
        let mut flag = Flag::Okay;
        match operation {
            Some(Operation::Contribution) => postings.push(Posting::new(
                &accounts.counterpart_account,
                Amount::eur(-total),
            )),
            Some(Operation::ManagementFees) => {
                postings.push(Posting::new(&accounts.fees_account, Amount::eur(total)))
            }
            Some(Operation::Dividends) => postings.push(Posting::new(
                &accounts.dividends_account,
                Amount::eur(-total),
            )),
            Some(Operation::Arbitrage) => {}
            // Fund legs only, the counter leg is added by hand
            None => {
                log::warn!("{}: unknown operation type '{}'", file.basename(), doc.ope);
                meta.insert(WARNING_META, format!("unknown operation type '{}'", doc.ope));
                flag = Flag::Warning;
            }
        }

        Ok(vec![Directive::Transaction(Transaction {
            meta,
            date,
            flag,
            payee: Some(format!("{} Generali", doc.ope)),
            narration: None,
            postings,
        })])
    }
}
