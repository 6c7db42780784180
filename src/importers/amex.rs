//! American Express PDF Importer
//!
//! Parses the monthly statements of the Air France KLM Amex card.

use super::{capture, entry_meta, first_date, next_day, Importer};
use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::{Amount, Balance, Directive, Flag, Posting, Transaction};
use crate::source::SourceFile;
use crate::text::{collapse_whitespace, french_month_number, parse_french_decimal};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const NAME: &str = "pdfamex";

static RE_ACCOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"xxxx-xxxxxx-(\d{5})").unwrap());
static RE_STATEMENT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xxxx-xxxxxx-\d{5}\s*(\d*/\d*/\d*)").unwrap());
static RE_STATEMENT_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xxxx-xxxxxx-\d{5}\s*\d*/(\d*)/(\d*)").unwrap());

static RE_OPERATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,2}\s[a-zéèûôùê]{3,4}\s*\d{1,2}\s[a-zéèûôùê]{3,4}.*\d+,\d{2}(?:\s*CR)?").unwrap()
});
static RE_OPERATION_DATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}\s[a-zéèûôùê]{3,4})\s*(\d{1,2}\s[a-zéèûôùê]{3,4})").unwrap()
});
static RE_OPERATION_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\d{1,2}\s[a-zéèûôùê]{3,4}\s*\d{1,2}\s[a-zéèûôùê]{3,4}\s+(.*?)\s+(\d{0,3}\s?\d{1,3},\d{2})(\s*CR)?$",
    )
    .unwrap()
});
static RE_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total des dépenses pour\s+(?:.*?)\s+(\d{0,3}\s?\d{1,3},\d{2})").unwrap()
});

/// Month and year printed next to the card number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatementPeriod {
    month: u32,
    year: i32,
}

impl StatementPeriod {
    fn parse(text: &str) -> Option<Self> {
        let caps = RE_STATEMENT_PERIOD.captures(text)?;
        let month = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        let year = if caps[2].len() == 2 { 2000 + year } else { year };
        Some(Self { month, year })
    }

    /// Year of an operation: December operations on a January statement
    /// belong to the previous year
    fn year_for(&self, operation_month: u32) -> i32 {
        if operation_month == 12 && self.month == 1 {
            self.year - 1
        } else {
            self.year
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Operation {
    date: NaiveDate,
    payee: String,
    number: Decimal,
    credit: bool,
}

pub struct AmexImporter {
    config: Config,
}

impl AmexImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Ledger account of the card: full masked number first, then the last digits
    fn account(&self, text: &str) -> Result<String> {
        let caps = RE_ACCOUNT
            .captures(text)
            .ok_or_else(|| ImportError::missing(NAME, "card number"))?;

        if let Ok(account) = self.config.account(&caps[0]) {
            return Ok(account.to_string());
        }
        Ok(self.config.account(&caps[1])?.to_string())
    }

    fn parse_operation(&self, chunk: &str, period: StatementPeriod) -> Result<Option<Operation>> {
        let (Some(dates), Some(caps)) = (
            RE_OPERATION_DATES.captures(chunk),
            RE_OPERATION_AMOUNT.captures(chunk),
        ) else {
            log::debug!("Skipping unparsable operation: {}", chunk);
            return Ok(None);
        };

        let date = parse_short_date(&dates[2], period)?;
        let number = parse_french_decimal(&caps[2])?;
        let payee = collapse_whitespace(&caps[1]);

        Ok(Some(Operation {
            date,
            payee: if payee.is_empty() {
                "inconnu".to_string()
            } else {
                payee
            },
            number,
            credit: caps.get(3).is_some(),
        }))
    }

    fn parse_operations(&self, text: &str, period: StatementPeriod) -> Result<Vec<Operation>> {
        let mut operations = Vec::new();
        for chunk in RE_OPERATION.find_iter(text) {
            if let Some(op) = self.parse_operation(chunk.as_str(), period)? {
                operations.push(op);
            }
        }
        Ok(operations)
    }
}

/// `13 janv` in the statement's year
fn parse_short_date(s: &str, period: StatementPeriod) -> Result<NaiveDate> {
    let invalid = || ImportError::InvalidDate(s.to_string());

    let mut parts = s.split_whitespace();
    let day: u32 = parts
        .next()
        .and_then(|d| d.parse().ok())
        .ok_or_else(invalid)?;
    let month = parts
        .next()
        .and_then(french_month_number)
        .ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(period.year_for(month), month, day).ok_or_else(invalid)
}

impl Importer for AmexImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        if !file.is_pdf() {
            return Ok(false);
        }
        Ok(file.text()?.contains("Carte Air France KLM"))
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        self.account(file.text()?)
    }

    fn file_name(&self, _file: &SourceFile) -> Result<String> {
        Ok("Amex.pdf".to_string())
    }

    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        Ok(first_date(&RE_STATEMENT_DATE, file.text()?))
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        let text = file.text()?;
        log::debug!("{}", text);

        let account = self.account(text)?;
        let period = StatementPeriod::parse(text)
            .ok_or_else(|| ImportError::missing(NAME, "statement date"))?;
        let statement_date = self
            .file_date(file)?
            .ok_or_else(|| ImportError::missing(NAME, "statement date"))?;

        let mut entries: Vec<Directive> = self
            .parse_operations(text, period)?
            .into_iter()
            .map(|op| {
                let (number, kind) = if op.credit {
                    (op.number, "Credit")
                } else {
                    (-op.number, "Debit")
                };
                Directive::Transaction(Transaction {
                    meta: entry_meta(file, 0, NAME, None).with("type", kind),
                    date: op.date,
                    flag: Flag::Okay,
                    payee: Some(op.payee),
                    narration: None,
                    postings: vec![Posting::new(&account, Amount::eur(number))],
                })
            })
            .collect();

        let total = match capture(&RE_TOTAL, text) {
            Some(total) => -parse_french_decimal(total)?,
            None => Decimal::ZERO,
        };
        entries.push(Directive::Balance(Balance {
            meta: entry_meta(file, 0, NAME, None),
            date: next_day(statement_date),
            account,
            amount: Amount::eur(total),
        }));

        Ok(entries)
    }
}
