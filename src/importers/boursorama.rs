//! Boursorama Banque PDF Importer
//!
//! Handles the three document families sent by Boursorama: current account
//! statements, deferred debit card statements and loan amortization tables.
//!
//! Account statements carry no sign column. Debits and credits sit in two
//! columns of the `pdftotext -layout` output, so the sign of an amount is
//! inferred from how far right it ends on its line.

use super::{capture, entry_meta, filing_name, first_date, next_day, Importer};
use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::{Amount, Balance, Directive, Flag, Posting, Transaction};
use crate::source::SourceFile;
use crate::text::{collapse_whitespace, display_width, parse_day_first_date, parse_french_decimal};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME: &str = "pdfbourso";

/// A closing balance ending left of this column is a debit balance
const BALANCE_DEBIT_WIDTH: usize = 84;
/// An operation ending right of this column is in the credit column
const OPERATION_CREDIT_WIDTH: usize = 148;

static RE_CARD_DOC: Lazy<Regex> = Lazy::new(|| Regex::new(r"Relevé de Carte").unwrap());
static RE_ACCOUNT_DOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"BOURSORAMA BANQUE|BOUSFRPPXXX|RCS\sNanterre\s351\s?058\s?151").unwrap()
});
static RE_LOAN_DOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"tableau d'amortissement|Echéancier Prévisionnel|Échéancier Définitif").unwrap()
});

static RE_ACCOUNT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(\d{11})").unwrap());
static RE_CARD_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}\*{8}\d{4})").unwrap());
static RE_LOAN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"N(?:°|º) du crédit\s*:\s?(\d{5}\s?-\s?\d{11})").unwrap());

static RE_STATEMENT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:au\s*|Date départ\s*:\s)(\d*/\d*/\d*)").unwrap());

static RE_ACCOUNT_BALANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"SOLDE\s(?:EN\sEUR\s+)?AU\s:(\s+)(\d{1,2}/\d{2}/\d{4})(\s+)((?:\d{1,3}\.)?\d{1,3},\d{2})",
    )
    .unwrap()
});
static RE_ACCOUNT_OPERATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\d{1,2}/\d{2}/\d{4}\s(.*)\s(\d{1,2}/\d{2}/\d{4})\s(\s*)\s((?:\d{1,3}\.)?\d{1,3},\d{2})(?:(?:\n.\s{8,20})(.+?))?\n",
    )
    .unwrap()
});
static RE_CARD_OPERATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}/\d{2}/\d{4})\s*CARTE\s(.*)\s((?:\d{1,3}\.)?\d{1,3},\d{2})").unwrap()
});
static RE_LOAN_ROW: Lazy<Regex> = Lazy::new(|| {
    let amount = r"\s+(\d+.\d{2})";
    Regex::new(&format!(r"(\d*/\d*/\d*){}", amount.repeat(8))).unwrap()
});

/// Kind of Boursorama document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Card,
    Account,
    Loan,
}

impl StatementKind {
    /// Detect the document family, card statements first since they also
    /// carry the bank's legal mentions
    pub fn detect(text: &str) -> Option<Self> {
        if RE_CARD_DOC.is_match(text) {
            Some(Self::Card)
        } else if RE_ACCOUNT_DOC.is_match(text) {
            Some(Self::Account)
        } else if RE_LOAN_DOC.is_match(text) {
            Some(Self::Loan)
        } else {
            None
        }
    }

    /// Statement identifier used as key in the accounts mapping
    pub fn account_key(&self, text: &str) -> Option<String> {
        match self {
            Self::Account => capture(&RE_ACCOUNT_NUMBER, text).map(str::to_string),
            Self::Card => capture(&RE_CARD_NUMBER, text).map(str::to_string),
            Self::Loan => capture(&RE_LOAN_NUMBER, text)
                .map(|n| n.chars().filter(|c| !c.is_whitespace()).collect()),
        }
    }
}

pub struct BoursoramaImporter {
    config: Config,
}

impl BoursoramaImporter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn kind(&self, text: &str) -> Result<StatementKind> {
        StatementKind::detect(text).ok_or_else(|| ImportError::Unsupported {
            importer: NAME,
            reason: "not a Boursorama statement".to_string(),
        })
    }

    fn parse_account(
        &self,
        file: &SourceFile,
        text: &str,
        account: &str,
        document: &str,
    ) -> Result<Vec<Directive>> {
        let mut entries = Vec::new();

        match RE_ACCOUNT_BALANCE.captures(text) {
            Some(caps) => {
                let width = display_width(&caps[1])
                    + display_width(&caps[2])
                    + display_width(&caps[3])
                    + display_width(&caps[4]);
                let mut number = parse_french_decimal(&caps[4])?;
                if width < BALANCE_DEBIT_WIDTH {
                    number = -number;
                }
                let date = parse_day_first_date(&caps[2])?;

                entries.push(Directive::Balance(Balance {
                    meta: entry_meta(file, 0, NAME, Some(document)),
                    date: next_day(date),
                    account: account.to_string(),
                    amount: Amount::eur(number),
                }));
            }
            None => log::warn!("{}: no closing balance found", file.basename()),
        }

        for (index, caps) in RE_ACCOUNT_OPERATION.captures_iter(text).enumerate() {
            let width = display_width(&caps[1])
                + display_width(&caps[2])
                + display_width(&caps[3])
                + display_width(&caps[4]);
            let mut number = parse_french_decimal(&caps[4])?;
            if width <= OPERATION_CREDIT_WIDTH {
                number = -number;
            }

            let narration = caps
                .get(5)
                .map(|m| collapse_whitespace(m.as_str()))
                .filter(|n| !n.is_empty());

            entries.push(Directive::Transaction(Transaction {
                meta: entry_meta(file, index + 1, NAME, Some(document)),
                date: parse_day_first_date(&caps[2])?,
                flag: Flag::Okay,
                payee: Some(payee_or_unknown(&caps[1])),
                narration,
                postings: vec![Posting::new(account, Amount::eur(number))],
            }));
        }

        Ok(entries)
    }

    fn parse_card(
        &self,
        file: &SourceFile,
        text: &str,
        account: &str,
        document: &str,
    ) -> Result<Vec<Directive>> {
        let mut entries = Vec::new();

        for (index, caps) in RE_CARD_OPERATION.captures_iter(text).enumerate() {
            let number = parse_french_decimal(&caps[3])?;
            entries.push(Directive::Transaction(Transaction {
                meta: entry_meta(file, index + 1, NAME, Some(document)),
                date: parse_day_first_date(&caps[1])?,
                flag: Flag::Okay,
                payee: Some(payee_or_unknown(&caps[2])),
                narration: None,
                postings: vec![Posting::new(account, Amount::eur(-number))],
            }));
        }

        Ok(entries)
    }

    /// One transaction per paid instalment, plus the remaining principal
    fn parse_loan(
        &self,
        file: &SourceFile,
        text: &str,
        account: &str,
        loan_number: &str,
        document: &str,
    ) -> Result<Vec<Directive>> {
        let accounts = &self.config.boursorama;
        let mut entries = Vec::new();

        for (index, caps) in RE_LOAN_ROW.captures_iter(text).enumerate() {
            let date = parse_day_first_date(&caps[1])?;
            let payment = parse_french_decimal(&caps[2])?;
            let principal = parse_french_decimal(&caps[3])?;
            let interest = parse_french_decimal(&caps[4])?;
            let insurance = parse_french_decimal(&caps[5])?;
            let remaining = parse_french_decimal(&caps[9])?;

            entries.push(Directive::Transaction(Transaction {
                meta: entry_meta(file, index + 1, NAME, Some(document)),
                date,
                flag: Flag::Okay,
                payee: Some(format!("ECH PRET:{}", loan_number)),
                narration: None,
                postings: vec![
                    Posting::new(&accounts.loan_payment_account, Amount::eur(-payment)),
                    Posting::new(account, Amount::eur(principal)),
                    Posting::new(&accounts.loan_interest_account, Amount::eur(interest)),
                    Posting::new(&accounts.loan_insurance_account, Amount::eur(insurance)),
                ],
            }));

            entries.push(Directive::Balance(Balance {
                meta: entry_meta(file, index + 1, NAME, Some(document)),
                date: next_day(date),
                account: account.to_string(),
                amount: Amount::eur(-remaining),
            }));
        }

        Ok(entries)
    }
}

fn payee_or_unknown(raw: &str) -> String {
    let payee = collapse_whitespace(raw);
    if payee.is_empty() {
        "inconnu".to_string()
    } else {
        payee
    }
}

impl Importer for BoursoramaImporter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, file: &SourceFile) -> Result<bool> {
        if !file.is_pdf() {
            return Ok(false);
        }
        Ok(StatementKind::detect(file.text()?).is_some())
    }

    fn file_account(&self, file: &SourceFile) -> Result<String> {
        let text = file.text()?;
        let kind = self.kind(text)?;
        let key = kind
            .account_key(text)
            .ok_or_else(|| ImportError::missing(NAME, "account number"))?;
        Ok(self.config.account(&key)?.to_string())
    }

    fn file_name(&self, _file: &SourceFile) -> Result<String> {
        Ok("Boursorama.pdf".to_string())
    }

    fn file_date(&self, file: &SourceFile) -> Result<Option<NaiveDate>> {
        Ok(first_date(&RE_STATEMENT_DATE, file.text()?))
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Directive>> {
        let text = file.text()?;
        let kind = self.kind(text)?;
        let key = kind
            .account_key(text)
            .ok_or_else(|| ImportError::missing(NAME, "account number"))?;
        let account = self.config.account(&key)?;
        let document = filing_name(self, file)?;

        log::debug!("{}: {:?} statement for {}", file.basename(), kind, key);

        match kind {
            StatementKind::Account => self.parse_account(file, text, account, &document),
            StatementKind::Card => self.parse_card(file, text, account, &document),
            StatementKind::Loan => self.parse_loan(file, text, account, &key, &document),
        }
    }
}
