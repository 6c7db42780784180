//! Ledger directives produced by the importers
//!
//! A small model of the Beancount directives we emit: transactions with
//! postings and balance assertions. Rendering lives in `format`.

mod format;

pub use format::{render_directives, write_directives};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Amount in a single commodity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub number: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
        }
    }

    pub fn eur(number: Decimal) -> Self {
        Self::new(number, "EUR")
    }

    pub fn negated(&self) -> Self {
        Self::new(-self.number, self.currency.clone())
    }
}

/// Per-unit cost basis of a posting held at cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub number: Decimal,
    pub currency: String,
}

/// Transaction flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Okay,
    Warning,
}

impl Flag {
    pub fn as_char(&self) -> char {
        match self {
            Self::Okay => '*',
            Self::Warning => '!',
        }
    }
}

/// One leg of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub units: Amount,
    pub cost: Option<Cost>,
    pub price: Option<Amount>,
    pub flag: Option<Flag>,
}

impl Posting {
    pub fn new(account: impl Into<String>, units: Amount) -> Self {
        Self {
            account: account.into(),
            units,
            cost: None,
            price: None,
            flag: None,
        }
    }

    pub fn with_cost(mut self, cost: Option<Cost>) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_price(mut self, price: Option<Amount>) -> Self {
        self.price = price;
        self
    }

    /// Contribution of this posting to the transaction balance
    pub fn weight(&self) -> Amount {
        if let Some(cost) = &self.cost {
            Amount::new(self.units.number * cost.number, cost.currency.clone())
        } else if let Some(price) = &self.price {
            Amount::new(self.units.number * price.number, price.currency.clone())
        } else {
            self.units.clone()
        }
    }
}

/// Directive metadata: origin of the entry plus string key/values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub filename: String,
    pub lineno: usize,
    pub entries: Vec<(String, String)>,
}

impl Meta {
    pub fn new(filename: impl Into<String>, lineno: usize) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            entries: Vec::new(),
        }
    }

    /// Set a key, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub meta: Meta,
    pub date: NaiveDate,
    pub flag: Flag,
    pub payee: Option<String>,
    pub narration: Option<String>,
    pub postings: Vec<Posting>,
}

impl Transaction {
    /// Sum of posting weights per currency
    pub fn residual(&self) -> BTreeMap<String, Decimal> {
        let mut sums: BTreeMap<String, Decimal> = BTreeMap::new();
        for posting in &self.postings {
            let weight = posting.weight();
            *sums.entry(weight.currency).or_insert(Decimal::ZERO) += weight.number;
        }
        sums
    }

    /// Single-leg entries are left for the user to complete
    pub fn is_incomplete(&self) -> bool {
        self.postings.len() < 2
    }

    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.residual().values().all(|v| v.abs() <= tolerance)
    }
}

/// Balance assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub meta: Meta,
    pub date: NaiveDate,
    pub account: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    Transaction(Transaction),
    Balance(Balance),
}

impl Directive {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Transaction(t) => t.date,
            Self::Balance(b) => b.date,
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            Self::Transaction(t) => &t.meta,
            Self::Balance(b) => &b.meta,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(t) => Some(t),
            Self::Balance(_) => None,
        }
    }

    pub fn as_balance(&self) -> Option<&Balance> {
        match self {
            Self::Balance(b) => Some(b),
            Self::Transaction(_) => None,
        }
    }

    fn kind_order(&self) -> u8 {
        match self {
            Self::Transaction(_) => 0,
            Self::Balance(_) => 1,
        }
    }
}

/// Stable sort by date, transactions before balances of the same day
pub fn sort_directives(directives: &mut [Directive]) {
    directives.sort_by_key(|d| (d.date(), d.kind_order()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn txn(postings: Vec<Posting>) -> Transaction {
        Transaction {
            meta: Meta::new("test", 0),
            date: date(2024, 1, 1),
            flag: Flag::Okay,
            payee: None,
            narration: None,
            postings,
        }
    }

    #[test]
    fn test_weight_prefers_cost_then_price() {
        let units = Amount::new(d("2"), "FR0010");
        let plain = Posting::new("Actif:AV", units.clone());
        assert_eq!(plain.weight(), units);

        let priced = plain.clone().with_price(Some(Amount::eur(d("10.5"))));
        assert_eq!(priced.weight(), Amount::eur(d("21.0")));

        let costed = priced.with_cost(Some(Cost {
            number: d("10"),
            currency: "EUR".to_string(),
        }));
        assert_eq!(costed.weight(), Amount::eur(d("20")));
    }

    #[test]
    fn test_balanced_transaction() {
        let t = txn(vec![
            Posting::new("Actif:Banque", Amount::eur(d("-100.00"))),
            Posting::new("Depenses:Banque:Interet", Amount::eur(d("40.00"))),
            Posting::new("Passif:Pret", Amount::eur(d("60.00"))),
        ]);
        assert!(t.is_balanced(d("0.01")));
        assert!(!t.is_incomplete());
    }

    #[test]
    fn test_unbalanced_transaction() {
        let t = txn(vec![
            Posting::new("Actif:Banque", Amount::eur(d("-100.00"))),
            Posting::new("Depenses:Divers", Amount::eur(d("99.00"))),
        ]);
        assert!(!t.is_balanced(d("0.01")));
        assert_eq!(t.residual().get("EUR"), Some(&d("-1.00")));
    }

    #[test]
    fn test_single_leg_is_incomplete() {
        let t = txn(vec![Posting::new("Actif:Banque", Amount::eur(d("-5")))]);
        assert!(t.is_incomplete());
    }

    #[test]
    fn test_meta_insert_replaces() {
        let mut meta = Meta::new("f", 1).with("source", "qif");
        meta.insert("source", "pdfbourso");
        assert_eq!(meta.get("source"), Some("pdfbourso"));
        assert_eq!(meta.entries.len(), 1);
    }

    #[test]
    fn test_sort_directives() {
        let balance = Directive::Balance(Balance {
            meta: Meta::default(),
            date: date(2024, 1, 1),
            account: "Actif:Banque".to_string(),
            amount: Amount::eur(d("1")),
        });
        let mut later = txn(vec![]);
        later.date = date(2024, 1, 2);
        let mut directives = vec![
            Directive::Transaction(later),
            balance,
            Directive::Transaction(txn(vec![])),
        ];

        sort_directives(&mut directives);

        assert!(directives[0].as_transaction().is_some());
        assert!(directives[1].as_balance().is_some());
        assert_eq!(directives[2].date(), date(2024, 1, 2));
    }
}
