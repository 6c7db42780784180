//! Statement importers for French banks, brokers and insurers.
//!
//! Each importer recognizes one family of documents (PDF statements, QIF
//! exports, JSON scrapes), tells where the document should be filed and
//! extracts Beancount transactions and balance assertions from it. Price
//! sources fetch quotes for the commodities held in the ledger.

pub mod config;
pub mod error;
pub mod importers;
pub mod ledger;
pub mod pdf;
pub mod prices;
pub mod source;
pub mod text;

pub use error::{ImportError, Result};
