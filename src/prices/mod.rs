//! Price Sources
//!
//! Latest (and for some sources historical) prices of the commodities held
//! in the ledger:
//! - CryptoCompare (crypto currencies, `BTC:EUR`)
//! - RealT (tokenized real estate, token address)
//! - Quantalys (funds by Quantalys id)
//! - Quantalys euro funds (yearly rate of return, in %)

pub mod cryptocompare;
pub mod quantalys;
pub mod realt;

use crate::ledger::Amount;
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

const USER_AGENT: &str = concat!("releve-import/", env!("CARGO_PKG_VERSION"));

/// A price as returned by a source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcePrice {
    pub price: Decimal,
    /// Time of the quote, timezone aware
    pub time: DateTime<FixedOffset>,
    pub currency: String,
}

impl SourcePrice {
    /// Ledger `price` directive for `commodity`, dated on the quote's day
    pub fn to_directive(&self, commodity: &str) -> PriceDirective {
        PriceDirective {
            date: self.time.date_naive(),
            commodity: commodity.to_string(),
            amount: Amount::new(self.price, self.currency.clone()),
        }
    }
}

/// `2024-03-15 price BTC  61234.12 EUR`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDirective {
    pub date: NaiveDate,
    pub commodity: String,
    pub amount: Amount,
}

impl Display for PriceDirective {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} price {}  {}", self.date, self.commodity, self.amount)
    }
}

/// Available price sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceSourceKind {
    CryptoCompare,
    Realt,
    Quantalys,
    QuantalysEuro,
}

impl PriceSourceKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cryptocompare" => Some(Self::CryptoCompare),
            "realt" => Some(Self::Realt),
            "quantalys" => Some(Self::Quantalys),
            "quantalyseuro" => Some(Self::QuantalysEuro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CryptoCompare => "cryptocompare",
            Self::Realt => "realt",
            Self::Quantalys => "quantalys",
            Self::QuantalysEuro => "quantalyseuro",
        }
    }

    pub fn supports_historical(&self) -> bool {
        matches!(self, Self::CryptoCompare)
    }
}

/// HTTP client shared by the sources
pub(crate) fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()?)
}

/// GET `url` and return the body, failing on a non-success status
pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String> {
    log::info!("Fetching {}", url);
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "HTTP error {} for {}: {}",
            response.status(),
            url,
            response.text().await.unwrap_or_default()
        ));
    }

    Ok(response.text().await?)
}

/// A zero price means the source has no quote
pub(crate) fn non_zero(price: SourcePrice) -> Option<SourcePrice> {
    if price.price.is_zero() {
        None
    } else {
        Some(price)
    }
}

/// Fetch the latest price of `ticker`
pub async fn fetch_latest_price(kind: PriceSourceKind, ticker: &str) -> Result<Option<SourcePrice>> {
    match kind {
        PriceSourceKind::CryptoCompare => cryptocompare::fetch_latest(ticker).await,
        PriceSourceKind::Realt => realt::fetch_latest(ticker).await,
        PriceSourceKind::Quantalys => quantalys::fetch_fund(ticker).await,
        PriceSourceKind::QuantalysEuro => quantalys::fetch_euro_fund(ticker).await,
    }
}

/// Fetch the price of `ticker` at `date`
pub async fn fetch_historical_price(
    kind: PriceSourceKind,
    ticker: &str,
    date: NaiveDate,
) -> Result<Option<SourcePrice>> {
    match kind {
        PriceSourceKind::CryptoCompare => cryptocompare::fetch_historical(ticker, date).await,
        other => bail!("{}: historical prices are not implemented", other.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_provider_type_roundtrip() {
        for kind in [
            PriceSourceKind::CryptoCompare,
            PriceSourceKind::Realt,
            PriceSourceKind::Quantalys,
            PriceSourceKind::QuantalysEuro,
        ] {
            assert_eq!(PriceSourceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(PriceSourceKind::from_str("CryptoCompare"), Some(PriceSourceKind::CryptoCompare));
        assert_eq!(PriceSourceKind::from_str("iexcloud"), None);
    }

    #[test]
    fn test_price_directive() {
        let time = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 15, 0, 0, 0)
            .unwrap();
        let price = SourcePrice {
            price: Decimal::from_str("101.20").unwrap(),
            time,
            currency: "EUR".to_string(),
        };
        assert_eq!(
            price.to_directive("FR0010148981").to_string(),
            "2024-03-15 price FR0010148981  101.20 EUR"
        );
    }

    #[test]
    fn test_non_zero() {
        let time = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let zero = SourcePrice {
            price: Decimal::ZERO,
            time,
            currency: "EUR".to_string(),
        };
        assert!(non_zero(zero.clone()).is_none());
        let one = SourcePrice {
            price: Decimal::ONE,
            ..zero
        };
        assert!(non_zero(one).is_some());
    }

    #[tokio::test]
    async fn test_historical_not_implemented() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = fetch_historical_price(PriceSourceKind::Realt, "0x0", date).await;
        assert!(result.is_err());
    }
}
