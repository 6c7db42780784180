//! CryptoCompare Price Source
//!
//! Ticker format: `COMMODITY:CURRENCY`, e.g. `BTC:EUR`.
//!
//! API documentation: https://min-api.cryptocompare.com/documentation

use super::{get_text, http_client, non_zero, SourcePrice};
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const BASE_URL: &str = "https://min-api.cryptocompare.com/data";

/// Crypto prices are kept to 18 decimal places
const PRICE_PRECISION: u32 = 18;

/// Split `BTC:EUR` into commodity and currency
pub fn split_ticker(ticker: &str) -> Result<(&str, &str)> {
    ticker
        .split_once(':')
        .filter(|(c, q)| !c.is_empty() && !q.is_empty())
        .ok_or_else(|| anyhow!("Invalid ticker '{}', expected COMMODITY:CURRENCY", ticker))
}

/// JSON number (possibly in exponent notation) to a rounded decimal
fn json_decimal(value: &Value) -> Result<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(anyhow!("Expected a number, got {}", other)),
    };
    let number = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .with_context(|| format!("Invalid price '{}'", raw))?;
    Ok(number.round_dp(PRICE_PRECISION))
}

/// `{"EUR": 61234.12}`
pub fn parse_latest(body: &str, currency: &str) -> Result<Decimal> {
    let data: Value = serde_json::from_str(body)?;
    if let Some(message) = data.get("Message").and_then(Value::as_str) {
        return Err(anyhow!("CryptoCompare API error: {}", message));
    }
    let price = data
        .get(currency)
        .ok_or_else(|| anyhow!("No {} price in response", currency))?;
    json_decimal(price)
}

/// `{"BTC": {"EUR": 41234.5}}`
pub fn parse_historical(body: &str, commodity: &str, currency: &str) -> Result<Decimal> {
    let data: Value = serde_json::from_str(body)?;
    let price = data
        .get(commodity)
        .and_then(|c| c.get(currency))
        .ok_or_else(|| anyhow!("No {}/{} price in response", commodity, currency))?;
    json_decimal(price)
}

pub async fn fetch_latest(ticker: &str) -> Result<Option<SourcePrice>> {
    let (commodity, currency) = split_ticker(ticker)?;
    let client = http_client()?;
    let url = format!(
        "{}/price?fsym={}&tsyms={}",
        BASE_URL,
        urlencoding::encode(commodity),
        urlencoding::encode(currency)
    );

    let body = get_text(&client, &url).await?;
    let price = parse_latest(&body, currency)?;

    Ok(non_zero(SourcePrice {
        price,
        time: Utc::now().fixed_offset(),
        currency: currency.to_string(),
    }))
}

/// Price at the end of `date`, UTC
pub async fn fetch_historical(ticker: &str, date: NaiveDate) -> Result<Option<SourcePrice>> {
    let (commodity, currency) = split_ticker(ticker)?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("Invalid date {}", date))?;
    let time = Utc.from_utc_datetime(&end_of_day);

    let client = http_client()?;
    let url = format!(
        "{}/pricehistorical?fsym={}&tsyms={}&ts={}",
        BASE_URL,
        urlencoding::encode(commodity),
        urlencoding::encode(currency),
        time.timestamp()
    );

    let body = get_text(&client, &url).await?;
    let price = parse_historical(&body, commodity, currency)?;

    Ok(non_zero(SourcePrice {
        price,
        time: time.fixed_offset(),
        currency: currency.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ticker() {
        assert_eq!(split_ticker("BTC:EUR").unwrap(), ("BTC", "EUR"));
        assert!(split_ticker("BTC").is_err());
        assert!(split_ticker(":EUR").is_err());
    }

    #[test]
    fn test_parse_latest() {
        assert_eq!(
            parse_latest(r#"{"EUR": 61234.12}"#, "EUR").unwrap(),
            Decimal::from_str("61234.12").unwrap()
        );
        assert_eq!(
            parse_latest(r#"{"EUR": 1.5e-7}"#, "EUR").unwrap(),
            Decimal::from_str("0.00000015").unwrap()
        );
        assert!(parse_latest(r#"{"USD": 1.0}"#, "EUR").is_err());
        assert!(parse_latest(
            r#"{"Response": "Error", "Message": "fsym is a required param."}"#,
            "EUR"
        )
        .is_err());
    }

    #[test]
    fn test_parse_historical() {
        let body = r#"{"BTC": {"EUR": 41234.5}}"#;
        assert_eq!(
            parse_historical(body, "BTC", "EUR").unwrap(),
            Decimal::from_str("41234.5").unwrap()
        );
        assert!(parse_historical(body, "ETH", "EUR").is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_latest() {
        let price = fetch_latest("BTC:EUR").await.unwrap().unwrap();
        assert_eq!(price.currency, "EUR");
        assert!(price.price > Decimal::ZERO);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_historical() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let price = fetch_historical("BTC:EUR", date).await.unwrap().unwrap();
        assert_eq!(price.time.date_naive(), date);
    }
}
