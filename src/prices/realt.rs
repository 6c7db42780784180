//! RealT Price Source
//!
//! Token price of RealT properties from the community API. The ticker is
//! the token contract address.

use super::{get_text, http_client, non_zero, SourcePrice};
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

const BASE_URL: &str = "https://api.realt.community/v1/token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token_price: serde_json::Number,
    currency: String,
}

/// Price and currency of a token
pub fn parse_token(body: &str) -> Result<(Decimal, String)> {
    let token: TokenResponse = serde_json::from_str(body).context("Unexpected RealT response")?;
    let raw = token.token_price.to_string();
    let price = raw
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&raw))
        .with_context(|| format!("Invalid token price '{}'", raw))?;
    Ok((price, token.currency))
}

pub async fn fetch_latest(address: &str) -> Result<Option<SourcePrice>> {
    let client = http_client()?;
    let url = format!("{}/{}", BASE_URL, urlencoding::encode(address));

    let body = get_text(&client, &url).await?;
    let (price, currency) = parse_token(&body)?;
    log::debug!("RealT {}: {} {}", address, price, currency);

    Ok(non_zero(SourcePrice {
        price,
        time: Utc::now().fixed_offset(),
        currency,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_token() {
        let body = r#"{
            "fullName": "9943 Marlowe St, Detroit, MI 48227",
            "tokenPrice": 50.21,
            "currency": "USD",
            "lastUpdate": {"date": "2024-01-12 10:00:00.000000"}
        }"#;
        let (price, currency) = parse_token(body).unwrap();
        assert_eq!(price, Decimal::from_str("50.21").unwrap());
        assert_eq!(currency, "USD");

        assert!(parse_token(r#"{"currency": "USD"}"#).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_latest() {
        let price = fetch_latest("0x499A6c19F5537dd6005E2B5c6E1263103f558Ba4")
            .await
            .unwrap();
        if let Some(price) = price {
            assert!(price.price > Decimal::ZERO);
        }
    }
}
