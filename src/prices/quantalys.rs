//! Quantalys Price Source
//!
//! Scrapes the last net asset value from quantalys.com fund pages, and the
//! yearly rate of return from euro fund pages. Only the latest value is
//! published.

use super::{get_text, http_client, SourcePrice};
use crate::text::{collapse_whitespace, parse_day_first_date, parse_french_decimal};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use chrono_tz::Europe::Paris;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

const FUND_URL: &str = "https://www.quantalys.com/Fonds/";
const EURO_FUND_URL: &str = "https://www.quantalys.com/SupportEuro/";

/// Quantalys values are published with 2 decimal places
const PRICE_PRECISION: u32 = 2;

static FUND_VALUE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.vl-box-devise-value").unwrap());
static EURO_RATE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.vl-box-value").unwrap());
static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.vl-box-date").unwrap());

static RE_FUND_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*([A-Z]{3})").unwrap());
static RE_EURO_RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*(%)").unwrap());
static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());

/// Text of the first element matching `selector`
fn select_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

/// Quote date, at midnight in Paris
fn parse_quote_date(document: &Html) -> Result<DateTime<FixedOffset>> {
    let text = select_text(document, &DATE_SELECTOR).ok_or_else(|| anyhow!("Quote date not found"))?;
    let raw = RE_DATE
        .captures(&text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| anyhow!("No date in '{}'", text))?;
    let date: NaiveDate = parse_day_first_date(&raw)?;
    paris_midnight(date)
}

fn paris_midnight(date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date {}", date))?;
    Paris
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| anyhow!("Nonexistent local time {}", midnight))
}

fn parse_value(text: &str, re: &Regex) -> Result<(Decimal, String)> {
    let caps = re
        .captures(text)
        .ok_or_else(|| anyhow!("Unexpected value '{}'", text))?;
    let price = parse_french_decimal(&caps[1])
        .with_context(|| format!("Invalid value '{}'", text))?
        .round_dp(PRICE_PRECISION);
    Ok((price, caps[2].to_string()))
}

/// Net asset value of a fund page: `1 234,56 EUR`
pub fn parse_fund_page(html: &str) -> Result<SourcePrice> {
    let document = Html::parse_document(html);
    let text = select_text(&document, &FUND_VALUE_SELECTOR)
        .ok_or_else(|| anyhow!("Price not found on Quantalys page"))?;
    let (price, currency) = parse_value(&text, &RE_FUND_VALUE)?;

    Ok(SourcePrice {
        price,
        time: parse_quote_date(&document)?,
        currency,
    })
}

/// Rate of return of a euro fund page: `2,10 %`
pub fn parse_euro_fund_page(html: &str) -> Result<SourcePrice> {
    let document = Html::parse_document(html);
    let text = select_text(&document, &EURO_RATE_SELECTOR)
        .ok_or_else(|| anyhow!("Rate not found on Quantalys page"))?;
    let (price, currency) = parse_value(&text, &RE_EURO_RATE)?;

    Ok(SourcePrice {
        price,
        time: parse_quote_date(&document)?,
        currency,
    })
}

pub async fn fetch_fund(ticker: &str) -> Result<Option<SourcePrice>> {
    let client = http_client()?;
    let body = get_text(&client, &format!("{}{}", FUND_URL, urlencoding::encode(ticker))).await?;
    Ok(Some(parse_fund_page(&body)?))
}

pub async fn fetch_euro_fund(ticker: &str) -> Result<Option<SourcePrice>> {
    let client = http_client()?;
    let body = get_text(&client, &format!("{}{}", EURO_FUND_URL, urlencoding::encode(ticker))).await?;
    Ok(Some(parse_euro_fund_page(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const FUND_PAGE: &str = r#"
        <html><body>
          <div class="vl-box">
            <div class="vl-box-devise-value">1 234,567 <span>EUR</span></div>
            <span class="vl-box-date">VL du 14/03/2024</span>
          </div>
        </body></html>"#;

    const EURO_FUND_PAGE: &str = r#"
        <html><body>
          <span class="vl-box-value">2,10 %</span>
          <span class="vl-box-date">31/12/2023</span>
        </body></html>"#;

    #[test]
    fn test_parse_fund_page() {
        let price = parse_fund_page(FUND_PAGE).unwrap();
        assert_eq!(price.price, Decimal::from_str("1234.57").unwrap());
        assert_eq!(price.currency, "EUR");
        assert_eq!(price.time.to_rfc3339(), "2024-03-14T00:00:00+01:00");
    }

    #[test]
    fn test_parse_euro_fund_page() {
        let price = parse_euro_fund_page(EURO_FUND_PAGE).unwrap();
        assert_eq!(price.price, Decimal::from_str("2.10").unwrap());
        assert_eq!(price.currency, "%");
        assert_eq!(price.time.date_naive(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_summer_time() {
        let time = paris_midnight(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()).unwrap();
        assert_eq!(time.to_rfc3339(), "2024-07-01T00:00:00+02:00");
    }

    #[test]
    fn test_missing_value() {
        assert!(parse_fund_page("<html><body>Fonds inconnu</body></html>").is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_fund() {
        let price = fetch_fund("5236").await.unwrap().unwrap();
        assert!(price.price > Decimal::ZERO);
    }
}
