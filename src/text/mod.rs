//! Locale helpers for French statements
//!
//! Numbers come as `1.234,56`, `1 234,56` or with non-breaking spaces,
//! dates are day-first and month names are abbreviated in French.

use crate::error::{ImportError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// French month abbreviations and their English counterparts, applied in order
pub const MONTH_TRANSLATIONS: &[(&str, &str)] = &[
    ("fév", "feb"),
    ("mars", "mar"),
    ("avr", "apr"),
    ("mai", "may"),
    ("juin", "jun"),
    ("juil", "jul"),
    ("août", "aug"),
    ("déc", "dec"),
];

const ENGLISH_MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a French formatted amount (1.234,56 / 1 234,56 -> 1234.56)
///
/// When the string holds a comma, dots are thousands separators. Without a
/// comma the dot is taken as the decimal separator (`1.00`).
pub fn parse_french_decimal(s: &str) -> Result<Decimal> {
    let compact: String = s
        .trim()
        .replace("\\u00a", "")
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();

    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    };

    Decimal::from_str(&normalized).map_err(|_| ImportError::InvalidNumber(s.to_string()))
}

/// Parse a US/QIF style amount (1,234.56 -> 1234.56)
pub fn parse_plain_decimal(s: &str) -> Result<Decimal> {
    let cleaned = s.trim().replace(',', "");
    Decimal::from_str(&cleaned).map_err(|_| ImportError::InvalidNumber(s.to_string()))
}

/// Parse a day-first date: dd/mm/yyyy, dd/mm/yy, dd-mm-yyyy or dd.mm.yyyy
pub fn parse_day_first_date(s: &str) -> Result<NaiveDate> {
    let invalid = || ImportError::InvalidDate(s.to_string());

    let parts: Vec<&str> = s.trim().split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    let day: u32 = parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = parts[1].parse().map_err(|_| invalid())?;
    let mut year: i32 = parts[2].parse().map_err(|_| invalid())?;
    if parts[2].len() == 2 {
        year += 2000;
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Replace French month abbreviations with English ones
pub fn translate_months(s: &str) -> String {
    MONTH_TRANSLATIONS
        .iter()
        .fold(s.to_string(), |acc, (fr, en)| acc.replace(fr, en))
}

/// Month number (1-12) of a French or English month abbreviation
pub fn french_month_number(s: &str) -> Option<u32> {
    let translated = translate_months(&s.trim().to_lowercase());
    let prefix: String = translated.chars().take(3).collect();

    ENGLISH_MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

/// Collapse whitespace runs into single spaces
pub fn collapse_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Width of a text fragment as laid out by `pdftotext -layout`
pub fn display_width(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_french_decimal() {
        assert_eq!(parse_french_decimal("1.234,56").unwrap(), d("1234.56"));
        assert_eq!(parse_french_decimal("1 234,56").unwrap(), d("1234.56"));
        assert_eq!(parse_french_decimal("1\u{a0}234,56").unwrap(), d("1234.56"));
        assert_eq!(parse_french_decimal("-123,45").unwrap(), d("-123.45"));
        assert_eq!(parse_french_decimal("0,01").unwrap(), d("0.01"));
        assert_eq!(parse_french_decimal("1.00").unwrap(), d("1.00"));
        assert_eq!(parse_french_decimal("12\\u00a345,00").unwrap(), d("12345.00"));
        assert!(parse_french_decimal("abc").is_err());
    }

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(parse_plain_decimal("-1,234.56").unwrap(), d("-1234.56"));
        assert_eq!(parse_plain_decimal("12.00").unwrap(), d("12.00"));
    }

    #[test]
    fn test_parse_day_first_date() {
        assert_eq!(
            parse_day_first_date("15/03/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(
            parse_day_first_date("05/01/23").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()
        );
        assert_eq!(
            parse_day_first_date("31-12-2019").unwrap(),
            NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()
        );
        assert!(parse_day_first_date("31/02/2020").is_err());
        assert!(parse_day_first_date("2020").is_err());
    }

    #[test]
    fn test_translate_months() {
        let cases = [
            ("fév", "feb"),
            ("mars", "mar"),
            ("avr", "apr"),
            ("mai", "may"),
            ("juin", "jun"),
            ("juil", "jul"),
            ("août", "aug"),
            ("déc", "dec"),
            ("janvier fév mars", "janvier feb mar"),
            ("Le 15 juin 2023", "Le 15 jun 2023"),
        ];
        for (input, expected) in cases {
            assert_eq!(translate_months(input), expected);
        }

        let untouched = "Ceci est une phrase sans mois";
        assert_eq!(translate_months(untouched), untouched);
    }

    #[test]
    fn test_translate_all_months() {
        let input: Vec<&str> = MONTH_TRANSLATIONS.iter().map(|(fr, _)| *fr).collect();
        let expected: Vec<&str> = MONTH_TRANSLATIONS.iter().map(|(_, en)| *en).collect();
        assert_eq!(translate_months(&input.join(" ")), expected.join(" "));
    }

    #[test]
    fn test_french_month_number() {
        assert_eq!(french_month_number("janv"), Some(1));
        assert_eq!(french_month_number("févr"), Some(2));
        assert_eq!(french_month_number("août"), Some(8));
        assert_eq!(french_month_number("sept"), Some(9));
        assert_eq!(french_month_number("déc"), Some(12));
        assert_eq!(french_month_number("xyz"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  CB   CARREFOUR \n  PARIS "), "CB CARREFOUR PARIS");
        assert_eq!(display_width("août"), 4);
    }
}
