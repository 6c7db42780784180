//! Beancount text rendering

use super::{Amount, Balance, Directive, Meta, Posting, Transaction};
use std::fmt::{self, Display, Formatter};
use std::io::Write;

const INDENT: &str = "  ";

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Display for Meta {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{INDENT}{}: {}", key, quoted(value))?;
        }
        Ok(())
    }
}

impl Display for Posting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(INDENT)?;
        if let Some(flag) = self.flag {
            write!(f, "{} ", flag.as_char())?;
        }
        write!(f, "{}  {}", self.account, self.units)?;
        if let Some(cost) = &self.cost {
            write!(f, " {{{} {}}}", cost.number, cost.currency)?;
        }
        if let Some(price) = &self.price {
            write!(f, " @ {}", price)?;
        }
        Ok(())
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.flag.as_char())?;
        match (&self.payee, &self.narration) {
            (Some(payee), narration) => write!(
                f,
                " {} {}",
                quoted(payee),
                quoted(narration.as_deref().unwrap_or(""))
            )?,
            (None, Some(narration)) => write!(f, " {}", quoted(narration))?,
            (None, None) => {}
        }
        writeln!(f)?;
        write!(f, "{}", self.meta)?;
        for posting in &self.postings {
            writeln!(f, "{}", posting)?;
        }
        Ok(())
    }
}

impl Display for Balance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} balance {}  {}", self.date, self.account, self.amount)?;
        write!(f, "{}", self.meta)
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(t) => t.fmt(f),
            Self::Balance(b) => b.fmt(f),
        }
    }
}

/// Write directives separated by blank lines
pub fn write_directives<W: Write>(directives: &[Directive], mut out_w: W) -> std::io::Result<()> {
    for d in directives {
        writeln!(out_w, "{d}")?;
    }
    Ok(())
}

pub fn render_directives(directives: &[Directive]) -> String {
    directives
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::super::{Cost, Flag};
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_render_transaction() {
        let txn = Transaction {
            meta: Meta::new("releve.pdf", 1)
                .with("source", "pdfbourso")
                .with("document", "2024-01-31 Boursorama.pdf"),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            flag: Flag::Okay,
            payee: Some("CB \"CARREFOUR\"".to_string()),
            narration: None,
            postings: vec![Posting::new("Actif:Boursorama:CCJoint", Amount::eur(d("-12.34")))],
        };

        assert_eq!(
            txn.to_string(),
            "2024-01-15 * \"CB \\\"CARREFOUR\\\"\" \"\"\n\
             \x20 source: \"pdfbourso\"\n\
             \x20 document: \"2024-01-31 Boursorama.pdf\"\n\
             \x20 Actif:Boursorama:CCJoint  -12.34 EUR\n"
        );
    }

    #[test]
    fn test_render_posting_with_cost_and_price() {
        let posting = Posting::new("Actif:Linxea:AVTim1:FR0010", Amount::new(d("2.5"), "FR0010"))
            .with_cost(Some(Cost {
                number: d("101.2000"),
                currency: "EUR".to_string(),
            }))
            .with_price(Some(Amount::eur(d("101.2000"))));

        assert_eq!(
            posting.to_string(),
            "  Actif:Linxea:AVTim1:FR0010  2.5 FR0010 {101.2000 EUR} @ 101.2000 EUR"
        );
    }

    #[test]
    fn test_render_balance_and_flag() {
        let balance = Directive::Balance(Balance {
            meta: Meta::default(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            account: "Passif:AirFrance:Amex".to_string(),
            amount: Amount::eur(d("-250.00")),
        });
        assert_eq!(
            balance.to_string(),
            "2024-02-01 balance Passif:AirFrance:Amex  -250.00 EUR\n"
        );

        let txn = Directive::Transaction(Transaction {
            meta: Meta::default(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            flag: Flag::Warning,
            payee: None,
            narration: Some("virement".to_string()),
            postings: vec![],
        });
        assert_eq!(txn.to_string(), "2024-02-01 ! \"virement\"\n");

        let rendered = render_directives(&[balance, txn]);
        assert!(rendered.contains("\n\n2024-02-01 !"));
    }
}
