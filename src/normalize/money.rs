use indexmap::IndexMap;

use crate::helpers::{format_decimal, group_thousands, parse_number};
use crate::tables::Tables;
use crate::types::MetaValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MoneyParts {
    pub amount: f64,
    pub currency: String,
}

impl MoneyParts {
    pub fn normalized(&self) -> String {
        format_decimal(self.amount)
    }

    pub fn formatted(&self) -> String {
        format!("{} {}", self.currency, group_thousands(self.amount))
    }
}

fn multiplier(word: &str) -> Option<f64> {
    Some(match word.to_lowercase().as_str() {
        "thousand" | "k" => 1e3,
        "million" | "m" | "mm" => 1e6,
        "billion" | "b" | "bn" => 1e9,
        "trillion" => 1e12,
        _ => return None,
    })
}

/// Parse a detected money mention: currency symbol, grouped digits, optional
/// multiplier word. The multiplier is consumed into the amount, so `$5.2
/// million` and `$5,200,000` normalize identically.
pub(crate) fn parse_money(text: &str, tables: &Tables) -> Option<MoneyParts> {
    let text = text.trim();
    let symbol = text.chars().next()?;
    let currency = tables.currency(&symbol.to_string())?.to_string();
    let rest = text[symbol.len_utf8()..].trim_start();

    let digits_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let mut amount = parse_number(&rest[..digits_end])?;

    let suffix = rest[digits_end..].trim();
    if !suffix.is_empty() {
        amount *= multiplier(suffix)?;
    }

    Some(MoneyParts { amount, currency })
}

pub(crate) fn money_metadata(parts: &MoneyParts) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert("amount".to_string(), MetaValue::Float(parts.amount));
    meta.insert("currency".to_string(), parts.currency.clone().into());
    meta.insert("formatted".to_string(), parts.formatted().into());
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::test_tables;

    #[test]
    fn multiplier_words_are_consumed() {
        let t = test_tables();
        let m = parse_money("$5.2 million", &t).unwrap();
        assert_eq!(m.amount, 5_200_000.0);
        assert_eq!(m.currency, "USD");
        assert_eq!(m.normalized(), "5200000");
        assert_eq!(m.formatted(), "USD 5,200,000");
    }

    #[test]
    fn plain_and_grouped_amounts() {
        let t = test_tables();
        assert_eq!(parse_money("$4", &t).unwrap().normalized(), "4");
        assert_eq!(
            parse_money("$5,200,000", &t).unwrap().normalized(),
            "5200000"
        );
        assert_eq!(parse_money("$12.50", &t).unwrap().normalized(), "12.5");
    }

    #[test]
    fn symbol_table_covers_the_majors() {
        let t = test_tables();
        assert_eq!(parse_money("€100", &t).unwrap().currency, "EUR");
        assert_eq!(parse_money("£2k", &t).unwrap().amount, 2_000.0);
        assert_eq!(parse_money("¥500", &t).unwrap().currency, "JPY");
    }

    #[test]
    fn unknown_symbol_or_garbage_fails() {
        let t = test_tables();
        assert!(parse_money("₿100", &t).is_none());
        assert!(parse_money("$", &t).is_none());
        assert!(parse_money("$5 bazillion", &t).is_none());
    }
}
