use chrono::{DateTime, Datelike, NaiveDate, Utc};
use indexmap::IndexMap;

use crate::config::DatePolicy;
use crate::types::MetaValue;

/// Parsed calendar fields before metadata derivation. `month`/`day` are None
/// for year-only mentions like `in 2024`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DateParts {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateParts {
    pub fn iso(&self) -> String {
        match (self.month, self.day) {
            (Some(m), Some(d)) => format!("{:04}-{:02}-{:02}", self.year, m, d),
            _ => format!("{}", self.year),
        }
    }

    fn as_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)
    }
}

/// Deterministic multi-format parser: ISO, numeric (policy-dependent), long
/// month (both `March 20, 2024` and `20 March 2024`), and bare year.
pub(crate) fn parse_date(text: &str, policy: DatePolicy) -> Option<DateParts> {
    let text = text.trim();

    if let Some(parts) = parse_iso(text) {
        return Some(parts);
    }
    if let Some(parts) = parse_numeric(text, policy) {
        return Some(parts);
    }
    if let Some(parts) = parse_long(text) {
        return Some(parts);
    }
    parse_year(text)
}

fn parse_iso(text: &str) -> Option<DateParts> {
    let mut it = text.split('-');
    let (y, m, d) = (it.next()?, it.next()?, it.next()?);
    if it.next().is_some() || y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return None;
    }
    let parts = DateParts {
        year: y.parse().ok()?,
        month: Some(m.parse().ok()?),
        day: Some(d.parse().ok()?),
    };
    parts.as_naive().map(|_| parts)
}

fn parse_numeric(text: &str, policy: DatePolicy) -> Option<DateParts> {
    let mut it = text.split('/');
    let (a, b, y) = (
        it.next()?.parse::<u32>().ok()?,
        it.next()?.parse::<u32>().ok()?,
        it.next()?.parse::<i32>().ok()?,
    );
    if it.next().is_some() {
        return None;
    }
    let (first, second) = match policy {
        DatePolicy::Mdy => (a, b),
        DatePolicy::Dmy => (b, a),
    };
    // The configured order wins; if it produces an impossible date but the
    // swapped reading is valid (`25/12/2024` under MDY), take the swap.
    for (m, d) in [(first, second), (second, first)] {
        let parts = DateParts {
            year: y,
            month: Some(m),
            day: Some(d),
        };
        if parts.as_naive().is_some() {
            return Some(parts);
        }
    }
    None
}

fn month_number(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.').to_lowercase();
    Some(match token.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    })
}

fn parse_day_token(token: &str) -> Option<u32> {
    let token = token.trim_end_matches(',');
    let token = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))
        .unwrap_or(token);
    token.parse().ok()
}

fn parse_long(text: &str) -> Option<DateParts> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 3 {
        return None;
    }
    let year: i32 = tokens[2].trim_end_matches(',').parse().ok()?;

    // `March 20, 2024` or `20 March 2024`.
    let (month, day) = if let Some(m) = month_number(tokens[0]) {
        (m, parse_day_token(tokens[1])?)
    } else {
        (month_number(tokens[1])?, parse_day_token(tokens[0])?)
    };

    let parts = DateParts {
        year,
        month: Some(month),
        day: Some(day),
    };
    parts.as_naive().map(|_| parts)
}

fn parse_year(text: &str) -> Option<DateParts> {
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text.parse().ok()?;
    (1900..=2099).contains(&year).then_some(DateParts {
        year,
        month: None,
        day: None,
    })
}

/// Derive the full metadata bag for a parsed date: calendar fields plus
/// day-of-week, quarter, fiscal year, and past/present/future relative to
/// the document's ingest timestamp.
pub(crate) fn date_metadata(
    parts: &DateParts,
    fiscal_anchor: u32,
    ingest: DateTime<Utc>,
) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert("year".to_string(), MetaValue::Int(parts.year as i64));
    meta.insert(
        "month".to_string(),
        parts.month.map_or(MetaValue::Null, |m| MetaValue::Int(m as i64)),
    );
    meta.insert(
        "day".to_string(),
        parts.day.map_or(MetaValue::Null, |d| MetaValue::Int(d as i64)),
    );

    match parts.as_naive() {
        Some(date) => {
            meta.insert(
                "day_of_week".to_string(),
                MetaValue::Str(date.format("%A").to_string()),
            );
            let month = parts.month.unwrap_or(1);
            meta.insert(
                "quarter".to_string(),
                MetaValue::Str(format!("Q{}", (month - 1) / 3 + 1)),
            );
            meta.insert(
                "fiscal_year".to_string(),
                MetaValue::Int(fiscal_year(parts.year, month, fiscal_anchor) as i64),
            );
            let today = ingest.date_naive();
            let relative = match date.cmp(&today) {
                std::cmp::Ordering::Less => "past",
                std::cmp::Ordering::Equal => "present",
                std::cmp::Ordering::Greater => "future",
            };
            meta.insert("relative_reference".to_string(), relative.into());
        }
        None => {
            meta.insert("day_of_week".to_string(), MetaValue::Null);
            meta.insert("quarter".to_string(), MetaValue::Null);
            meta.insert("fiscal_year".to_string(), MetaValue::Null);
            let relative = match parts.year.cmp(&ingest.year()) {
                std::cmp::Ordering::Less => "past",
                std::cmp::Ordering::Equal => "present",
                std::cmp::Ordering::Greater => "future",
            };
            meta.insert("relative_reference".to_string(), relative.into());
        }
    }
    meta
}

/// Fiscal years are labeled by their ending calendar year: with an October
/// anchor, October 2023 falls in FY2024. Anchor 1 degenerates to the
/// calendar year.
fn fiscal_year(year: i32, month: u32, anchor: u32) -> i32 {
    if anchor <= 1 || month < anchor {
        year
    } else {
        year + 1
    }
}
