use indexmap::IndexMap;

use crate::helpers::{format_decimal, parse_number};
use crate::tables::{MeasurementCategory, Tables};
use crate::types::MetaValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MeasurementParts {
    pub value: f64,
    /// Canonical spelling of the source unit; empty for bare counts.
    pub unit: String,
    pub category: MeasurementCategory,
    pub si_value: f64,
    pub si_unit: String,
}

impl MeasurementParts {
    pub fn normalized(&self) -> String {
        format!("{} {}", format_decimal(self.si_value), self.si_unit)
    }

    pub fn display(&self) -> String {
        if self.unit.is_empty() {
            format_decimal(self.value)
        } else if self.unit == "%" {
            format!("{}%", format_decimal(self.value))
        } else {
            format!("{} {}", format_decimal(self.value), self.unit)
        }
    }
}

/// Parse a `number [unit]` mention. A bare number (a range endpoint before
/// unit back-propagation) classifies as a count with itself as SI value.
pub(crate) fn parse_measurement(text: &str, tables: &Tables) -> Option<MeasurementParts> {
    let text = text.trim();
    let digits_end = text
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(text.len());
    let value = parse_number(&text[..digits_end])?;
    let alias = text[digits_end..].trim();

    if alias.is_empty() {
        return Some(MeasurementParts {
            value,
            unit: String::new(),
            category: MeasurementCategory::Count,
            si_value: value,
            si_unit: "count".to_string(),
        });
    }

    with_unit(value, alias, tables)
}

/// Re-resolve a bare endpoint against a back-propagated unit alias.
pub(crate) fn with_unit(value: f64, alias: &str, tables: &Tables) -> Option<MeasurementParts> {
    let entry = tables.unit(alias)?;
    let si_raw = (value + entry.si_offset) * entry.si_factor;
    // Six decimals is plenty for document measurements and keeps the
    // canonical string stable across platforms.
    let si_value = (si_raw * 1e6).round() / 1e6;
    Some(MeasurementParts {
        value,
        unit: entry.canonical.clone(),
        category: entry.category,
        si_value,
        si_unit: entry.si_unit.clone(),
    })
}

pub(crate) fn measurement_metadata(parts: &MeasurementParts) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert("value".to_string(), MetaValue::Float(parts.value));
    meta.insert("unit".to_string(), parts.unit.clone().into());
    meta.insert("si_value".to_string(), MetaValue::Float(parts.si_value));
    meta.insert("si_unit".to_string(), parts.si_unit.clone().into());
    meta.insert(
        "measurement_type".to_string(),
        parts.category.as_str().into(),
    );
    meta.insert("display_value".to_string(), parts.display().into());
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::test_tables;

    #[test]
    fn length_converts_to_meters() {
        let t = test_tables();
        let m = parse_measurement("30 inches", &t).unwrap();
        assert_eq!(m.category, MeasurementCategory::Length);
        assert_eq!(m.si_value, 0.762);
        assert_eq!(m.normalized(), "0.762 m");
        assert_eq!(m.display(), "30 in");

        let m = parse_measurement("94 cm", &t).unwrap();
        assert_eq!(m.si_value, 0.94);
    }

    #[test]
    fn percentages_become_ratios() {
        let t = test_tables();
        let m = parse_measurement("10%", &t).unwrap();
        assert_eq!(m.category, MeasurementCategory::Percentage);
        assert_eq!(m.si_value, 0.1);
        assert_eq!(m.si_unit, "ratio");
        assert_eq!(m.display(), "10%");

        let m = parse_measurement("2.5 percent", &t).unwrap();
        assert_eq!(m.si_value, 0.025);
    }

    #[test]
    fn temperature_applies_offset_before_factor() {
        let t = test_tables();
        let m = parse_measurement("212 °F", &t).unwrap();
        assert_eq!(m.category, MeasurementCategory::Temperature);
        assert_eq!(m.si_value, 100.0);
    }

    #[test]
    fn bare_numbers_are_counts() {
        let t = test_tables();
        let m = parse_measurement("30", &t).unwrap();
        assert_eq!(m.category, MeasurementCategory::Count);
        assert_eq!(m.si_value, 30.0);
        assert_eq!(m.unit, "");
    }

    #[test]
    fn unknown_unit_fails() {
        let t = test_tables();
        assert!(parse_measurement("30 furlongs", &t).is_none());
    }

    #[test]
    fn back_propagation_resolves_bare_endpoint() {
        let t = test_tables();
        let m = with_unit(30.0, "inches", &t).unwrap();
        assert_eq!(m.si_value, 0.762);
        assert_eq!(m.unit, "in");
    }
}
