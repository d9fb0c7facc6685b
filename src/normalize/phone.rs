use indexmap::IndexMap;

use crate::tables::Tables;
use crate::types::MetaValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PhoneParts {
    /// Every digit of the mention, country code included.
    pub digits: String,
    pub country_code: Option<String>,
    pub area_code: Option<String>,
    pub local_number: Option<String>,
    pub toll_free: bool,
}

impl PhoneParts {
    pub fn formatted_national(&self) -> Option<String> {
        let (area, local) = (self.area_code.as_ref()?, self.local_number.as_ref()?);
        Some(format!("({}) {}-{}", area, &local[..3], &local[3..]))
    }

    pub fn formatted_e164(&self) -> Option<String> {
        let cc = self.country_code.as_ref()?;
        let area = self.area_code.as_ref()?;
        let local = self.local_number.as_ref()?;
        Some(format!("+{cc}{area}{local}"))
    }
}

/// Normalize a phone mention to digits and classify NANP numbers.
/// Non-NANP digit strings are kept digits-only with no decomposition.
pub(crate) fn parse_phone(text: &str, tables: &Tables) -> Option<PhoneParts> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 7 {
        return None;
    }

    // NANP: 10 digits, or 11 with a leading country code of 1.
    let national = match digits.len() {
        10 => Some(&digits[..]),
        11 if digits.starts_with('1') => Some(&digits[1..]),
        _ => None,
    };

    match national {
        Some(national) => {
            let area = &national[..3];
            Some(PhoneParts {
                toll_free: tables.is_toll_free(area),
                country_code: Some("1".to_string()),
                area_code: Some(area.to_string()),
                local_number: Some(national[3..].to_string()),
                digits,
            })
        }
        None => Some(PhoneParts {
            digits,
            country_code: None,
            area_code: None,
            local_number: None,
            toll_free: false,
        }),
    }
}

pub(crate) fn phone_metadata(parts: &PhoneParts) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert(
        "country_code".to_string(),
        parts
            .country_code
            .clone()
            .map_or(MetaValue::Null, MetaValue::Str),
    );
    meta.insert(
        "area_code".to_string(),
        parts
            .area_code
            .clone()
            .map_or(MetaValue::Null, MetaValue::Str),
    );
    meta.insert(
        "number".to_string(),
        parts
            .local_number
            .clone()
            .map_or(MetaValue::Null, MetaValue::Str),
    );
    meta.insert(
        "type".to_string(),
        if parts.toll_free { "toll_free" } else { "standard" }.into(),
    );
    meta.insert(
        "formatted_national".to_string(),
        parts
            .formatted_national()
            .map_or(MetaValue::Null, MetaValue::Str),
    );
    meta.insert(
        "formatted_e164".to_string(),
        parts
            .formatted_e164()
            .map_or(MetaValue::Null, MetaValue::Str),
    );
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::test_tables;

    #[test]
    fn toll_free_nanp_number() {
        let t = test_tables();
        let p = parse_phone("1-800-555-0123", &t).unwrap();
        assert_eq!(p.digits, "18005550123");
        assert_eq!(p.country_code.as_deref(), Some("1"));
        assert_eq!(p.area_code.as_deref(), Some("800"));
        assert!(p.toll_free);
        assert_eq!(p.formatted_national().unwrap(), "(800) 555-0123");
        assert_eq!(p.formatted_e164().unwrap(), "+18005550123");
    }

    #[test]
    fn standard_ten_digit_number() {
        let t = test_tables();
        let p = parse_phone("(212) 555-0147", &t).unwrap();
        assert_eq!(p.area_code.as_deref(), Some("212"));
        assert!(!p.toll_free);
        assert_eq!(p.country_code.as_deref(), Some("1"));
    }

    #[test]
    fn non_nanp_lengths_stay_digits_only() {
        let t = test_tables();
        let p = parse_phone("555-0123", &t).unwrap();
        assert_eq!(p.digits, "5550123");
        assert!(p.area_code.is_none());
        assert!(p.formatted_national().is_none());
    }
}
