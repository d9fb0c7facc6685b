use indexmap::IndexMap;

use crate::tables::Tables;
use crate::types::MetaValue;

/// PERSON: the title-stripped form is canonical; the dedup key is its
/// lowercase. `Dr. Mary Johnson` and `Mary Johnson` share a key.
pub(crate) fn normalize_person(text: &str, tables: &Tables) -> (String, String) {
    let canonical = tables.strip_honorific(text.trim()).to_string();
    let key = canonical.to_lowercase();
    (canonical, key)
}

/// ORG: mentions tagged as known acronyms expand to their full form;
/// everything else keeps its surface form (the dedup phase later promotes
/// the longest observed variant to canonical).
pub(crate) fn normalize_org(
    text: &str,
    subcategory: Option<&str>,
    tables: &Tables,
) -> (String, String, IndexMap<String, MetaValue>) {
    let surface = text.trim();
    let canonical = if subcategory == Some("acronyms") {
        tables
            .org_expansion(surface)
            .map(String::from)
            .unwrap_or_else(|| surface.to_string())
    } else {
        surface.to_string()
    };

    let mut meta = IndexMap::new();
    if let Some(sub) = subcategory {
        meta.insert("subcategory".to_string(), sub.into());
    }
    let key = canonical.to_lowercase();
    (canonical, key, meta)
}

/// GPE: attach ISO-3166 codes when the country alias table knows the name;
/// the canonical form is the table's display name in that case.
pub(crate) fn normalize_gpe(
    text: &str,
    subcategory: Option<&str>,
    tables: &Tables,
) -> (String, String, IndexMap<String, MetaValue>) {
    let surface = text.trim();
    let mut meta = IndexMap::new();
    if let Some(sub) = subcategory {
        meta.insert("subcategory".to_string(), sub.into());
    }

    let canonical = match tables.country(surface) {
        Some(entry) => {
            meta.insert("iso_alpha2".to_string(), entry.alpha2.clone().into());
            meta.insert("iso_alpha3".to_string(), entry.alpha3.clone().into());
            entry.name.clone()
        }
        None => surface.to_string(),
    };
    let key = canonical.to_lowercase();
    (canonical, key, meta)
}

/// LOC: surface form is canonical; the subcategory (river, mountain, ...) is
/// the payload downstream consumers care about.
pub(crate) fn normalize_loc(
    text: &str,
    subcategory: Option<&str>,
) -> (String, String, IndexMap<String, MetaValue>) {
    let canonical = text.trim().to_string();
    let mut meta = IndexMap::new();
    meta.insert(
        "subcategory".to_string(),
        subcategory.map_or(MetaValue::Null, |s| s.into()),
    );
    let key = canonical.to_lowercase();
    (canonical, key, meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::test_tables;

    #[test]
    fn person_titles_strip_for_key_and_canonical() {
        let t = test_tables();
        let (canonical, key) = normalize_person("Dr. Mary Johnson", &t);
        assert_eq!(canonical, "Mary Johnson");
        assert_eq!(key, "mary johnson");
        let (_, bare_key) = normalize_person("Mary Johnson", &t);
        assert_eq!(key, bare_key);
    }

    #[test]
    fn org_acronyms_expand_only_when_tagged() {
        let t = test_tables();
        let (canonical, _, _) = normalize_org("IMF", Some("acronyms"), &t);
        assert_eq!(canonical, "International Monetary Fund");
        // Same surface without the acronym tag stays as-is.
        let (canonical, _, meta) = normalize_org("IMF", Some("us_government_agencies"), &t);
        assert_eq!(canonical, "IMF");
        assert_eq!(
            meta["subcategory"],
            MetaValue::Str("us_government_agencies".into())
        );
    }

    #[test]
    fn gpe_countries_carry_iso_codes() {
        let t = test_tables();
        let (canonical, key, meta) = normalize_gpe("U.S.", Some("countries"), &t);
        assert_eq!(canonical, "United States");
        assert_eq!(key, "united states");
        assert_eq!(meta["iso_alpha2"], MetaValue::Str("US".into()));
        assert_eq!(meta["iso_alpha3"], MetaValue::Str("USA".into()));
    }

    #[test]
    fn gpe_without_table_entry_keeps_surface() {
        let t = test_tables();
        let (canonical, _, meta) = normalize_gpe("Springfield", Some("major_cities"), &t);
        assert_eq!(canonical, "Springfield");
        assert!(meta.get("iso_alpha2").is_none());
    }

    #[test]
    fn loc_records_subcategory() {
        let (canonical, _, meta) = normalize_loc("Mississippi River", Some("rivers"));
        assert_eq!(canonical, "Mississippi River");
        assert_eq!(meta["subcategory"], MetaValue::Str("rivers".into()));
    }
}
