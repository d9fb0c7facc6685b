use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Result;

/// Measurement families the normalizer classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementCategory {
    Length,
    Weight,
    Volume,
    Temperature,
    Time,
    Speed,
    Area,
    Angle,
    Percentage,
    Count,
}

impl MeasurementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Weight => "weight",
            Self::Volume => "volume",
            Self::Temperature => "temperature",
            Self::Time => "time",
            Self::Speed => "speed",
            Self::Area => "area",
            Self::Angle => "angle",
            Self::Percentage => "percentage",
            Self::Count => "count",
        }
    }
}

// ---------------------------------------------------------------------------
// Raw YAML schema  (corpus/tables/tables_*.yml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TablesFile {
    honorifics: Vec<String>,
    countries: IndexMap<String, CountryEntry>,
    currencies: IndexMap<String, String>,
    units: IndexMap<String, UnitEntry>,
    cfr_agencies: IndexMap<String, String>,
    toll_free_prefixes: Vec<String>,
    #[serde(default)]
    org_expansions: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryEntry {
    pub alpha2: String,
    pub alpha3: String,
    /// Canonical display name; aliases map here.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitEntry {
    pub category: MeasurementCategory,
    /// SI value = (value + si_offset) * si_factor.
    pub si_factor: f64,
    #[serde(default)]
    pub si_offset: f64,
    pub si_unit: String,
    /// Canonical spelling used in normalized output.
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

// ---------------------------------------------------------------------------
// Lookup form
// ---------------------------------------------------------------------------

/// Canonicalization tables, published once at init and shared read-only by
/// every worker thread.
#[derive(Debug)]
pub struct Tables {
    honorifics: Vec<String>,
    countries: HashMap<String, CountryEntry>,
    currencies: HashMap<String, String>,
    units: HashMap<String, UnitEntry>,
    cfr_agencies: HashMap<u32, String>,
    toll_free: HashSet<String>,
    org_expansions: HashMap<String, String>,
}

impl Tables {
    pub(crate) fn from_yaml(content: &str) -> Result<Self> {
        let file: TablesFile = serde_yaml::from_str(content)?;

        let mut countries = HashMap::new();
        for (alias, entry) in file.countries {
            countries.insert(alias.to_lowercase(), entry.clone());
            // The canonical name is always a valid alias for itself.
            countries.insert(entry.name.to_lowercase(), entry);
        }

        let mut units = HashMap::new();
        for (name, entry) in file.units {
            units.insert(name.to_lowercase(), entry.clone());
            // The canonical spelling must resolve too: range consolidation
            // re-resolves endpoints by the canonical unit name.
            units.insert(entry.canonical.to_lowercase(), entry.clone());
            for alias in &entry.aliases {
                units.insert(alias.to_lowercase(), entry.clone());
            }
        }

        let cfr_agencies = file
            .cfr_agencies
            .into_iter()
            .filter_map(|(title, agency)| title.parse::<u32>().ok().map(|t| (t, agency)))
            .collect();

        Ok(Self {
            honorifics: file.honorifics,
            countries,
            currencies: file.currencies.into_iter().collect(),
            units,
            cfr_agencies,
            toll_free: file.toll_free_prefixes.into_iter().collect(),
            org_expansions: file
                .org_expansions
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
        })
    }

    pub fn honorifics(&self) -> &[String] {
        &self.honorifics
    }

    /// Strip one leading honorific (`Dr. Mary Johnson` -> `Mary Johnson`).
    pub fn strip_honorific<'a>(&self, name: &'a str) -> &'a str {
        for title in &self.honorifics {
            if let Some(rest) = name.strip_prefix(title.as_str()) {
                let rest = rest.trim_start();
                if !rest.is_empty() {
                    return rest;
                }
            }
        }
        name
    }

    pub fn country(&self, name: &str) -> Option<&CountryEntry> {
        self.countries.get(&name.to_lowercase())
    }

    pub fn currency(&self, symbol: &str) -> Option<&str> {
        self.currencies.get(symbol).map(String::as_str)
    }

    pub fn unit(&self, alias: &str) -> Option<&UnitEntry> {
        self.units.get(&alias.to_lowercase())
    }

    pub fn cfr_agency(&self, title: u32) -> Option<&str> {
        self.cfr_agencies.get(&title).map(String::as_str)
    }

    pub fn is_toll_free(&self, area_code: &str) -> bool {
        self.toll_free.contains(area_code)
    }

    pub fn org_expansion(&self, acronym: &str) -> Option<&str> {
        self.org_expansions.get(&acronym.to_uppercase()).map(String::as_str)
    }

    /// Every known unit spelling (lowercased), for regex generation.
    pub(crate) fn unit_aliases(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal but representative tables file shared by unit tests across
    /// the normalize modules.
    pub(crate) const TEST_TABLES: &str = r#"
honorifics: ["Dr.", "Mr.", "Ms.", "Mrs.", "Prof.", "Sir"]
countries:
  "united states":
    alpha2: US
    alpha3: USA
    name: United States
  "u.s.":
    alpha2: US
    alpha3: USA
    name: United States
  "germany":
    alpha2: DE
    alpha3: DEU
    name: Germany
currencies:
  "$": USD
  "€": EUR
  "£": GBP
  "¥": JPY
units:
  meter:
    category: length
    si_factor: 1.0
    si_unit: m
    canonical: m
    aliases: [meters, metre, metres, m]
  inch:
    category: length
    si_factor: 0.0254
    si_unit: m
    canonical: in
    aliases: [inches, in]
  centimeter:
    category: length
    si_factor: 0.01
    si_unit: m
    canonical: cm
    aliases: [centimeters, cm]
  pound:
    category: weight
    si_factor: 0.45359237
    si_unit: kg
    canonical: lb
    aliases: [pounds, lb, lbs]
  fahrenheit:
    category: temperature
    si_factor: 0.5555555555555556
    si_offset: -32.0
    si_unit: "°C"
    canonical: "°F"
    aliases: ["°f", "degrees fahrenheit"]
  percent:
    category: percentage
    si_factor: 0.01
    si_unit: ratio
    canonical: "%"
    aliases: ["%", "percent"]
cfr_agencies:
  "21": FDA
  "29": OSHA
  "40": EPA
  "49": DOT
toll_free_prefixes: ["800", "833", "844", "855", "866", "877", "888"]
org_expansions:
  "IMF": International Monetary Fund
"#;

    pub(crate) fn test_tables() -> Tables {
        Tables::from_yaml(TEST_TABLES).unwrap()
    }

    #[test]
    fn honorific_stripping() {
        let t = test_tables();
        assert_eq!(t.strip_honorific("Dr. Mary Johnson"), "Mary Johnson");
        assert_eq!(t.strip_honorific("Mary Johnson"), "Mary Johnson");
        // A bare title is not a name; leave it alone.
        assert_eq!(t.strip_honorific("Dr."), "Dr.");
    }

    #[test]
    fn unit_aliases_resolve_case_insensitively() {
        let t = test_tables();
        let inch = t.unit("Inches").unwrap();
        assert_eq!(inch.category, MeasurementCategory::Length);
        assert!((inch.si_factor - 0.0254).abs() < 1e-12);
    }

    #[test]
    fn country_and_agency_lookups() {
        let t = test_tables();
        assert_eq!(t.country("United States").unwrap().alpha3, "USA");
        assert_eq!(t.cfr_agency(29), Some("OSHA"));
        assert!(t.is_toll_free("888"));
        assert_eq!(t.org_expansion("imf"), Some("International Monetary Fund"));
    }
}
