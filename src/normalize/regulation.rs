use indexmap::IndexMap;

use crate::tables::Tables;
use crate::types::MetaValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegulationParts {
    pub title: u32,
    pub part: u32,
    pub section: Option<String>,
    pub agency: Option<String>,
}

impl RegulationParts {
    /// Canonical citation form: `29 CFR 1926.1050`.
    pub fn normalized(&self) -> String {
        match &self.section {
            Some(section) => format!("{} CFR {}.{}", self.title, self.part, section),
            None => format!("{} CFR {}", self.title, self.part),
        }
    }
}

/// Parse `<title> CFR <part>(.<section>)?` citations. The agency comes from
/// the title-to-agency table (29 -> OSHA, 21 -> FDA, ...).
pub(crate) fn parse_regulation(text: &str, tables: &Tables) -> Option<RegulationParts> {
    let mut tokens = text.split_whitespace();

    let title: u32 = tokens.next()?.parse().ok()?;

    let marker = tokens.next()?;
    if !marker.replace('.', "").eq_ignore_ascii_case("cfr") {
        return None;
    }

    let mut rest = tokens.next()?;
    if rest.eq_ignore_ascii_case("part") {
        rest = tokens.next()?;
    }

    let (part, section) = match rest.split_once('.') {
        Some((p, s)) => (p.parse().ok()?, Some(s.to_string())),
        None => (rest.parse().ok()?, None),
    };

    Some(RegulationParts {
        agency: tables.cfr_agency(title).map(String::from),
        title,
        part,
        section,
    })
}

pub(crate) fn regulation_metadata(parts: &RegulationParts) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert("title".to_string(), MetaValue::Int(parts.title as i64));
    meta.insert("part".to_string(), MetaValue::Int(parts.part as i64));
    meta.insert(
        "section".to_string(),
        parts.section.clone().map_or(MetaValue::Null, MetaValue::Str),
    );
    meta.insert(
        "agency".to_string(),
        parts.agency.clone().map_or(MetaValue::Null, MetaValue::Str),
    );
    meta
}
