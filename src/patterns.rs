use crate::tables::Tables;
use crate::types::EntityKind;

/// One named pattern in the structured regex set. The name survives into
/// `RawEntity::detector_tag` so downstream stages can tell which pattern
/// produced a match.
#[derive(Debug, Clone)]
pub(crate) struct PatternSpec {
    pub name: &'static str,
    pub kind: EntityKind,
    pub pattern: String,
}

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|\
                      November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

/// Separators accepted between range endpoints. `between X and Y` is covered
/// by the optional leading word in the range pattern.
const RANGE_JOINERS: &str = "-|–|—|to|through|and";

/// Materialize the full structured pattern list.
///
/// Most patterns are fixed; the measurement patterns are generated from the
/// unit table so the corpus stays the single source of truth for unit
/// spellings. Every pattern must compile under the `regex` crate, which
/// rules out backreferences and lookaround by construction.
pub(crate) fn structured_patterns(tables: &Tables) -> Vec<PatternSpec> {
    let unit = unit_alternation(tables);
    let number = r"\d[\d,]*(?:\.\d+)?";

    vec![
        PatternSpec {
            name: "date_long",
            kind: EntityKind::Date,
            pattern: format!(r"(?i)\b(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"),
        },
        PatternSpec {
            name: "date_long_dmy",
            kind: EntityKind::Date,
            pattern: format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})\.?,?\s+\d{{4}}\b"),
        },
        PatternSpec {
            name: "date_iso",
            kind: EntityKind::Date,
            pattern: r"\b\d{4}-\d{2}-\d{2}\b".to_string(),
        },
        PatternSpec {
            name: "date_numeric",
            kind: EntityKind::Date,
            pattern: r"\b\d{1,2}/\d{1,2}/\d{4}\b".to_string(),
        },
        PatternSpec {
            name: "date_year",
            kind: EntityKind::Date,
            pattern: r"\b(?:19|20)\d{2}\b".to_string(),
        },
        PatternSpec {
            name: "time_12h",
            kind: EntityKind::Time,
            pattern: r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?\s?(?:AM|PM|A\.M\.|P\.M\.)".to_string(),
        },
        PatternSpec {
            name: "time_24h",
            kind: EntityKind::Time,
            pattern: r"\b(?:[01]?\d|2[0-3]):[0-5]\d(?::[0-5]\d)?\b".to_string(),
        },
        PatternSpec {
            name: "time_word",
            kind: EntityKind::Time,
            pattern: r"(?i)\b(?:noon|midnight)\b".to_string(),
        },
        PatternSpec {
            name: "money",
            kind: EntityKind::Money,
            pattern: format!(
                r"[$€£¥]\s?{number}(?:\s?(?i:million|billion|trillion|thousand|bn|mm|[kmb])\b)?"
            ),
        },
        // Compound NUM [unit] JOIN NUM unit form. The detector explodes a hit
        // into two MEASUREMENT raw entities plus one RANGE_INDICATOR via the
        // capture groups; normalization later fuses them back into a range.
        PatternSpec {
            name: "measurement_range",
            kind: EntityKind::Measurement,
            pattern: format!(
                r"(?i)\b(?:between\s+)?({number})\s*({unit})?\s*({RANGE_JOINERS})\s*({number})\s*({unit})"
            ),
        },
        PatternSpec {
            name: "measurement",
            kind: EntityKind::Measurement,
            pattern: format!(r"(?i)\b({number})\s*({unit})"),
        },
        PatternSpec {
            name: "percent",
            kind: EntityKind::Measurement,
            pattern: format!(r"(?i)\b({number})\s?(%|percent\b)"),
        },
        PatternSpec {
            name: "phone",
            kind: EntityKind::Phone,
            pattern: r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b".to_string(),
        },
        PatternSpec {
            name: "email",
            kind: EntityKind::Email,
            pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b".to_string(),
        },
        PatternSpec {
            name: "url",
            kind: EntityKind::Url,
            pattern: r#"\bhttps?://[^\s<>()\[\]{}"']+|\bwww\.[^\s<>()\[\]{}"']+"#.to_string(),
        },
        PatternSpec {
            name: "regulation",
            kind: EntityKind::Regulation,
            pattern: r"(?i)\b(\d{1,2})\s?C\.?F\.?R\.?\s?(?:Part\s+)?(\d+)(?:\.(\d+))?\b".to_string(),
        },
    ]
}

/// Build the unit alternation from every alias in the unit table.
///
/// Aliases ending in a word character get a trailing `\b` so `5 m` never
/// matches inside `5 mars`; symbol aliases (`%`, `°F`, `"`) cannot take a
/// word boundary and are alternated bare. Longest-first ordering makes the
/// leftmost-first engine prefer `miles` over `mi`.
fn unit_alternation(tables: &Tables) -> String {
    let mut aliases = tables.unit_aliases();
    aliases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut worded = Vec::new();
    let mut symbolic = Vec::new();
    for alias in &aliases {
        let escaped = regex::escape(alias);
        if alias
            .chars()
            .last()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false)
        {
            worded.push(escaped);
        } else {
            symbolic.push(escaped);
        }
    }

    match (worded.is_empty(), symbolic.is_empty()) {
        (false, false) => format!("(?:{})\\b|{}", worded.join("|"), symbolic.join("|")),
        (false, true) => format!("(?:{})\\b", worded.join("|")),
        (true, false) => symbolic.join("|"),
        (true, true) => "[^\\s\\S]".to_string(), // matches nothing; empty unit table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::test_tables;

    #[test]
    fn all_patterns_compile_under_linear_time_engine() {
        let tables = test_tables();
        for spec in structured_patterns(&tables) {
            let re = regex::Regex::new(&spec.pattern)
                .unwrap_or_else(|e| panic!("pattern {} failed to compile: {e}", spec.name));
            // No configured pattern may admit a zero-length match.
            assert!(re.find("").is_none(), "pattern {} is degenerate", spec.name);
        }
    }

    #[test]
    fn unit_alternation_prefers_longest_alias() {
        let tables = test_tables();
        let alt = unit_alternation(&tables);
        let re = regex::Regex::new(&format!("(?i)^(?:{alt})")).unwrap();
        assert_eq!(re.find("inches").unwrap().as_str(), "inches");
        // `m` must not match as a prefix of an unknown word.
        assert!(re.find("mars").is_none());
    }
}
