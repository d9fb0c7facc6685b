use std::time::Instant;

use aho_corasick::AhoCorasick;
use regex::{Regex, RegexSet};

use crate::corpus::GazetteerEntry;
use crate::error::{Error, Result};
use crate::helpers::token_bounded;
use crate::patterns::{structured_patterns, PatternSpec};
use crate::tables::Tables;
use crate::types::{EntityKind, RawEntity, Span};

// ---------------------------------------------------------------------------
// Gazetteer automaton  (PERSON / ORG / LOC / GPE)
// ---------------------------------------------------------------------------

/// One case-insensitive Aho-Corasick automaton over every gazetteer surface
/// form. The match payload carries `(kind, subcategory)` keyed by pattern ID.
#[derive(Debug)]
pub(crate) struct GazetteerAutomaton {
    ac: AhoCorasick,
    payloads: Vec<(EntityKind, Option<String>)>,
}

impl GazetteerAutomaton {
    pub fn build(entries: Vec<GazetteerEntry>) -> Result<Self> {
        let mut patterns = Vec::with_capacity(entries.len());
        let mut payloads = Vec::with_capacity(entries.len());
        for entry in entries {
            patterns.push(entry.surface);
            payloads.push((entry.kind, entry.subcategory));
        }
        let ac = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)?;
        Ok(Self { ac, payloads })
    }

    pub fn entry_count(&self) -> usize {
        self.payloads.len()
    }

    /// Scan `text` for gazetteer hits. Matches must sit on token boundaries;
    /// PERSON hits preceded by a known honorific extend left to include it so
    /// normalization can strip the title and keep the titled form as alias.
    pub fn scan(&self, text: &str, tables: &Tables) -> Vec<RawEntity> {
        let mut raws = Vec::new();
        for mat in self.ac.find_overlapping_iter(text) {
            if !token_bounded(text, mat.start(), mat.end()) {
                continue;
            }
            let (kind, ref subcategory) = self.payloads[mat.pattern().as_usize()];
            let mut start = mat.start();
            if kind == EntityKind::Person {
                start = expand_honorific(text, start, tables);
            }
            let span = Span::new(start, mat.end());
            raws.push(RawEntity {
                kind,
                text: span.slice(text).to_string(),
                span,
                detector_tag: "gazetteer".to_string(),
                subcategory: subcategory.clone(),
            });
        }
        resolve_overlaps(raws)
    }
}

/// If the bytes immediately before `start` are `<honorific> `, move the span
/// start onto the honorific. Only one title is consumed; `Prof. Dr.` chains
/// are not a thing in the corpora this engine targets.
fn expand_honorific(text: &str, start: usize, tables: &Tables) -> usize {
    // Compare raw bytes: an arbitrary `start - needle_len` offset may not be
    // a char boundary in the surrounding text.
    let bytes = text.as_bytes();
    for title in tables.honorifics() {
        let needle_len = title.len() + 1;
        if start < needle_len {
            continue;
        }
        let tail = &bytes[start - needle_len..start];
        if tail.last() == Some(&b' ') && &tail[..title.len()] == title.as_bytes() {
            let new_start = start - needle_len;
            // Only the left edge matters; the right edge continues into the name.
            if new_start == 0 || !crate::helpers::is_word_byte(bytes[new_start - 1]) {
                return new_start;
            }
        }
    }
    start
}

// ---------------------------------------------------------------------------
// Structured regex set  (DATE / TIME / MONEY / MEASUREMENT / ...)
// ---------------------------------------------------------------------------

/// A single compiled multi-regex whose match payload is the pattern name.
///
/// `RegexSet` answers "which patterns occur at all?" in one linear pass;
/// only the patterns that occur are then run individually for byte-exact
/// spans. Both passes are finite-automaton and linear in the input.
#[derive(Debug)]
pub(crate) struct StructuredRegexSet {
    set: RegexSet,
    regexes: Vec<Regex>,
    specs: Vec<PatternSpec>,
}

impl StructuredRegexSet {
    pub fn build(tables: &Tables) -> Result<Self> {
        let specs = structured_patterns(tables);

        let mut regexes = Vec::with_capacity(specs.len());
        for spec in &specs {
            let re = Regex::new(&spec.pattern).map_err(|e| Error::InvalidPattern {
                name: spec.name.to_string(),
                source: Box::new(e),
            })?;
            // Init-time guard: a zero-length match would make the emit loop
            // spin in place.
            if re.find("").is_some() {
                return Err(Error::DegeneratePattern {
                    name: spec.name.to_string(),
                });
            }
            regexes.push(re);
        }

        let set = RegexSet::new(specs.iter().map(|s| s.pattern.as_str())).map_err(|e| {
            Error::InvalidPattern {
                name: "structured_set".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self {
            set,
            regexes,
            specs,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.specs.len()
    }

    /// Scan `text` with every pattern that occurs. Returns the raw entities
    /// plus a flag saying whether the deadline cut the scan short.
    pub fn scan(&self, text: &str, deadline: Option<Instant>) -> (Vec<RawEntity>, bool) {
        let mut raws = Vec::new();
        let mut timed_out = false;

        for idx in self.set.matches(text) {
            if deadline.map_or(false, |d| Instant::now() >= d) {
                timed_out = true;
                break;
            }
            let spec = &self.specs[idx];
            let re = &self.regexes[idx];
            match spec.name {
                "measurement_range" => explode_ranges(re, text, &mut raws),
                "url" => scan_urls(re, text, &mut raws),
                _ => {
                    for mat in re.find_iter(text) {
                        let span = Span::new(mat.start(), mat.end());
                        raws.push(RawEntity {
                            kind: spec.kind,
                            text: mat.as_str().to_string(),
                            span,
                            detector_tag: spec.name.to_string(),
                            subcategory: None,
                        });
                    }
                }
            }
        }

        (resolve_overlaps(raws), timed_out)
    }
}

/// Explode one compound `NUM [unit] JOIN NUM unit` hit into its three
/// constituent raw entities. The capture groups are, in order: first number,
/// optional first unit, joiner, second number, second unit.
fn explode_ranges(re: &Regex, text: &str, raws: &mut Vec<RawEntity>) {
    for caps in re.captures_iter(text) {
        let (Some(num1), Some(joiner), Some(num2), Some(unit2)) =
            (caps.get(1), caps.get(3), caps.get(4), caps.get(5))
        else {
            continue;
        };

        let first_end = caps.get(2).map_or(num1.end(), |u| u.end());
        let first = Span::new(num1.start(), first_end);
        raws.push(RawEntity {
            kind: EntityKind::Measurement,
            text: first.slice(text).to_string(),
            span: first,
            detector_tag: "measurement_range".to_string(),
            subcategory: None,
        });

        let join_span = Span::new(joiner.start(), joiner.end());
        raws.push(RawEntity {
            kind: EntityKind::RangeIndicator,
            text: join_span.slice(text).to_string(),
            span: join_span,
            detector_tag: "range_indicator".to_string(),
            subcategory: None,
        });

        let second = Span::new(num2.start(), unit2.end());
        raws.push(RawEntity {
            kind: EntityKind::Measurement,
            text: second.slice(text).to_string(),
            span: second,
            detector_tag: "measurement_range".to_string(),
            subcategory: None,
        });
    }
}

/// URLs need their trailing sentence punctuation trimmed: `see https://x.org.`
/// must not capture the final period.
fn scan_urls(re: &Regex, text: &str, raws: &mut Vec<RawEntity>) {
    for mat in re.find_iter(text) {
        let trimmed = mat
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        if trimmed.is_empty() {
            continue;
        }
        let span = Span::new(mat.start(), mat.start() + trimmed.len());
        raws.push(RawEntity {
            kind: EntityKind::Url,
            text: trimmed.to_string(),
            span,
            detector_tag: "url".to_string(),
            subcategory: None,
        });
    }
}

// ---------------------------------------------------------------------------
// Overlap resolution
// ---------------------------------------------------------------------------

/// Resolve overlaps within each kind family: at a shared start the longest
/// match wins; on partial overlap the earlier start wins. Cross-kind
/// overlaps are preserved (normalization decides whether to merge them).
/// Exact duplicates from different patterns collapse to one.
pub(crate) fn resolve_overlaps(mut raws: Vec<RawEntity>) -> Vec<RawEntity> {
    raws.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.end.cmp(&a.span.end))
            .then(a.kind.cmp(&b.kind))
    });
    raws.dedup_by(|a, b| a.kind == b.kind && a.span == b.span);

    let mut kept: Vec<RawEntity> = Vec::with_capacity(raws.len());
    let mut last_end_per_kind: std::collections::HashMap<EntityKind, usize> =
        std::collections::HashMap::new();
    for raw in raws {
        let last_end = last_end_per_kind.get(&raw.kind).copied().unwrap_or(0);
        if raw.span.start < last_end {
            continue;
        }
        last_end_per_kind.insert(raw.kind, raw.span.end);
        kept.push(raw);
    }
    kept
}

/// Run both matchers over the same buffer and merge their outputs into one
/// span-ordered stream. The two scans are independent, so they run on
/// separate cores via `rayon::join`.
pub(crate) fn detect(
    text: &str,
    gazetteer: &GazetteerAutomaton,
    structured: &StructuredRegexSet,
    tables: &Tables,
    deadline: Option<Instant>,
) -> (Vec<RawEntity>, bool) {
    let (mut gaz_raws, (structured_raws, timed_out)) = rayon::join(
        || gazetteer.scan(text, tables),
        || structured.scan(text, deadline),
    );

    gaz_raws.extend(structured_raws);
    gaz_raws.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.end.cmp(&a.span.end))
            .then(a.kind.cmp(&b.kind))
    });
    (gaz_raws, timed_out)
}
