mod date;
mod measurement;
mod money;
mod phone;
mod range;
mod regulation;
mod rewrite;
mod text;
mod time;

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::config::CoreConfig;
use crate::helpers::format_decimal;
use crate::tables::Tables;
use crate::types::{
    CanonicalEntity, EntityKind, MetaValue, RawEntity, Span, Stage, StageError,
};

use measurement::MeasurementParts;
use rewrite::RewriteTarget;

/// Everything stage-normalize produces for one document.
pub(crate) struct NormalizeOutcome {
    pub canonical_entities: Vec<CanonicalEntity>,
    pub markdown_canonicalized: String,
    pub errors: Vec<StageError>,
    pub attempted: usize,
    pub failed: usize,
    pub timed_out: bool,
}

/// One mention's canonicalization result before dedup grouping.
struct MentionNorm {
    key: String,
    normalized: String,
    metadata: IndexMap<String, MetaValue>,
    measurement: Option<MeasurementParts>,
    error: Option<String>,
}

/// A canonical entity under construction. `cover_spans` is set for ranges,
/// whose rewrite replaces the whole `start..end` stretch rather than the
/// individual endpoint mentions.
struct Candidate {
    kind: EntityKind,
    normalized: String,
    aliases: Vec<String>,
    mentions: Vec<usize>,
    metadata: IndexMap<String, MetaValue>,
    cover_spans: Vec<Span>,
}

type GroupKey = (EntityKind, String);

pub(crate) struct Normalizer<'a> {
    pub tables: &'a Tables,
    pub config: &'a CoreConfig,
}

impl Normalizer<'_> {
    /// Run the four normalization phases over a span-ordered raw stream:
    /// per-kind canonicalization, deduplication, range consolidation, and
    /// ID assignment plus the Markdown rewrite.
    pub fn run(
        &self,
        markdown: &str,
        raws: &[RawEntity],
        ingest: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> NormalizeOutcome {
        let mut groups: IndexMap<GroupKey, Candidate> = IndexMap::new();
        let mut raw_to_group: HashMap<usize, GroupKey> = HashMap::new();
        let mut meas_parts: Vec<Option<MeasurementParts>> = vec![None; raws.len()];
        let mut suppressed: Vec<(usize, usize)> = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;
        let mut timed_out = false;

        // Phase 1: canonicalize each mention and group by (kind, key).
        for (idx, raw) in raws.iter().enumerate() {
            if raw.kind == EntityKind::RangeIndicator {
                continue;
            }
            if idx % 16 == 0 {
                if let Some(d) = deadline {
                    if Instant::now() >= d {
                        timed_out = true;
                        break;
                    }
                }
            }

            // A bare year nested inside a regulation, phone, or money span is
            // that entity's detail, not a date of its own; merge it into the
            // container so the raw stays referenced.
            if raw.kind == EntityKind::Date && raw.detector_tag == "date_year" {
                if let Some(container) = raws.iter().position(|r| {
                    matches!(
                        r.kind,
                        EntityKind::Regulation | EntityKind::Phone | EntityKind::Money
                    ) && r.span.contains(&raw.span)
                }) {
                    suppressed.push((idx, container));
                    continue;
                }
            }

            attempted += 1;
            let norm = self.canonicalize_one(raw, ingest);
            if norm.error.is_some() {
                failed += 1;
            }
            meas_parts[idx] = norm.measurement;

            let key: GroupKey = (raw.kind, norm.key);
            let entry = groups.entry(key.clone()).or_insert_with(|| Candidate {
                kind: raw.kind,
                normalized: norm.normalized.clone(),
                aliases: Vec::new(),
                mentions: Vec::new(),
                metadata: norm.metadata,
                cover_spans: Vec::new(),
            });
            // PERSON and ORG keep the longest observed variant as canonical.
            if matches!(raw.kind, EntityKind::Person | EntityKind::Org)
                && norm.normalized.len() > entry.normalized.len()
            {
                entry.normalized = norm.normalized;
            }
            if !entry.aliases.contains(&raw.text) {
                entry.aliases.push(raw.text.clone());
            }
            entry.mentions.push(idx);
            raw_to_group.insert(idx, key);
        }

        // Phase 2: person suffix collapse (`Johnson` folds into the earlier
        // `Mary Johnson` when the shorter key is a word-aligned suffix).
        collapse_person_suffixes(&mut groups, &mut raw_to_group);

        // Phase 2b: attach nested mentions to their containers.
        for (idx, container) in suppressed {
            if let Some(key) = raw_to_group.get(&container) {
                if let Some(candidate) = groups.get_mut(key) {
                    candidate.mentions.push(idx);
                }
            }
        }

        // Phase 3: range consolidation over the raw stream.
        if !timed_out {
            let (fusions, orphans) =
                range::find_range_fusions(markdown, raws, &meas_parts, self.tables);
            for fusion in fusions {
                self.apply_fusion(markdown, raws, fusion, &mut groups, &mut raw_to_group);
            }
            // A failed triple still references its indicator through the
            // first endpoint's entity.
            for (indicator, first) in orphans {
                if let Some(key) = raw_to_group.get(&first) {
                    if let Some(candidate) = groups.get_mut(key) {
                        candidate.mentions.push(indicator);
                    }
                }
            }
        }

        // Phase 4: deterministic ordering, ID assignment, Markdown rewrite.
        let mut candidates: Vec<Candidate> = groups.into_values().collect();
        for candidate in &mut candidates {
            candidate
                .mentions
                .sort_by_key(|&i| (raws[i].span.start, raws[i].span.end));
            candidate.mentions.dedup();
        }
        candidates.retain(|c| !c.mentions.is_empty());
        candidates.sort_by_key(|c| (raws[c.mentions[0]].span.start, c.kind));

        let mut counters: HashMap<&'static str, usize> = HashMap::new();
        let mut entities = Vec::with_capacity(candidates.len());
        let mut targets = Vec::new();
        for candidate in candidates {
            let prefix = candidate.kind.id_prefix();
            let ordinal = counters.entry(prefix).or_insert(0);
            *ordinal += 1;
            let entity_id = format!("{}{:03}", prefix, ordinal);

            if candidate.cover_spans.is_empty() {
                for &m in &candidate.mentions {
                    // Foreign-kind mentions merged into this entity are not
                    // rewrite sites of their own.
                    if raws[m].kind == candidate.kind {
                        targets.push(RewriteTarget {
                            span: raws[m].span,
                            canonical: candidate.normalized.clone(),
                            entity_id: entity_id.clone(),
                        });
                    }
                }
            } else {
                for &span in &candidate.cover_spans {
                    targets.push(RewriteTarget {
                        span,
                        canonical: candidate.normalized.clone(),
                        entity_id: entity_id.clone(),
                    });
                }
            }

            entities.push(CanonicalEntity {
                entity_id,
                kind: candidate.kind,
                normalized: candidate.normalized,
                aliases: candidate.aliases,
                count: candidate.mentions.len(),
                mentions: candidate.mentions,
                metadata: candidate.metadata,
            });
        }

        let markdown_canonicalized = rewrite::rewrite_markdown(markdown, targets);

        let mut errors = Vec::new();
        if failed > 0 {
            errors.push(StageError {
                stage: Stage::Normalize,
                kind: "NormalizationError".to_string(),
                detail: format!("{failed} of {attempted} entities failed normalization"),
            });
        }

        NormalizeOutcome {
            canonical_entities: entities,
            markdown_canonicalized,
            errors,
            attempted,
            failed,
            timed_out,
        }
    }

    fn apply_fusion(
        &self,
        markdown: &str,
        raws: &[RawEntity],
        fusion: range::RangeFusion,
        groups: &mut IndexMap<GroupKey, Candidate>,
        raw_to_group: &mut HashMap<usize, GroupKey>,
    ) {
        // The endpoints stop being standalone canonicals; their raw entities
        // stay in the raw list untouched.
        for endpoint in [fusion.first, fusion.second] {
            if let Some(key) = raw_to_group.remove(&endpoint) {
                if let Some(candidate) = groups.get_mut(&key) {
                    candidate.mentions.retain(|&m| m != endpoint);
                    if candidate.mentions.is_empty() {
                        groups.shift_remove(&key);
                    }
                }
            }
        }

        let start = &fusion.start_parts;
        let end = &fusion.end_parts;
        let normalized = format!("{} to {}", start.normalized(), end.normalized());

        let key: GroupKey = (EntityKind::Measurement, format!("range:{normalized}"));
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            let mut metadata = IndexMap::new();
            metadata.insert("measurement_type".to_string(), "range".into());
            metadata.insert("start".to_string(), MetaValue::Float(start.value));
            metadata.insert("end".to_string(), MetaValue::Float(end.value));
            metadata.insert("unit".to_string(), end.unit.clone().into());
            metadata.insert("si_start".to_string(), MetaValue::Float(start.si_value));
            metadata.insert("si_end".to_string(), MetaValue::Float(end.si_value));
            metadata.insert("si_unit".to_string(), end.si_unit.clone().into());
            metadata.insert(
                "display_value".to_string(),
                format!(
                    "{} to {} {}",
                    format_decimal(start.value),
                    format_decimal(end.value),
                    end.unit
                )
                .into(),
            );
            Candidate {
                kind: EntityKind::Measurement,
                normalized,
                aliases: Vec::new(),
                mentions: Vec::new(),
                metadata,
                cover_spans: Vec::new(),
            }
        });

        let surface = fusion.span.slice(markdown).to_string();
        if !entry.aliases.contains(&surface) {
            entry.aliases.push(surface);
        }
        entry
            .mentions
            .extend([fusion.first, fusion.indicator, fusion.second]);
        entry.cover_spans.push(fusion.span);
        for m in [fusion.first, fusion.indicator, fusion.second] {
            raw_to_group.insert(m, key.clone());
        }
    }

    fn canonicalize_one(&self, raw: &RawEntity, ingest: DateTime<Utc>) -> MentionNorm {
        let tables = self.tables;
        let surface = raw.text.as_str();

        match raw.kind {
            EntityKind::Person => {
                let (canonical, key) = text::normalize_person(surface, tables);
                ok(key, canonical, IndexMap::new())
            }
            EntityKind::Org => {
                let (canonical, key, meta) =
                    text::normalize_org(surface, raw.subcategory.as_deref(), tables);
                ok(key, canonical, meta)
            }
            EntityKind::Gpe => {
                let (canonical, key, meta) =
                    text::normalize_gpe(surface, raw.subcategory.as_deref(), tables);
                ok(key, canonical, meta)
            }
            EntityKind::Loc => {
                let (canonical, key, meta) =
                    text::normalize_loc(surface, raw.subcategory.as_deref());
                ok(key, canonical, meta)
            }
            EntityKind::Date => match date::parse_date(surface, self.config.ambiguous_date_policy)
            {
                Some(parts) => {
                    let meta =
                        date::date_metadata(&parts, self.config.fiscal_year_anchor, ingest);
                    ok(parts.iso(), parts.iso(), meta)
                }
                None => fail(raw, "unparseable date"),
            },
            EntityKind::Time => match time::parse_time(surface) {
                Some(parts) => ok(
                    parts.canonical(),
                    parts.canonical(),
                    time::time_metadata(&parts),
                ),
                None => fail(raw, "unparseable time"),
            },
            EntityKind::Money => match money::parse_money(surface, tables) {
                Some(parts) => ok(
                    format!("{}:{}", parts.currency, parts.normalized()),
                    parts.normalized(),
                    money::money_metadata(&parts),
                ),
                None => fail(raw, "unparseable amount"),
            },
            EntityKind::Measurement => match measurement::parse_measurement(surface, tables) {
                Some(parts) => {
                    let mut norm = ok(
                        parts.normalized(),
                        parts.normalized(),
                        measurement::measurement_metadata(&parts),
                    );
                    norm.measurement = Some(parts);
                    norm
                }
                None => fail(raw, "unknown unit"),
            },
            EntityKind::Phone => match phone::parse_phone(surface, tables) {
                Some(parts) => ok(
                    parts.digits.clone(),
                    parts.digits.clone(),
                    phone::phone_metadata(&parts),
                ),
                None => fail(raw, "unparseable phone number"),
            },
            EntityKind::Regulation => match regulation::parse_regulation(surface, tables) {
                Some(parts) => ok(
                    parts.normalized().to_lowercase(),
                    parts.normalized(),
                    regulation::regulation_metadata(&parts),
                ),
                None => fail(raw, "unparseable citation"),
            },
            EntityKind::Email => match validate_email(surface) {
                Some(lowered) => ok(lowered.clone(), lowered, IndexMap::new()),
                None => fail(raw, "invalid email"),
            },
            EntityKind::Url => {
                let lower = surface.to_lowercase();
                if lower.starts_with("http://")
                    || lower.starts_with("https://")
                    || lower.starts_with("www.")
                {
                    ok(surface.to_string(), surface.to_string(), IndexMap::new())
                } else {
                    fail(raw, "invalid url")
                }
            }
            // Folded into measurement ranges before this function is called.
            EntityKind::RangeIndicator => fail(raw, "stray range indicator"),
        }
    }
}

fn ok(key: String, normalized: String, metadata: IndexMap<String, MetaValue>) -> MentionNorm {
    MentionNorm {
        key,
        normalized,
        metadata,
        measurement: None,
        error: None,
    }
}

/// Failure keeps the surface text as the canonical form and records the
/// reason on the entity; the document is never aborted over one entity.
fn fail(raw: &RawEntity, detail: &str) -> MentionNorm {
    tracing::warn!(
        kind = raw.kind.as_str(),
        text = raw.text.as_str(),
        detail,
        "entity normalization failed"
    );
    let mut metadata = IndexMap::new();
    metadata.insert("normalization_error".to_string(), detail.into());
    MentionNorm {
        key: format!("error:{}", raw.text.to_lowercase()),
        normalized: raw.text.clone(),
        metadata,
        measurement: None,
        error: Some(detail.to_string()),
    }
}

fn validate_email(text: &str) -> Option<String> {
    let (local, domain) = text.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return None;
    }
    Some(text.to_lowercase())
}

/// Merge `<Name>`-only person entities into a `<First> <Name>` entity when
/// the shorter key is a word-aligned suffix of the longer one.
fn collapse_person_suffixes(
    groups: &mut IndexMap<GroupKey, Candidate>,
    raw_to_group: &mut HashMap<usize, GroupKey>,
) {
    let person_keys: Vec<GroupKey> = groups
        .keys()
        .filter(|(kind, _)| *kind == EntityKind::Person)
        .cloned()
        .collect();

    for short in &person_keys {
        if !groups.contains_key(short) {
            continue;
        }
        let target = person_keys.iter().find(|long| {
            *long != short
                && groups.contains_key(*long)
                && long.1.ends_with(&format!(" {}", short.1))
        });
        let Some(target) = target else { continue };

        let removed = groups.shift_remove(short).expect("checked above");
        let into = groups.get_mut(target).expect("checked above");
        for alias in removed.aliases {
            if !into.aliases.contains(&alias) {
                into.aliases.push(alias);
            }
        }
        for m in &removed.mentions {
            raw_to_group.insert(*m, target.clone());
        }
        into.mentions.extend(removed.mentions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::GazetteerEntry;
    use crate::detector::{detect, GazetteerAutomaton, StructuredRegexSet};
    use crate::tables::tests::test_tables;
    use chrono::TimeZone;

    fn run(markdown: &str, gazetteer_entries: &[(&str, EntityKind, Option<&str>)]) -> (Vec<RawEntity>, NormalizeOutcome) {
        let tables = test_tables();
        let config = CoreConfig::default();
        let gazetteer = GazetteerAutomaton::build(
            gazetteer_entries
                .iter()
                .map(|(s, k, sub)| GazetteerEntry {
                    surface: s.to_string(),
                    kind: *k,
                    subcategory: sub.map(String::from),
                })
                .collect(),
        )
        .unwrap();
        let structured = StructuredRegexSet::build(&tables).unwrap();
        let (raws, _) = detect(markdown, &gazetteer, &structured, &tables, None);

        let ingest = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let normalizer = Normalizer {
            tables: &tables,
            config: &config,
        };
        let outcome = normalizer.run(markdown, &raws, ingest, None);
        (raws, outcome)
    }

    fn entity<'a>(
        outcome: &'a NormalizeOutcome,
        kind: EntityKind,
        normalized: &str,
    ) -> &'a CanonicalEntity {
        outcome
            .canonical_entities
            .iter()
            .find(|e| e.kind == kind && e.normalized == normalized)
            .unwrap_or_else(|| panic!("no {kind:?} entity normalized to {normalized}"))
    }

    #[test]
    fn range_sentence_consolidates_without_deleting_raws() {
        let md = "Handrail height 30-37 inches (76-94 cm)";
        let (raws, outcome) = run(md, &[]);

        // Raw ground truth survives consolidation untouched.
        assert_eq!(
            raws.iter()
                .filter(|r| r.kind == EntityKind::Measurement)
                .count(),
            4
        );
        assert_eq!(
            raws.iter()
                .filter(|r| r.kind == EntityKind::RangeIndicator)
                .count(),
            2
        );

        // Exactly two canonical ranges, no standalone endpoint entities.
        let ranges: Vec<_> = outcome
            .canonical_entities
            .iter()
            .filter(|e| e.kind == EntityKind::Measurement)
            .collect();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].normalized, "0.762 m to 0.9398 m");
        assert_eq!(ranges[1].normalized, "0.76 m to 0.94 m");
        assert_eq!(
            ranges[0].metadata["measurement_type"],
            MetaValue::Str("range".into())
        );
        assert_eq!(ranges[0].metadata["unit"], MetaValue::Str("in".into()));

        // Every raw entity is referenced by some canonical entity.
        let mut referenced: Vec<usize> = outcome
            .canonical_entities
            .iter()
            .flat_map(|e| e.mentions.iter().copied())
            .collect();
        referenced.sort_unstable();
        referenced.dedup();
        assert_eq!(referenced.len(), raws.len());
    }

    #[test]
    fn person_date_time_scenario() {
        let md = "Mary Johnson, Director of Engineering, will present on March 20, 2024 at 2:30 PM.";
        let (_, outcome) = run(md, &[("Mary Johnson", EntityKind::Person, None)]);

        let person = entity(&outcome, EntityKind::Person, "Mary Johnson");
        assert_eq!(person.entity_id, "p001");

        let date = entity(&outcome, EntityKind::Date, "2024-03-20");
        assert_eq!(date.metadata["day_of_week"], MetaValue::Str("Wednesday".into()));
        assert_eq!(date.metadata["quarter"], MetaValue::Str("Q1".into()));

        let time = entity(&outcome, EntityKind::Time, "14:30");
        assert_eq!(time.metadata["minutes_since_midnight"], MetaValue::Int(870));
        // DATE and TIME share the d-prefix namespace.
        assert_eq!(date.entity_id, "d001");
        assert_eq!(time.entity_id, "d002");
    }

    #[test]
    fn regulation_scenario_absorbs_nested_year() {
        let md = "OSHA issued 29 CFR 1926.1050 on March 15, 1991.";
        let (raws, outcome) = run(
            md,
            &[("OSHA", EntityKind::Org, Some("us_government_agencies"))],
        );

        let org = entity(&outcome, EntityKind::Org, "OSHA");
        assert_eq!(org.entity_id, "org001");

        let reg = entity(&outcome, EntityKind::Regulation, "29 CFR 1926.1050");
        assert_eq!(reg.metadata["title"], MetaValue::Int(29));
        assert_eq!(reg.metadata["part"], MetaValue::Int(1926));
        assert_eq!(reg.metadata["section"], MetaValue::Str("1050".into()));
        assert_eq!(reg.metadata["agency"], MetaValue::Str("OSHA".into()));

        // Exactly one DATE canonical: the 1926 nested year merged into the
        // citation instead of becoming its own date.
        let dates: Vec<_> = outcome
            .canonical_entities
            .iter()
            .filter(|e| e.kind == EntityKind::Date)
            .collect();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].normalized, "1991-03-15");

        let year_raw = raws
            .iter()
            .position(|r| r.kind == EntityKind::Date && r.text == "1926")
            .unwrap();
        assert!(reg.mentions.contains(&year_raw));
    }

    #[test]
    fn money_and_percent_scenario() {
        let md = "Workers save $4 for every $1 invested; fines rise 10% per repeat.";
        let (_, outcome) = run(md, &[]);

        let four = entity(&outcome, EntityKind::Money, "4");
        assert_eq!(four.metadata["currency"], MetaValue::Str("USD".into()));
        let one = entity(&outcome, EntityKind::Money, "1");
        assert_eq!(one.metadata["currency"], MetaValue::Str("USD".into()));

        let pct = entity(&outcome, EntityKind::Measurement, "0.1 ratio");
        assert_eq!(
            pct.metadata["measurement_type"],
            MetaValue::Str("percentage".into())
        );
    }

    #[test]
    fn million_scenario_with_year_only_date() {
        let md = "Revenue of $5.2 million in 2024.";
        let (_, outcome) = run(md, &[]);

        let money = entity(&outcome, EntityKind::Money, "5200000");
        assert_eq!(money.metadata["amount"], MetaValue::Float(5_200_000.0));
        assert_eq!(money.aliases, vec!["$5.2 million"]);

        let date = entity(&outcome, EntityKind::Date, "2024");
        assert_eq!(date.metadata["year"], MetaValue::Int(2024));
        assert_eq!(date.metadata["month"], MetaValue::Null);
        assert_eq!(date.metadata["day"], MetaValue::Null);
    }

    #[test]
    fn titled_and_bare_person_mentions_merge() {
        let md = "Dr. Mary Johnson spoke first. Mary Johnson then took questions.";
        let (_, outcome) = run(md, &[("Mary Johnson", EntityKind::Person, None)]);

        let people: Vec<_> = outcome
            .canonical_entities
            .iter()
            .filter(|e| e.kind == EntityKind::Person)
            .collect();
        assert_eq!(people.len(), 1);
        let p = people[0];
        assert_eq!(p.normalized, "Mary Johnson");
        assert_eq!(p.count, 2);
        assert!(p.aliases.contains(&"Dr. Mary Johnson".to_string()));
        assert!(p.aliases.contains(&"Mary Johnson".to_string()));
    }

    #[test]
    fn rewrite_embeds_markers_and_is_deterministic() {
        let md = "Revenue of $5.2 million in 2024.";
        let (_, first) = run(md, &[]);
        let (_, second) = run(md, &[]);
        assert_eq!(first.markdown_canonicalized, second.markdown_canonicalized);
        assert_eq!(
            first.markdown_canonicalized,
            "Revenue of ||5200000||mon001|| in ||2024||d001||."
        );
    }

    #[test]
    fn failed_normalization_keeps_surface_and_flags_error() {
        // Force an unknown unit through the measurement normalizer directly.
        let tables = test_tables();
        let config = CoreConfig::default();
        let raws = vec![RawEntity {
            kind: EntityKind::Measurement,
            span: Span::new(0, 11),
            text: "30 furlongs".to_string(),
            detector_tag: "measurement".to_string(),
            subcategory: None,
        }];
        let normalizer = Normalizer {
            tables: &tables,
            config: &config,
        };
        let ingest = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let outcome = normalizer.run("30 furlongs", &raws, ingest, None);

        assert_eq!(outcome.failed, 1);
        let e = &outcome.canonical_entities[0];
        assert_eq!(e.normalized, "30 furlongs");
        assert_eq!(
            e.metadata["normalization_error"],
            MetaValue::Str("unknown unit".into())
        );
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn empty_document_normalizes_to_nothing() {
        let (_, outcome) = run("", &[]);
        assert!(outcome.canonical_entities.is_empty());
        assert_eq!(outcome.markdown_canonicalized, "");
        assert_eq!(outcome.attempted, 0);
    }
}
