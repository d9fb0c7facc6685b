use std::path::Path;
use std::time::Instant;

use crate::classifier::KeywordClassifier;
use crate::config::CoreConfig;
use crate::corpus;
use crate::detector::{detect, GazetteerAutomaton, StructuredRegexSet};
use crate::error::Result;
use crate::normalize::Normalizer;
use crate::structure::scan_structure;
use crate::tables::Tables;
use crate::types::{
    ClassificationVector, DocStatus, Document, DocumentRecord, Stage, StageError, StageTimings,
};

/// Immutable matcher handles and tables, built once at process start and
/// shared read-only by every worker thread. Workers borrow, never own.
#[derive(Debug)]
pub struct Engine {
    domain_classifier: KeywordClassifier,
    doc_type_classifier: KeywordClassifier,
    gazetteer: GazetteerAutomaton,
    structured: StructuredRegexSet,
    tables: Tables,
}

/// Corpus sizes for init-time observability.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    pub domain_labels: usize,
    pub doc_type_labels: usize,
    pub keyword_count: usize,
    pub gazetteer_entries: usize,
    pub structured_patterns: usize,
}

impl Engine {
    /// Load the pattern corpus from `dir` and compile every matcher.
    ///
    /// Any missing manifest file, malformed YAML, or invalid pattern fails
    /// the build; the process must not start with a partially built matcher.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let started = Instant::now();

        let manifest = corpus::load_manifest(dir)?;

        // Tables come first: the structured regex set derives its unit
        // alternation from them.
        let (_, tables_src) = corpus::read_corpus_file(dir, &manifest.tables)?;
        let tables = Tables::from_yaml(&tables_src)?;

        let mut entries = Vec::new();
        for spec in &manifest.gazetteers {
            entries.extend(corpus::load_gazetteer(dir, spec)?);
        }
        let domains = corpus::load_keyword_file(dir, &manifest.keywords.domains)?;
        let doc_types = corpus::load_keyword_file(dir, &manifest.keywords.doc_types)?;

        // Compile the two classifier automata and the two detectors on
        // separate cores; none depends on another.
        let (classifiers, detectors) = rayon::join(
            || -> Result<_> {
                Ok((
                    KeywordClassifier::build(domains)?,
                    KeywordClassifier::build(doc_types)?,
                ))
            },
            || -> Result<_> {
                Ok((
                    GazetteerAutomaton::build(entries)?,
                    StructuredRegexSet::build(&tables)?,
                ))
            },
        );
        let (domain_classifier, doc_type_classifier) = classifiers?;
        let (gazetteer, structured) = detectors?;

        let engine = Self {
            domain_classifier,
            doc_type_classifier,
            gazetteer,
            structured,
            tables,
        };
        let stats = engine.stats();
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            domains = stats.domain_labels,
            doc_types = stats.doc_type_labels,
            keywords = stats.keyword_count,
            gazetteer_entries = stats.gazetteer_entries,
            patterns = stats.structured_patterns,
            "extraction engine built"
        );
        Ok(engine)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            domain_labels: self.domain_classifier.label_count(),
            doc_type_labels: self.doc_type_classifier.label_count(),
            keyword_count: self.domain_classifier.keyword_count()
                + self.doc_type_classifier.keyword_count(),
            gazetteer_entries: self.gazetteer.entry_count(),
            structured_patterns: self.structured.pattern_count(),
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Run the CPU stages (structure, classify, detect, normalize) for one
    /// document and assemble its record. Never fails: every per-entity or
    /// per-stage problem is recorded on the record instead.
    pub fn process(&self, doc: Document, config: &CoreConfig) -> DocumentRecord {
        let mut timings = StageTimings::default();
        let mut errors = Vec::new();

        if doc.encoding_lossy {
            errors.push(StageError {
                stage: Stage::Ingest,
                kind: "EncodingError".to_string(),
                detail: "invalid UTF-8 replaced with U+FFFD".to_string(),
            });
        }

        let t = Instant::now();
        let structure = scan_structure(&doc.markdown);
        timings.structure = ms_since(t);

        let t = Instant::now();
        let domains = self.domain_classifier.classify(&doc.markdown);
        let doc_types = self.doc_type_classifier.classify(&doc.markdown);
        let classification = ClassificationVector {
            primary_confidence: domains.confidence,
            primary_domain: domains.primary,
            primary_doc_type: doc_types.primary,
            domains: domains.scores,
            doc_types: doc_types.scores,
        };
        timings.classify = ms_since(t);

        // Detect and normalize share one per-document budget.
        let deadline = (config.per_doc_timeout_ms > 0).then(|| {
            Instant::now() + std::time::Duration::from_millis(config.per_doc_timeout_ms)
        });

        let t = Instant::now();
        let (raws, detect_timed_out) =
            detect(&doc.markdown, &self.gazetteer, &self.structured, &self.tables, deadline);
        timings.detect = ms_since(t);

        let t = Instant::now();
        let normalizer = Normalizer {
            tables: &self.tables,
            config,
        };
        let outcome = normalizer.run(&doc.markdown, &raws, doc.ingest_timestamp, deadline);
        timings.normalize = ms_since(t);
        errors.extend(outcome.errors);

        let timed_out = detect_timed_out || outcome.timed_out;
        if timed_out {
            errors.push(StageError {
                stage: if detect_timed_out {
                    Stage::Detect
                } else {
                    Stage::Normalize
                },
                kind: "DetectorTimeout".to_string(),
                detail: format!(
                    "per-document budget of {} ms exceeded",
                    config.per_doc_timeout_ms
                ),
            });
        }

        // Half or more entities failing downgrades the whole document.
        let status = if timed_out
            || (outcome.attempted > 0 && outcome.failed * 2 >= outcome.attempted)
        {
            DocStatus::Partial
        } else {
            DocStatus::Ok
        };

        tracing::debug!(
            document_id = doc.document_id.as_str(),
            raws = raws.len(),
            canonicals = outcome.canonical_entities.len(),
            status = ?status,
            "document processed"
        );

        DocumentRecord {
            document_id: doc.document_id,
            source_kind: doc.source_kind,
            source_ref: doc.source_ref,
            ingest_timestamp: doc.ingest_timestamp,
            markdown_original: doc.markdown,
            markdown_canonicalized: outcome.markdown_canonicalized,
            structure_flags: structure,
            classification,
            raw_entities: raws,
            canonical_entities: outcome.canonical_entities,
            status,
            stage_timings_ms: timings,
            errors,
        }
    }
}

fn ms_since(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1_000.0
}
