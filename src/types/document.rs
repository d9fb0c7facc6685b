use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CanonicalEntity, RawEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Url,
}

/// A unit of work handed to the pipeline by the producer.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub document_id: String,
    pub source_kind: SourceKind,
    /// Filesystem path or URL; interpretation is the converter's business.
    pub source_ref: String,
    /// Optional format hints passed through to the converter.
    pub hints: HashMap<String, String>,
}

impl WorkItem {
    pub fn new(document_id: impl Into<String>, source_kind: SourceKind, source_ref: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            source_kind,
            source_ref: source_ref.into(),
            hints: HashMap::new(),
        }
    }
}

/// An ingested document. The Markdown buffer is immutable once set; every
/// span downstream is a byte offset into it. Exclusively owned by its
/// pipeline trip.
#[derive(Debug, Clone)]
pub struct Document {
    pub document_id: String,
    pub source_kind: SourceKind,
    pub source_ref: String,
    pub markdown: String,
    pub size_bytes: usize,
    pub page_count_estimate: u32,
    pub ingest_timestamp: DateTime<Utc>,
    /// True when conversion produced bytes that were not valid UTF-8 and had
    /// to be replaced with U+FFFD. Spans stay byte-accurate against the
    /// replaced buffer.
    pub encoding_lossy: bool,
}

/// Lightweight structural facts derived in a single scan over the Markdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureFlags {
    pub has_headers: bool,
    pub has_lists: bool,
    pub has_tables: bool,
    pub has_code_fences: bool,
    pub has_front_matter: bool,
    pub section_count: usize,
    /// Two-letter language guess from stopword frequencies, when confident.
    pub language: Option<String>,
}

/// Domain and document-type scores, each family summing to ~100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVector {
    pub domains: BTreeMap<String, f64>,
    pub doc_types: BTreeMap<String, f64>,
    pub primary_domain: Option<String>,
    pub primary_doc_type: Option<String>,
    pub primary_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Ok,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Structure,
    Classify,
    Detect,
    Normalize,
    Emit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Structure => "structure",
            Self::Classify => "classify",
            Self::Detect => "detect",
            Self::Normalize => "normalize",
            Self::Emit => "emit",
        }
    }
}

/// A localized, non-fatal error recorded on the emitted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub kind: String,
    pub detail: String,
}

/// Wall-clock milliseconds spent in each stage for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub ingest: f64,
    pub structure: f64,
    pub classify: f64,
    pub detect: f64,
    pub normalize: f64,
    pub emit: f64,
}

/// The finished knowledge record for one document, handed to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub source_kind: SourceKind,
    pub source_ref: String,
    pub ingest_timestamp: DateTime<Utc>,
    pub markdown_original: String,
    /// The original Markdown with each primary mention replaced by a
    /// `||canonical||id||` marker.
    pub markdown_canonicalized: String,
    pub structure_flags: StructureFlags,
    pub classification: ClassificationVector,
    pub raw_entities: Vec<RawEntity>,
    pub canonical_entities: Vec<CanonicalEntity>,
    pub status: DocStatus,
    pub stage_timings_ms: StageTimings,
    pub errors: Vec<StageError>,
}
