use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::EntityKind;

// ---------------------------------------------------------------------------
// Manifest  (corpus/manifest.yml)
// ---------------------------------------------------------------------------

/// Top-level corpus manifest. Every file the engine reads at init is listed
/// here; a listed file missing on disk fails init with the offending path.
#[derive(Debug, Deserialize)]
pub(crate) struct Manifest {
    pub gazetteers: Vec<GazetteerSpec>,
    pub keywords: KeywordPaths,
    pub tables: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GazetteerSpec {
    pub path: String,
    /// Entity kind this file feeds (person, org, loc, gpe).
    pub kind: String,
    /// Default subcategory for entries without an inline tag.
    #[serde(default)]
    pub subcategory: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeywordPaths {
    pub domains: String,
    pub doc_types: String,
}

// ---------------------------------------------------------------------------
// Keyword-weight files  (corpus/keywords/*.yml)
//
// Format: category -> { weight: float, keywords: {string -> float} }
// Both weights default to 1.0.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct KeywordCategory {
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub keywords: IndexMap<String, f64>,
}

fn default_weight() -> f64 {
    1.0
}

/// Uses IndexMap so error messages and stats report categories in file order.
pub(crate) type KeywordFile = IndexMap<String, KeywordCategory>;

// ---------------------------------------------------------------------------
// Gazetteer files  (corpus/{people,orgs,loc,gpe}/*.txt)
//
// One surface form per line; optional tab-separated subcategory tag
// overriding the file default. `#` comments and blank lines are skipped.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct GazetteerEntry {
    pub surface: String,
    pub kind: EntityKind,
    pub subcategory: Option<String>,
}

pub(crate) fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join("manifest.yml");
    if !path.exists() {
        return Err(Error::MissingCorpusFile { path });
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Read one file from the corpus directory, mapping a missing file to
/// `MissingCorpusFile` so the manifest contract holds.
pub(crate) fn read_corpus_file(dir: &Path, rel: &str) -> Result<(PathBuf, String)> {
    let path = dir.join(rel);
    if !path.exists() {
        return Err(Error::MissingCorpusFile { path });
    }
    let content = std::fs::read_to_string(&path)?;
    Ok((path, content))
}

pub(crate) fn load_keyword_file(dir: &Path, rel: &str) -> Result<KeywordFile> {
    let (_, content) = read_corpus_file(dir, rel)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub(crate) fn load_gazetteer(dir: &Path, spec: &GazetteerSpec) -> Result<Vec<GazetteerEntry>> {
    let kind = EntityKind::from_str(&spec.kind).ok_or_else(|| Error::Corpus {
        detail: format!("unknown gazetteer kind `{}` in {}", spec.kind, spec.path),
    })?;

    let (_, content) = read_corpus_file(dir, &spec.path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (surface, tag) = match line.split_once('\t') {
            Some((s, t)) => (s.trim(), Some(t.trim().to_string())),
            None => (line, None),
        };
        if surface.is_empty() {
            continue;
        }
        entries.push(GazetteerEntry {
            surface: surface.to_string(),
            kind,
            subcategory: tag.or_else(|| spec.subcategory.clone()),
        });
    }
    Ok(entries)
}
