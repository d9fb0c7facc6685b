use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::types::{Document, SourceKind, WorkItem};

/// Output of the external format converter.
#[derive(Debug)]
pub struct Converted {
    pub markdown: Vec<u8>,
    pub page_count_estimate: u32,
    pub mime_detected: String,
}

/// The conversion collaborator the ingest stage delegates to. Real
/// deployments plug in a PDF/HTML renderer; anything already Markdown can
/// use [`FileConverter`].
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        source_ref: &str,
        source_kind: SourceKind,
        hints: &HashMap<String, String>,
    ) -> Result<Converted>;
}

/// Passthrough converter for sources that are already Markdown on disk.
pub struct FileConverter;

impl Converter for FileConverter {
    fn convert(
        &self,
        source_ref: &str,
        source_kind: SourceKind,
        _hints: &HashMap<String, String>,
    ) -> Result<Converted> {
        if source_kind != SourceKind::File {
            return Err(Error::Conversion {
                source_ref: source_ref.to_string(),
                detail: "FileConverter only handles file sources".to_string(),
            });
        }
        let bytes = std::fs::read(Path::new(source_ref)).map_err(|e| Error::Conversion {
            source_ref: source_ref.to_string(),
            detail: e.to_string(),
        })?;
        let page_count_estimate = (bytes.len() / 3_000 + 1) as u32;
        Ok(Converted {
            markdown: bytes,
            page_count_estimate,
            mime_detected: "text/markdown".to_string(),
        })
    }
}

/// Stage S1: convert a work item into a fully resident document.
///
/// The document is only handed downstream once the entire Markdown buffer
/// exists. Oversized inputs are rejected; invalid UTF-8 is replaced with
/// U+FFFD and flagged, keeping spans byte-accurate against the replaced
/// buffer.
pub(crate) fn ingest(
    item: &WorkItem,
    converter: &dyn Converter,
    config: &CoreConfig,
) -> Result<Document> {
    let converted = converter.convert(&item.source_ref, item.source_kind, &item.hints)?;

    if converted.markdown.len() > config.max_bytes {
        return Err(Error::InputTooLarge {
            size: converted.markdown.len(),
            max: config.max_bytes,
        });
    }

    let size_bytes = converted.markdown.len();
    let (markdown, encoding_lossy) = match String::from_utf8(converted.markdown) {
        Ok(text) => (text, false),
        Err(err) => (
            String::from_utf8_lossy(err.as_bytes()).into_owned(),
            true,
        ),
    };

    Ok(Document {
        document_id: item.document_id.clone(),
        source_kind: item.source_kind,
        source_ref: item.source_ref.clone(),
        markdown,
        size_bytes,
        page_count_estimate: converted.page_count_estimate,
        ingest_timestamp: Utc::now(),
        encoding_lossy,
    })
}
