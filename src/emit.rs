use std::sync::Mutex;
use std::time::Duration;

use crate::types::DocumentRecord;

/// Failure reported by a sink. Retryable failures are backed off and
/// retried up to the configured cap; terminal failures drop the record
/// immediately.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct SinkError {
    pub retryable: bool,
    pub detail: String,
}

impl SinkError {
    pub fn retryable(detail: impl Into<String>) -> Self {
        Self {
            retryable: true,
            detail: detail.into(),
        }
    }

    pub fn terminal(detail: impl Into<String>) -> Self {
        Self {
            retryable: false,
            detail: detail.into(),
        }
    }
}

/// Where finished records go. The core treats the sink as opaque; delivery
/// keeps the record until `accept` succeeds or retries are exhausted.
pub trait Sink: Send + Sync {
    fn accept(&self, record: &DocumentRecord) -> Result<(), SinkError>;
}

/// In-memory sink for tests and small batch runs.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<DocumentRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<DocumentRecord> {
        std::mem::take(&mut *self.records.lock().expect("sink poisoned"))
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemorySink {
    fn accept(&self, record: &DocumentRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .expect("sink poisoned")
            .push(record.clone());
        Ok(())
    }
}

const BACKOFF_BASE: Duration = Duration::from_millis(50);

/// Deliver one record with exponential backoff on retryable sink failures.
pub(crate) fn deliver(
    sink: &dyn Sink,
    record: &DocumentRecord,
    max_attempts: u32,
) -> Result<(), SinkError> {
    let mut backoff = BACKOFF_BASE;
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match sink.accept(record) {
            Ok(()) => return Ok(()),
            Err(err) if err.retryable && attempt < attempts => {
                tracing::warn!(
                    document_id = record.document_id.as_str(),
                    attempt,
                    detail = err.detail.as_str(),
                    "sink rejected record, backing off"
                );
                std::thread::sleep(backoff);
                backoff *= 2;
            }
            Err(err) => return Err(err),
        }
    }
    unreachable!("loop returns on final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Sink that fails the first `failures` calls, then succeeds.
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
        inner: MemorySink,
    }

    impl Sink for FlakySink {
        fn accept(&self, record: &DocumentRecord) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SinkError::retryable("not yet"));
            }
            self.inner.accept(record)
        }
    }

    fn record() -> DocumentRecord {
        use crate::types::*;
        DocumentRecord {
            document_id: "doc-1".to_string(),
            source_kind: SourceKind::File,
            source_ref: "memory".to_string(),
            ingest_timestamp: chrono::Utc::now(),
            markdown_original: String::new(),
            markdown_canonicalized: String::new(),
            structure_flags: StructureFlags::default(),
            classification: ClassificationVector::default(),
            raw_entities: Vec::new(),
            canonical_entities: Vec::new(),
            status: DocStatus::Ok,
            stage_timings_ms: StageTimings::default(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn retries_then_succeeds() {
        let sink = FlakySink {
            failures: 2,
            calls: AtomicU32::new(0),
            inner: MemorySink::new(),
        };
        deliver(&sink, &record(), 3).unwrap();
        assert_eq!(sink.inner.len(), 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_retries_surface_the_error() {
        let sink = FlakySink {
            failures: 10,
            calls: AtomicU32::new(0),
            inner: MemorySink::new(),
        };
        let err = deliver(&sink, &record(), 2).unwrap_err();
        assert!(err.retryable);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn terminal_errors_do_not_retry() {
        struct DeadSink;
        impl Sink for DeadSink {
            fn accept(&self, _: &DocumentRecord) -> Result<(), SinkError> {
                Err(SinkError::terminal("closed"))
            }
        }
        let err = deliver(&DeadSink, &record(), 5).unwrap_err();
        assert!(!err.retryable);
    }
}
