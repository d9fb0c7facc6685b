use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::config::CoreConfig;
use crate::emit::{deliver, Sink};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ingest::{ingest, Converter};
use crate::types::{DocStatus, Document, DocumentRecord, Stage, StageTimings, WorkItem};

/// A document-level failure that prevented a record from reaching the sink.
/// Emitted on the pipeline's error channel; nothing is dropped silently.
#[derive(Debug)]
pub struct PipelineError {
    pub document_id: String,
    pub stage: Stage,
    pub detail: String,
}

#[derive(Default)]
struct Counters {
    documents_ok: AtomicU64,
    documents_partial: AtomicU64,
    documents_failed: AtomicU64,
    ingest_micros: AtomicU64,
    structure_micros: AtomicU64,
    classify_micros: AtomicU64,
    detect_micros: AtomicU64,
    normalize_micros: AtomicU64,
    emit_micros: AtomicU64,
}

impl Counters {
    fn add_timings(&self, t: &StageTimings) {
        let add = |counter: &AtomicU64, ms: f64| {
            counter.fetch_add((ms * 1_000.0) as u64, Ordering::Relaxed);
        };
        add(&self.ingest_micros, t.ingest);
        add(&self.structure_micros, t.structure);
        add(&self.classify_micros, t.classify);
        add(&self.detect_micros, t.detect);
        add(&self.normalize_micros, t.normalize);
        add(&self.emit_micros, t.emit);
    }
}

/// Point-in-time view of the process-wide counters.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub documents_ok: u64,
    pub documents_partial: u64,
    pub documents_failed: u64,
    /// Cumulative wall-clock milliseconds per stage across all documents.
    pub cumulative_stage_ms: StageTimings,
}

/// The staged extraction pipeline: an I/O pool driving ingest and emit, a
/// CPU pool driving structure through normalize, bounded channels at the two
/// stage boundaries.
///
/// There is no global output-order guarantee; callers that need input order
/// must tag items and reorder at the sink. Per-document output is fully
/// deterministic.
pub struct Pipeline {
    submit_tx: Option<Sender<WorkItem>>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
    error_rx: Receiver<PipelineError>,
}

impl Pipeline {
    pub fn start(
        engine: Arc<Engine>,
        config: CoreConfig,
        converter: Arc<dyn Converter>,
        sink: Arc<dyn Sink>,
    ) -> Pipeline {
        let config = Arc::new(config);
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let (submit_tx, submit_rx) = bounded::<WorkItem>(config.queue_max_size);
        let (doc_tx, doc_rx) = bounded::<(Document, f64)>(config.queue_max_size);
        let (rec_tx, rec_rx) = bounded::<(DocumentRecord, Instant)>(config.queue_max_size);
        let (err_tx, err_rx) = unbounded::<PipelineError>();

        let mut handles = Vec::new();

        for worker in 0..config.io_workers.max(1) {
            let submit_rx = submit_rx.clone();
            let doc_tx = doc_tx.clone();
            let err_tx = err_tx.clone();
            let converter = Arc::clone(&converter);
            let config = Arc::clone(&config);
            let counters = Arc::clone(&counters);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("ingest-{worker}"))
                    .spawn(move || {
                        while let Ok(item) = submit_rx.recv() {
                            let started = Instant::now();
                            match ingest(&item, converter.as_ref(), &config) {
                                Ok(doc) => {
                                    let ingest_ms = started.elapsed().as_secs_f64() * 1_000.0;
                                    // Blocks here when the CPU pool is behind;
                                    // this is the backpressure point.
                                    if doc_tx.send((doc, ingest_ms)).is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    counters.documents_failed.fetch_add(1, Ordering::Relaxed);
                                    let _ = err_tx.send(PipelineError {
                                        document_id: item.document_id,
                                        stage: Stage::Ingest,
                                        detail: err.to_string(),
                                    });
                                }
                            }
                        }
                    })
                    .expect("spawn ingest worker"),
            );
        }

        for worker in 0..config.cpu_workers.max(1) {
            let doc_rx = doc_rx.clone();
            let rec_tx = rec_tx.clone();
            let engine = Arc::clone(&engine);
            let config = Arc::clone(&config);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("cpu-{worker}"))
                    .spawn(move || {
                        while let Ok((doc, ingest_ms)) = doc_rx.recv() {
                            let mut record = engine.process(doc, &config);
                            record.stage_timings_ms.ingest = ingest_ms;
                            if rec_tx.send((record, Instant::now())).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("spawn cpu worker"),
            );
        }

        for worker in 0..config.io_workers.max(1) {
            let rec_rx = rec_rx.clone();
            let err_tx = err_tx.clone();
            let sink = Arc::clone(&sink);
            let config = Arc::clone(&config);
            let counters = Arc::clone(&counters);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("emit-{worker}"))
                    .spawn(move || {
                        while let Ok((mut record, queued_at)) = rec_rx.recv() {
                            // Emit latency is the handoff delay up to the
                            // sink taking over; the sink call itself is the
                            // sink's own time.
                            record.stage_timings_ms.emit =
                                queued_at.elapsed().as_secs_f64() * 1_000.0;
                            counters.add_timings(&record.stage_timings_ms);
                            match deliver(sink.as_ref(), &record, config.sink_retry_max) {
                                Ok(()) => {
                                    let counter = match record.status {
                                        DocStatus::Ok => &counters.documents_ok,
                                        DocStatus::Partial => &counters.documents_partial,
                                        DocStatus::Failed => &counters.documents_failed,
                                    };
                                    counter.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(err) => {
                                    counters.documents_failed.fetch_add(1, Ordering::Relaxed);
                                    let _ = err_tx.send(PipelineError {
                                        document_id: record.document_id.clone(),
                                        stage: Stage::Emit,
                                        detail: err.detail,
                                    });
                                }
                            }
                        }
                    })
                    .expect("spawn emit worker"),
            );
        }

        tracing::info!(
            io_workers = config.io_workers.max(1),
            cpu_workers = config.cpu_workers.max(1),
            queue_max_size = config.queue_max_size,
            "pipeline started"
        );

        Pipeline {
            submit_tx: Some(submit_tx),
            handles,
            shutdown,
            counters,
            error_rx: err_rx,
        }
    }

    /// Hand a work item to the ingest pool. Blocks while the submit queue is
    /// full; fails once shutdown has begun.
    pub fn submit(&self, item: WorkItem) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShutDown);
        }
        let tx = self.submit_tx.as_ref().ok_or(Error::ShutDown)?;
        tx.send(item).map_err(|_| Error::ShutDown)
    }

    /// Document-level failures stream here; receiving is optional but the
    /// channel is unbounded so unread errors never block workers.
    pub fn errors(&self) -> &Receiver<PipelineError> {
        &self.error_rx
    }

    pub fn stats(&self) -> StatsSnapshot {
        let c = &self.counters;
        let ms = |a: &AtomicU64| a.load(Ordering::Relaxed) as f64 / 1_000.0;
        StatsSnapshot {
            documents_ok: c.documents_ok.load(Ordering::Relaxed),
            documents_partial: c.documents_partial.load(Ordering::Relaxed),
            documents_failed: c.documents_failed.load(Ordering::Relaxed),
            cumulative_stage_ms: StageTimings {
                ingest: ms(&c.ingest_micros),
                structure: ms(&c.structure_micros),
                classify: ms(&c.classify_micros),
                detect: ms(&c.detect_micros),
                normalize: ms(&c.normalize_micros),
                emit: ms(&c.emit_micros),
            },
        }
    }

    /// Cooperative shutdown: stop accepting new items, drain everything in
    /// flight through the sink, join all workers, and report final stats.
    pub fn shutdown(mut self) -> StatsSnapshot {
        self.shutdown.store(true, Ordering::Release);
        // Closing the submit channel unwinds the stages in order: each pool
        // exits when its inbound channel drains, which closes the next one.
        self.submit_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        let stats = self.stats();
        tracing::info!(
            ok = stats.documents_ok,
            partial = stats.documents_partial,
            failed = stats.documents_failed,
            "pipeline stopped"
        );
        stats
    }
}
