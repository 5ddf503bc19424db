//! Job orchestration: listing, chunked signal extraction, similarity,
//! grouping, actions.
//!
//! ## What we do here
//! - Drive the whole job from one coordinating thread; only chunk-local
//!   decode and signal work fans out across the worker pool.
//! - Keep peak memory bounded: each chunk's pixels die before the next
//!   chunk loads, and memory pressure shrinks the chunk size in flight.
//! - Convert per-image faults into [`ImageFailure`] entries; a job only
//!   fails outright when listing, configuration, or the similarity pass
//!   itself fails.
//! - Check cancellation at chunk boundaries, then still run similarity
//!   and grouping over whatever signals were already computed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{Level, info, warn};

use crate::EngineError;
use crate::actions::execute_actions;
use crate::config::JobConfig;
use crate::grouping::build_groups;
use crate::observer::{JobObserver, NoopObserver};
use crate::planner;
use crate::resources::ResourceManager;
use crate::signal::SignalProvider;
use crate::similarity::{BackendProbe, SimilarityStrategy, find_edges, select_strategy};
use crate::source::ImageSource;
use crate::types::{
    ImageFailure, ImageId, ImageRecord, JobResult, JobStats, Signal, SignalMethod,
};

/// Cooperative cancellation handle. Cancelling stops the job at the next
/// chunk boundary; work already done is kept and reported.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional per-run hooks. `Default` runs with none of them.
#[derive(Default)]
pub struct JobOptions<'a> {
    pub observer: Option<&'a dyn JobObserver>,
    pub cancel: Option<&'a CancelFlag>,
    /// Quality scores for the highest-quality representative policy.
    pub quality_scores: Option<&'a HashMap<ImageId, f64>>,
    /// Memory pressure source, polled at chunk boundaries.
    pub pressure: Option<&'a dyn crate::resources::PressureProbe>,
    /// Restrict the job to these ids instead of the source's full
    /// listing. Order is kept, repeats collapse to the first occurrence,
    /// and ids the source cannot load become per-image errors.
    pub image_ids: Option<&'a [ImageId]>,
}

pub(crate) fn execute(
    cfg: &JobConfig,
    source: &dyn ImageSource,
    options: &JobOptions<'_>,
    resources: &ResourceManager,
) -> Result<JobResult, EngineError> {
    cfg.validate()?;
    let started = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "job.run",
        name = cfg.name.as_deref().unwrap_or("unnamed"),
        method = cfg.method.name()
    );
    let _guard = span.enter();

    static NOOP: NoopObserver = NoopObserver;
    let observer = options.observer.unwrap_or(&NOOP);

    let ids = match options.image_ids {
        Some(selection) => dedup_selection(selection),
        None => source.list_images()?,
    };
    info!(
        total = ids.len(),
        selected = options.image_ids.is_some(),
        "images_listed"
    );

    let mut stats = JobStats {
        total_images: ids.len(),
        ..JobStats::default()
    };

    // Index availability is sampled once so a mid-job change cannot split
    // the run across strategies.
    let probe = BackendProbe::detect(&cfg.similarity);

    // A missing embedding backend degrades the whole job to hashes up
    // front; signals stay comparable because the method never changes
    // after this point.
    let mut degraded = false;
    let provider = match cfg.method {
        SignalMethod::Hash => SignalProvider::hash(&cfg.hash),
        SignalMethod::Embedding => match resources.model_cache().get_or_load(&cfg.embedding) {
            Ok(extractor) => SignalProvider::embedding(extractor, &cfg.embedding),
            Err(err) => {
                warn!(
                    model_id = %cfg.embedding.model_id,
                    error = %err,
                    "embedding_unavailable_using_hash_fallback"
                );
                observer.job_degraded(&err.to_string());
                degraded = true;
                SignalProvider::hash(&cfg.hash)
            }
        },
    };
    let effective_method = provider.method();

    let plan = planner::plan_chunks(ids.len(), resources.workers(), &cfg.resources);
    info!(
        chunk_size = plan.chunk_size,
        chunks = plan.num_chunks,
        "chunk_plan_ready"
    );
    let deadline = cfg.resources.chunk_timeout_ms.map(Duration::from_millis);

    let mut signals: Vec<Signal> = Vec::with_capacity(ids.len());
    let mut failures: Vec<ImageFailure> = Vec::new();
    let mut chunk_size = plan.chunk_size;
    let mut cursor = 0usize;
    let mut chunk_index = 0usize;

    while cursor < ids.len() {
        if options.cancel.is_some_and(|c| c.is_cancelled()) {
            warn!(remaining = ids.len() - cursor, "job_cancelled");
            stats.cancelled = true;
            for id in &ids[cursor..] {
                failures.push(ImageFailure::new(id.clone(), "cancelled before processing"));
            }
            break;
        }

        // Pressure shrinks the chunk and re-polls once; persistent
        // pressure sacrifices this one chunk and moves on.
        let mut abandon = false;
        if options.pressure.is_some_and(|p| p.under_pressure()) {
            let shrunk = planner::shrink(chunk_size);
            warn!(from = chunk_size, to = shrunk, "memory_pressure_shrinking_chunk");
            chunk_size = shrunk;
            abandon = options.pressure.is_some_and(|p| p.under_pressure());
        }

        let end = (cursor + chunk_size).min(ids.len());
        let chunk_ids = &ids[cursor..end];

        observer.chunk_started(chunk_index, chunk_ids.len());
        if abandon {
            warn!(
                chunk = chunk_index,
                len = chunk_ids.len(),
                "memory_pressure_persists_skipping_chunk"
            );
            for id in chunk_ids {
                failures.push(ImageFailure::new(
                    id.clone(),
                    "memory pressure persisted after chunk shrink",
                ));
            }
            stats.chunks_failed += 1;
            observer.chunk_completed(chunk_index, chunk_ids.len(), chunk_ids.len());
            cursor = end;
            chunk_index += 1;
            continue;
        }

        let chunk_started_at = Instant::now();

        let (chunk_signals, chunk_failures) =
            process_chunk(chunk_ids, source, &provider, resources);

        if let Some(limit) = deadline {
            let took = chunk_started_at.elapsed();
            if took > limit {
                warn!(
                    chunk = chunk_index,
                    took_ms = took.as_millis() as u64,
                    limit_ms = limit.as_millis() as u64,
                    "chunk_deadline_exceeded"
                );
                // Discard the late signals; partial chunks would make
                // results depend on timing.
                for id in chunk_ids {
                    failures.push(ImageFailure::new(
                        id.clone(),
                        format!("chunk deadline exceeded ({} ms)", limit.as_millis()),
                    ));
                }
                stats.chunks_failed += 1;
                observer.chunk_completed(chunk_index, chunk_ids.len(), chunk_ids.len());
                cursor = end;
                chunk_index += 1;
                continue;
            }
        }

        let failed = chunk_failures.len();
        signals.extend(chunk_signals);
        failures.extend(chunk_failures);
        stats.chunks_processed += 1;
        observer.chunk_completed(chunk_index, chunk_ids.len(), failed);
        cursor = end;
        chunk_index += 1;
    }
    stats.signaled_images = signals.len();

    let strategy = select_strategy(probe, effective_method, signals.len(), &cfg.similarity);
    if effective_method == SignalMethod::Embedding && strategy == SimilarityStrategy::BlockScan {
        if probe.ann_available {
            info!(
                signals = signals.len(),
                min_vectors = cfg.similarity.ann.min_vectors,
                "small_set_bypasses_index"
            );
        } else {
            info!(signals = signals.len(), "ann_unavailable_using_block_scan");
        }
    }
    stats.strategy = strategy.name().to_string();

    let edges = resources
        .pool()
        .install(|| find_edges(strategy, &signals, &cfg.similarity))?;
    stats.edges_found = edges.len();
    observer.edges_found(edges.len());
    info!(edges = edges.len(), strategy = strategy.name(), "similarity_complete");

    let groups = build_groups(&edges, cfg.representative, options.quality_scores);
    info!(groups = groups.len(), "grouping_complete");

    let action_summary = execute_actions(&groups, &cfg.action);
    observer.actions_applied(&action_summary);

    stats.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        groups = groups.len(),
        degraded,
        errors = failures.len(),
        cancelled = stats.cancelled,
        elapsed_ms = stats.elapsed_ms,
        "job_complete"
    );

    Ok(JobResult {
        groups,
        degraded,
        per_image_errors: failures,
        action_summary,
        stats,
    })
}

/// A caller-supplied selection keeps its order; repeats collapse so no
/// image is signalled twice, which would fabricate self-edges.
fn dedup_selection(selection: &[ImageId]) -> Vec<ImageId> {
    let mut seen = HashSet::with_capacity(selection.len());
    selection
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Decode one chunk in parallel and turn it into signals.
///
/// Every id becomes an [`ImageRecord`] that moves from pending to loaded
/// or failed during the decode pass. Pixel buffers live only inside this
/// call; failures stay aligned with their ids.
fn process_chunk(
    chunk_ids: &[ImageId],
    source: &dyn ImageSource,
    provider: &SignalProvider,
    resources: &ResourceManager,
) -> (Vec<Signal>, Vec<ImageFailure>) {
    let mut records: Vec<ImageRecord> = chunk_ids
        .iter()
        .map(|id| ImageRecord::pending(id.clone()))
        .collect();

    let decoded: Vec<Option<DynamicImage>> = resources.pool().install(|| {
        records
            .par_iter_mut()
            .map(|record| match source.load_image(&record.id) {
                Ok(image) => {
                    record.mark_loaded();
                    Some(image)
                }
                Err(err) => {
                    record.mark_failed(err.to_string());
                    None
                }
            })
            .collect()
    });

    let mut failures = Vec::new();
    let mut loaded: Vec<(ImageId, DynamicImage)> = Vec::with_capacity(chunk_ids.len());
    for (record, image) in records.into_iter().zip(decoded) {
        match image {
            Some(image) => loaded.push((record.id, image)),
            None => {
                let reason = record
                    .failure
                    .unwrap_or_else(|| "image was not decoded".to_string());
                failures.push(ImageFailure::new(record.id, reason));
            }
        }
    }

    let (signals, signal_failures) = provider.compute_chunk(&loaded, resources.pool());
    failures.extend(signal_failures);
    (signals, failures)
}
