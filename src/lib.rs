//! Duplicate and near-duplicate image detection for dataset curation.
//!
//! This crate finds groups of visually identical or near-identical images
//! in a collection and optionally acts on them. A job runs as a bounded
//! pipeline: images are listed, decoded and turned into signals chunk by
//! chunk, compared with either an approximate nearest-neighbor index or a
//! bounded block scan, grouped transitively, and finally handed to the
//! action executor (show, copy, move, delete, with dry-run previews).
//!
//! Faults stay proportionate: an unreadable image becomes a per-image
//! error in the result, a missing embedding backend degrades the job to
//! perceptual hashes, and only configuration, listing, or comparison
//! failures abort a run.
//!
//! # Example
//!
//! ```
//! use neardup::{JobConfig, MemorySource, run_job};
//!
//! let source = MemorySource::new();
//! let cfg = JobConfig::default().with_dry_run(true);
//! let result = run_job(&cfg, &source)?;
//! for group in &result.groups {
//!     println!("keep {}, duplicates {:?}", group.representative, group.members);
//! }
//! # Ok::<(), neardup::EngineError>(())
//! ```

pub mod actions;
pub mod config;
pub mod grouping;
pub mod observer;
pub mod planner;
mod pipeline;
pub mod resources;
pub mod signal;
pub mod similarity;
pub mod source;
pub mod types;

use thiserror::Error;

pub use actions::execute_actions;
pub use config::{
    ActionConfig, ActionKind, AnnParams, ConfigError, EmbeddingConfig, HashCombine, HashConfig,
    HashThresholds, JobConfig, RepresentativePolicy, ResourceConfig, SimilarityConfig,
};
pub use grouping::build_groups;
pub use observer::{JobObserver, NoopObserver};
pub use pipeline::{CancelFlag, JobOptions};
pub use planner::{ChunkPlan, plan_chunks};
pub use resources::{ModelCache, PressureProbe, ResourceManager};
pub use signal::{FeatureExtractor, HashComputer, ProjectionExtractor, SignalError, SignalProvider};
pub use similarity::{
    BackendProbe, SimilarityError, SimilarityStrategy, find_edges, select_strategy,
};
pub use source::{FsImageSource, ImageSource, MemorySource, SourceError};
pub use types::{
    ActionOutcome, ActionRecord, ActionSummary, DuplicateGroup, EmbeddingVector, HashAlgorithm,
    HashBundle, HashSignature, ImageFailure, ImageId, ImageRecord, JobResult, JobStats,
    RecordState, Signal, SignalMethod, SimilarityEdge,
};

/// Failure of a whole job. Per-image faults never surface here; they are
/// reported in [`JobResult::per_image_errors`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("image source failed: {0}")]
    Source(#[from] SourceError),

    #[error("similarity pass failed: {0}")]
    Similarity(#[from] SimilarityError),

    #[error("worker pool construction failed: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Run one detection job with a job-scoped worker pool and model cache.
pub fn run_job(cfg: &JobConfig, source: &dyn ImageSource) -> Result<JobResult, EngineError> {
    run_job_with_options(cfg, source, &JobOptions::default())
}

/// Run one job with hooks attached: an observer, a cancellation flag,
/// quality scores, a memory pressure probe, or an explicit id
/// selection.
pub fn run_job_with_options(
    cfg: &JobConfig,
    source: &dyn ImageSource,
    options: &JobOptions<'_>,
) -> Result<JobResult, EngineError> {
    // Reject bad configs before spending anything on a worker pool.
    cfg.validate()?;
    let resources = ResourceManager::new(&cfg.resources)?;
    pipeline::execute(cfg, source, options, &resources)
}

/// Run a job on a caller-managed [`ResourceManager`], reusing its pool and
/// keeping loaded models cached across jobs.
pub fn run_job_with_resources(
    cfg: &JobConfig,
    source: &dyn ImageSource,
    options: &JobOptions<'_>,
    resources: &ResourceManager,
) -> Result<JobResult, EngineError> {
    pipeline::execute(cfg, source, options, resources)
}
