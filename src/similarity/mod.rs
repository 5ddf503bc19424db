//! Similarity engine: candidate generation over computed signals.
//!
//! ## What we do here
//! - Pick a comparison strategy per job: an approximate nearest-neighbor
//!   index for large embedding sets, a bounded block scan otherwise.
//! - Emit canonical, deduplicated [`SimilarityEdge`]s above the configured
//!   thresholds, sorted for stable downstream grouping.
//! - Hash signals always take the block scan; Hamming similarity has no
//!   index backing it here.

pub mod ann;
pub mod scan;

use thiserror::Error;
use tracing::debug;

use crate::config::SimilarityConfig;
use crate::types::{EmbeddingVector, HashBundle, Signal, SignalMethod, SimilarityEdge};

/// Errors raised while comparing signals.
#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("embedding dimension mismatch: expected {expected}, got {got} for {id}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        id: String,
    },

    /// A job's signals must all come from the same method.
    #[error("cannot compare embedding and hash signals in one pass")]
    MixedSignals,

    #[error("incomparable signatures: {0}")]
    IncomparableSignatures(String),
}

/// How candidate pairs get generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityStrategy {
    /// HNSW index over embedding vectors.
    ApproximateIndex,
    /// Exhaustive scan in bounded blocks.
    BlockScan,
}

impl SimilarityStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SimilarityStrategy::ApproximateIndex => "approximate_index",
            SimilarityStrategy::BlockScan => "block_scan",
        }
    }
}

/// Availability of the index backend, checked once when a job starts so a
/// mid-job change cannot split one run across strategies.
#[derive(Debug, Clone, Copy)]
pub struct BackendProbe {
    pub ann_available: bool,
}

impl BackendProbe {
    pub fn detect(cfg: &SimilarityConfig) -> Self {
        Self {
            ann_available: cfg.ann.enabled,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            ann_available: false,
        }
    }
}

/// Decide the strategy for one job.
///
/// Embeddings go through the index only when the backend is available and
/// the set is large enough to amortize the build; everything else scans.
pub fn select_strategy(
    probe: BackendProbe,
    method: SignalMethod,
    num_signals: usize,
    cfg: &SimilarityConfig,
) -> SimilarityStrategy {
    match method {
        SignalMethod::Hash => SimilarityStrategy::BlockScan,
        SignalMethod::Embedding => {
            if probe.ann_available && num_signals >= cfg.ann.min_vectors {
                SimilarityStrategy::ApproximateIndex
            } else {
                SimilarityStrategy::BlockScan
            }
        }
    }
}

/// Find all pairs scoring at or above the configured threshold.
///
/// Edges come back canonically ordered within each pair and sorted across
/// pairs, so identical inputs always produce identical output. Callers
/// wanting a specific thread pool should run this inside `pool.install`.
pub fn find_edges(
    strategy: SimilarityStrategy,
    signals: &[Signal],
    cfg: &SimilarityConfig,
) -> Result<Vec<SimilarityEdge>, SimilarityError> {
    let mut embeddings: Vec<&EmbeddingVector> = Vec::new();
    let mut bundles: Vec<&HashBundle> = Vec::new();
    for signal in signals {
        match signal {
            Signal::Embedding(vector) => embeddings.push(vector),
            Signal::Hashes(bundle) => bundles.push(bundle),
        }
    }
    if !embeddings.is_empty() && !bundles.is_empty() {
        return Err(SimilarityError::MixedSignals);
    }

    let mut edges = if !bundles.is_empty() {
        scan::hash_edges(&bundles, cfg)?
    } else {
        match strategy {
            SimilarityStrategy::ApproximateIndex => ann::index_edges(&embeddings, cfg)?,
            SimilarityStrategy::BlockScan => scan::embedding_edges(&embeddings, cfg)?,
        }
    };

    edges.sort_by(|a, b| a.key().cmp(&b.key()));
    debug!(
        edges = edges.len(),
        strategy = strategy.name(),
        "similarity_pass_complete"
    );
    Ok(edges)
}

/// Cosine similarity of two equal-length vectors. Zero-norm inputs score 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
