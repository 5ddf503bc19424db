//! Signal extraction: turning decoded images into comparable signals.
//!
//! ## What we do here
//! - Wrap the two signal families behind one [`SignalProvider`]:
//!   embedding vectors from a [`FeatureExtractor`] and perceptual hash
//!   bundles from a [`HashComputer`].
//! - Batch embedding inference and parallelize hashing, preserving the
//!   input order of each chunk.
//! - Report per-image failures without failing the chunk.

pub mod embedding;
pub mod hash;

use std::sync::Arc;

use image::DynamicImage;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{EmbeddingConfig, HashConfig};
use crate::types::{EmbeddingVector, ImageFailure, ImageId, Signal, SignalMethod};

pub use embedding::{FeatureExtractor, ProjectionExtractor, l2_normalize_in_place};
pub use hash::HashComputer;

/// Errors raised while preparing or running signal extraction.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The requested embedding model cannot be loaded on this host.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The extractor accepted the batch but failed on one input.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A ready-to-run signal source for one job.
///
/// Construction decides the method once; `compute_chunk` then applies it
/// uniformly so every signal in a job compares against the same kind.
pub enum SignalProvider {
    Embedding {
        extractor: Arc<dyn FeatureExtractor>,
        batch_size: usize,
        normalize: bool,
        reduced_precision: bool,
    },
    Hash(HashComputer),
}

impl SignalProvider {
    pub fn embedding(extractor: Arc<dyn FeatureExtractor>, cfg: &EmbeddingConfig) -> Self {
        SignalProvider::Embedding {
            extractor,
            batch_size: cfg.batch_size.max(1),
            normalize: cfg.normalize,
            reduced_precision: cfg.reduced_precision,
        }
    }

    pub fn hash(cfg: &HashConfig) -> Self {
        SignalProvider::Hash(HashComputer::new(cfg))
    }

    pub fn method(&self) -> SignalMethod {
        match self {
            SignalProvider::Embedding { .. } => SignalMethod::Embedding,
            SignalProvider::Hash(_) => SignalMethod::Hash,
        }
    }

    /// Compute signals for one chunk of decoded images.
    ///
    /// Returns successful signals in input order plus a failure entry for
    /// every image the provider could not process.
    pub fn compute_chunk(
        &self,
        items: &[(ImageId, DynamicImage)],
        pool: &rayon::ThreadPool,
    ) -> (Vec<Signal>, Vec<ImageFailure>) {
        match self {
            SignalProvider::Hash(computer) => {
                let signals = pool.install(|| {
                    items
                        .par_iter()
                        .map(|(id, image)| Signal::Hashes(computer.compute(id, image)))
                        .collect()
                });
                (signals, Vec::new())
            }
            SignalProvider::Embedding {
                extractor,
                batch_size,
                normalize,
                reduced_precision,
            } => {
                let mut signals = Vec::with_capacity(items.len());
                let mut failures = Vec::new();
                for batch in items.chunks(*batch_size) {
                    let images: Vec<DynamicImage> =
                        batch.iter().map(|(_, image)| image.clone()).collect();
                    let results = extractor.embed_batch(&images);
                    for ((id, _), result) in batch.iter().zip(results) {
                        match result {
                            Ok(mut values) => {
                                if *normalize {
                                    l2_normalize_in_place(&mut values);
                                }
                                if *reduced_precision {
                                    quantize_in_place(&mut values);
                                }
                                signals.push(Signal::Embedding(EmbeddingVector {
                                    image_id: id.clone(),
                                    dimension: values.len(),
                                    values,
                                    model_id: extractor.model_id().to_string(),
                                    reduced_precision: *reduced_precision,
                                }));
                            }
                            Err(err) => {
                                failures.push(ImageFailure::new(id.clone(), err.to_string()));
                            }
                        }
                    }
                }
                (signals, failures)
            }
        }
    }
}

/// Truncate each component's mantissa to 10 bits. Keeps the precision a
/// half-float store would while staying in `f32` for distance math.
fn quantize_in_place(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = f32::from_bits(v.to_bits() & 0xFFFF_E000);
    }
}
