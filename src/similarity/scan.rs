//! Bounded block scan: the exact comparison strategy.
//!
//! Signals are split into fixed-size blocks and every block pair is
//! compared, inner loops keeping a strict `i < j` order so each unordered
//! pair is visited exactly once. Block pairs fan out across the rayon
//! pool; peak memory per task stays proportional to two blocks.

use rayon::prelude::*;

use super::{SimilarityError, cosine_similarity};
use crate::config::{HashCombine, SimilarityConfig};
use crate::types::{EmbeddingVector, HashBundle, SignalMethod, SimilarityEdge};

pub(crate) fn embedding_edges(
    vectors: &[&EmbeddingVector],
    cfg: &SimilarityConfig,
) -> Result<Vec<SimilarityEdge>, SimilarityError> {
    if vectors.len() < 2 {
        return Ok(Vec::new());
    }
    check_dimensions(vectors)?;
    let threshold = cfg.cosine_threshold;

    let pairs = block_pairs(vectors.len(), cfg.block_size);
    let edges: Vec<Vec<SimilarityEdge>> = pairs
        .par_iter()
        .map(|&((s0, e0), (s1, e1))| {
            let mut out = Vec::new();
            for i in s0..e0 {
                let j_start = if s0 == s1 { i + 1 } else { s1 };
                for j in j_start..e1 {
                    let score = f64::from(cosine_similarity(
                        &vectors[i].values,
                        &vectors[j].values,
                    ))
                    .clamp(0.0, 1.0);
                    if score >= threshold {
                        out.push(SimilarityEdge::new(
                            vectors[i].image_id.clone(),
                            vectors[j].image_id.clone(),
                            score,
                            SignalMethod::Embedding,
                        ));
                    }
                }
            }
            out
        })
        .collect();

    Ok(edges.into_iter().flatten().collect())
}

pub(crate) fn hash_edges(
    bundles: &[&HashBundle],
    cfg: &SimilarityConfig,
) -> Result<Vec<SimilarityEdge>, SimilarityError> {
    if bundles.len() < 2 {
        return Ok(Vec::new());
    }

    let pairs = block_pairs(bundles.len(), cfg.block_size);
    let per_block: Result<Vec<Vec<SimilarityEdge>>, SimilarityError> = pairs
        .par_iter()
        .map(|&((s0, e0), (s1, e1))| {
            let mut out = Vec::new();
            for i in s0..e0 {
                let j_start = if s0 == s1 { i + 1 } else { s1 };
                for j in j_start..e1 {
                    if let Some(score) = compare_bundles(bundles[i], bundles[j], cfg)? {
                        out.push(SimilarityEdge::new(
                            bundles[i].image_id.clone(),
                            bundles[j].image_id.clone(),
                            score,
                            SignalMethod::Hash,
                        ));
                    }
                }
            }
            Ok(out)
        })
        .collect();

    Ok(per_block?.into_iter().flatten().collect())
}

/// Compare two hash bundles under the configured combine policy.
///
/// Algorithms missing from either bundle count as not passing. Returns the
/// accepted pair's score, or `None` when the policy rejects it.
fn compare_bundles(
    a: &HashBundle,
    b: &HashBundle,
    cfg: &SimilarityConfig,
) -> Result<Option<f64>, SimilarityError> {
    let mut considered = 0usize;
    let mut all_min = f64::INFINITY;
    let mut passing: Vec<f64> = Vec::new();

    for sig_a in &a.signatures {
        let Some(sig_b) = b.signature(sig_a.algorithm) else {
            considered += 1;
            all_min = 0.0;
            continue;
        };
        let Some(sim) = sig_a.similarity(sig_b) else {
            return Err(SimilarityError::IncomparableSignatures(format!(
                "{} widths differ between {} and {}",
                sig_a.algorithm.name(),
                a.image_id,
                b.image_id
            )));
        };
        considered += 1;
        all_min = all_min.min(sim);
        if sim >= cfg.hash_thresholds.for_algorithm(sig_a.algorithm) {
            passing.push(sim);
        }
    }
    for sig_b in &b.signatures {
        if a.signature(sig_b.algorithm).is_none() {
            considered += 1;
            all_min = 0.0;
        }
    }
    if considered == 0 {
        return Ok(None);
    }

    let accepted = match cfg.combine {
        HashCombine::Any => passing
            .iter()
            .copied()
            .fold(None, |best: Option<f64>, sim| {
                Some(best.map_or(sim, |b| b.max(sim)))
            }),
        HashCombine::All => {
            if passing.len() == considered {
                Some(all_min)
            } else {
                None
            }
        }
        HashCombine::AtLeast { count } => {
            if passing.len() >= count {
                passing.iter().copied().fold(None, |worst: Option<f64>, sim| {
                    Some(worst.map_or(sim, |w| w.min(sim)))
                })
            } else {
                None
            }
        }
    };
    Ok(accepted)
}

fn check_dimensions(vectors: &[&EmbeddingVector]) -> Result<(), SimilarityError> {
    let expected = vectors[0].dimension;
    for vector in vectors {
        if vector.dimension != expected || vector.values.len() != expected {
            return Err(SimilarityError::DimensionMismatch {
                expected,
                got: vector.values.len(),
                id: vector.image_id.clone(),
            });
        }
    }
    Ok(())
}

/// All block range pairs `(bi, bj)` with `bi <= bj` over `len` items.
fn block_pairs(len: usize, block_size: usize) -> Vec<((usize, usize), (usize, usize))> {
    let block_size = block_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + block_size).min(len);
        ranges.push((start, end));
        start = end;
    }

    let mut pairs = Vec::new();
    for (i, &a) in ranges.iter().enumerate() {
        for &b in &ranges[i..] {
            pairs.push((a, b));
        }
    }
    pairs
}
