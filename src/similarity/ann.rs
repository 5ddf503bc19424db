//! Approximate candidate generation over an HNSW index.
//!
//! Builds a cosine-distance HNSW graph from the job's embedding vectors,
//! then queries every vector for its nearest neighbors. Pairs scoring at
//! or above the cosine threshold become edges. Recall is approximate; the
//! block scan is the exact reference.

use std::collections::HashMap;

use hnsw_rs::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use super::{SimilarityError, cosine_similarity};
use crate::config::SimilarityConfig;
use crate::types::{EmbeddingVector, SimilarityEdge};

/// Below this many vectors the graph is unreliable, so we answer exactly.
const MIN_INDEX_SIZE: usize = 10;

pub(crate) fn index_edges(
    vectors: &[&EmbeddingVector],
    cfg: &SimilarityConfig,
) -> Result<Vec<SimilarityEdge>, SimilarityError> {
    if vectors.len() < 2 {
        return Ok(Vec::new());
    }
    check_dimensions(vectors)?;

    if vectors.len() < MIN_INDEX_SIZE {
        return Ok(exact_edges(vectors, cfg));
    }

    let nb_elem = vectors.len();
    let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize);
    let hnsw = Hnsw::<f32, DistCosine>::new(
        cfg.ann.m,
        nb_elem,
        nb_layer,
        cfg.ann.ef_construction,
        DistCosine {},
    );

    let data: Vec<(&Vec<f32>, usize)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (&v.values, i))
        .collect();
    hnsw.parallel_insert(&data);
    debug!(vectors = nb_elem, layers = nb_layer, "ann_index_built");

    // One extra neighbor since every query finds itself at distance zero.
    let knbn = cfg.ann.max_neighbors + 1;
    let ef = cfg.ann.ef_search.max(knbn);
    let threshold = cfg.cosine_threshold;

    let per_query: Vec<Vec<((usize, usize), f64)>> = vectors
        .par_iter()
        .enumerate()
        .map(|(i, vector)| {
            let mut hits = Vec::new();
            for neighbour in hnsw.search(&vector.values, knbn, ef) {
                let j = neighbour.get_origin_id();
                if j == i {
                    continue;
                }
                let score = f64::from(1.0 - neighbour.distance).clamp(0.0, 1.0);
                if score >= threshold {
                    hits.push(((i.min(j), i.max(j)), score));
                }
            }
            hits
        })
        .collect();

    // A pair can surface from either endpoint's query; keep the best score.
    let mut found: HashMap<(usize, usize), f64> = HashMap::new();
    for (key, score) in per_query.into_iter().flatten() {
        let entry = found.entry(key).or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }

    Ok(found
        .into_iter()
        .map(|((i, j), score)| {
            SimilarityEdge::new(
                vectors[i].image_id.clone(),
                vectors[j].image_id.clone(),
                score,
                crate::types::SignalMethod::Embedding,
            )
        })
        .collect())
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

/// Exact pairwise pass for sets too small to index.
fn exact_edges(vectors: &[&EmbeddingVector], cfg: &SimilarityConfig) -> Vec<SimilarityEdge> {
    let mut edges = Vec::new();
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            let score =
                f64::from(cosine_similarity(&vectors[i].values, &vectors[j].values)).clamp(0.0, 1.0);
            if score >= cfg.cosine_threshold {
                edges.push(SimilarityEdge::new(
                    vectors[i].image_id.clone(),
                    vectors[j].image_id.clone(),
                    score,
                    crate::types::SignalMethod::Embedding,
                ));
            }
        }
    }
    edges
}
