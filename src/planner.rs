//! Chunk planning: how many images may be decoded at once.
//!
//! Peak memory during signal computation is bounded by
//! `chunk_size * per_image_cost`, with every worker holding at most one
//! decoded image. The planner picks the largest chunk that keeps that
//! product inside the configured budget, and halves it when memory
//! pressure is reported mid-job.

use serde::Serialize;

use crate::config::ResourceConfig;

/// A computed chunking decision for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkPlan {
    /// Images per chunk. At least 1 whenever there is work.
    pub chunk_size: usize,
    /// Number of chunks at the planned size.
    pub num_chunks: usize,
    pub total_items: usize,
}

/// Plan chunk sizing for `total_items` images.
///
/// An explicit `chunk_size_hint` wins. Otherwise the size is
/// `memory_budget / per_image_cost`, floored at 1 and capped at the item
/// count, so small datasets collapse to a single chunk.
pub fn plan_chunks(total_items: usize, workers: usize, resources: &ResourceConfig) -> ChunkPlan {
    if total_items == 0 {
        return ChunkPlan {
            chunk_size: 1,
            num_chunks: 0,
            total_items: 0,
        };
    }

    let chunk_size = if resources.chunk_size_hint > 0 {
        resources.chunk_size_hint
    } else {
        let budget = resources.memory_budget_mb as f64;
        // Workers process items concurrently, so the transient decode cost
        // scales with the worker count on top of the resident chunk.
        let per_item = resources.per_image_cost_mb.max(0.001);
        let concurrent_overhead = workers.max(1) as f64 * per_item;
        let usable = (budget - concurrent_overhead).max(per_item);
        (usable / per_item) as usize
    };

    let chunk_size = chunk_size.clamp(1, total_items);
    ChunkPlan {
        chunk_size,
        num_chunks: total_items.div_ceil(chunk_size),
        total_items,
    }
}

/// Halve a chunk size after a memory-pressure report, flooring at 1.
/// Applies to subsequent chunks only; completed chunks are untouched.
pub fn shrink(chunk_size: usize) -> usize {
    (chunk_size / 2).max(1)
}
