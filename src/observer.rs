//! Progress observation for running jobs.
//!
//! An observer is installed per job, not globally, so concurrent jobs
//! report to their own sinks. All callbacks have empty defaults; implement
//! only what you need.

use crate::types::ActionSummary;

/// Callback surface a job reports progress through.
///
/// Callbacks fire on the coordinating thread at chunk boundaries and after
/// each phase, never from inside worker tasks.
pub trait JobObserver: Send + Sync {
    /// A chunk is about to be processed. `len` reflects any pressure
    /// shrinking that already happened.
    fn chunk_started(&self, index: usize, len: usize) {
        let _ = (index, len);
    }

    /// A chunk finished; `failures` counts its per-image errors.
    fn chunk_completed(&self, index: usize, len: usize, failures: usize) {
        let _ = (index, len, failures);
    }

    /// The embedding strategy fell back to hashing. Fires at most once
    /// per job.
    fn job_degraded(&self, reason: &str) {
        let _ = reason;
    }

    /// The similarity phase finished with this many accepted edges.
    fn edges_found(&self, count: usize) {
        let _ = count;
    }

    /// The action phase finished.
    fn actions_applied(&self, summary: &ActionSummary) {
        let _ = summary;
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}
