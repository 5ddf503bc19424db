//! Worker pool and model cache backing job execution.
//!
//! A [`ResourceManager`] owns the rayon pool every parallel phase runs on
//! and a cache of loaded feature extractors. `run_job` builds one per job;
//! callers running many jobs can build one up front and share it so models
//! load once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::config::{EmbeddingConfig, ResourceConfig};
use crate::signal::embedding::load_extractor;
use crate::signal::{FeatureExtractor, SignalError};

/// Auto-sized pools stop here; decode work oversubscribes past it.
pub(crate) const MAX_AUTO_WORKERS: usize = 8;

/// Memory pressure source consulted at chunk boundaries.
///
/// The engine never measures the host itself; embedders supply a probe
/// wired to whatever accounting their deployment has.
pub trait PressureProbe: Send + Sync {
    /// True when the process should shed memory before the next chunk.
    fn under_pressure(&self) -> bool;
}

pub struct ResourceManager {
    pool: rayon::ThreadPool,
    workers: usize,
    model_cache: ModelCache,
}

impl ResourceManager {
    pub fn new(cfg: &ResourceConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = resolve_workers(cfg.workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        info!(workers, "worker_pool_ready");
        Ok(Self {
            pool,
            workers,
            model_cache: ModelCache::new(),
        })
    }

    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn model_cache(&self) -> &ModelCache {
        &self.model_cache
    }
}

/// Explicit counts are taken as-is; zero means size from the host.
pub(crate) fn resolve_workers(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        num_cpus::get().clamp(1, MAX_AUTO_WORKERS)
    }
}

/// Loaded extractors keyed by model id and dimension.
pub struct ModelCache {
    extractors: RwLock<HashMap<String, Arc<dyn FeatureExtractor>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            extractors: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a cached extractor or load one for `cfg`.
    pub fn get_or_load(
        &self,
        cfg: &EmbeddingConfig,
    ) -> Result<Arc<dyn FeatureExtractor>, SignalError> {
        let key = cache_key(&cfg.model_id, cfg.dimension);
        if let Some(found) = self
            .extractors
            .read()
            .expect("model cache lock poisoned")
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        let mut guard = self.extractors.write().expect("model cache lock poisoned");
        // lost the race: someone loaded it while we waited
        if let Some(found) = guard.get(&key) {
            return Ok(Arc::clone(found));
        }
        let extractor: Arc<dyn FeatureExtractor> = Arc::from(load_extractor(cfg)?);
        guard.insert(key, Arc::clone(&extractor));
        info!(model_id = %cfg.model_id, dimension = cfg.dimension, "model_loaded");
        Ok(extractor)
    }

    /// Register an externally built extractor, e.g. a test double or an
    /// integration's own inference backend.
    pub fn install(&self, extractor: Arc<dyn FeatureExtractor>) {
        let key = cache_key(extractor.model_id(), extractor.dimension());
        self.extractors
            .write()
            .expect("model cache lock poisoned")
            .insert(key, extractor);
    }

    /// Drop every cached model, releasing their memory.
    pub fn clear(&self) {
        self.extractors
            .write()
            .expect("model cache lock poisoned")
            .clear();
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(model_id: &str, dimension: usize) -> String {
    format!("{model_id}@{dimension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ProjectionExtractor;

    #[test]
    fn auto_worker_count_is_clamped() {
        let auto = resolve_workers(0);
        assert!((1..=MAX_AUTO_WORKERS).contains(&auto));
        assert_eq!(resolve_workers(3), 3);
        assert_eq!(resolve_workers(64), 64, "explicit counts are respected");
    }

    #[test]
    fn manager_builds_pool_of_requested_size() {
        let cfg = ResourceConfig {
            workers: 2,
            ..ResourceConfig::default()
        };
        let manager = ResourceManager::new(&cfg).expect("pool builds");
        assert_eq!(manager.workers(), 2);
        assert_eq!(manager.pool().current_num_threads(), 2);
    }

    #[test]
    fn cache_returns_the_same_instance() {
        let cache = ModelCache::new();
        let cfg = EmbeddingConfig::default().with_dimension(16);

        let a = cache.get_or_load(&cfg).expect("first load");
        let b = cache.get_or_load(&cfg).expect("cache hit");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_dimensions_load_separately() {
        let cache = ModelCache::new();
        let small = cache
            .get_or_load(&EmbeddingConfig::default().with_dimension(8))
            .expect("load 8");
        let large = cache
            .get_or_load(&EmbeddingConfig::default().with_dimension(16))
            .expect("load 16");
        assert_eq!(small.dimension(), 8);
        assert_eq!(large.dimension(), 16);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let cache = ModelCache::new();
        let cfg = EmbeddingConfig::default().with_model_id("vit-large-onnx");
        let err = cache.get_or_load(&cfg).err().expect("model cannot load");
        assert!(matches!(err, SignalError::ModelUnavailable(_)));
    }

    #[test]
    fn installed_extractors_are_served_and_cleared() {
        let cache = ModelCache::new();
        cache.install(Arc::new(ProjectionExtractor::new("custom-backend", 32)));

        let cfg = EmbeddingConfig::default()
            .with_model_id("custom-backend")
            .with_dimension(32);
        assert!(cache.get_or_load(&cfg).is_ok(), "installed model resolves");

        cache.clear();
        assert!(
            matches!(
                cache.get_or_load(&cfg),
                Err(SignalError::ModelUnavailable(_))
            ),
            "cleared cache cannot rebuild a custom backend"
        );
    }
}
