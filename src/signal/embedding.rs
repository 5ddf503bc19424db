//! Feature extraction for the embedding strategy.
//!
//! Extraction sits behind the [`FeatureExtractor`] trait so deployments can
//! plug in a real inference backend through the model cache. The built-in
//! [`ProjectionExtractor`] projects a downscaled grayscale image through a
//! fixed pseudo-random basis: fully deterministic, no model assets, and
//! near-duplicate inputs land close in cosine space because the projection
//! is linear in the pixels.

use fxhash::hash64;
use image::DynamicImage;
use image::imageops::FilterType;

use super::SignalError;
use crate::config::EmbeddingConfig;

/// Side length of the grayscale grid every image is reduced to before
/// projection.
const PROJECTION_GRID: u32 = 32;

/// Seed folded into every basis weight so the projection family is stable
/// across processes.
const PROJECTION_SEED: u64 = 0x4E45_4152_4455_50A1;

/// A loaded feature-extraction model.
///
/// `embed_batch` returns one entry per input in input order; individual
/// failures are per-slot so one bad image never sinks its batch.
pub trait FeatureExtractor: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed_batch(&self, images: &[DynamicImage]) -> Vec<Result<Vec<f32>, SignalError>>;
}

/// Built-in deterministic extractor. See the module docs.
pub struct ProjectionExtractor {
    model_id: String,
    dimension: usize,
    /// Row-major `dimension x GRID*GRID` projection weights, precomputed
    /// once at load time.
    basis: Vec<f32>,
}

impl ProjectionExtractor {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        let pixels = (PROJECTION_GRID * PROJECTION_GRID) as usize;
        let mut basis = Vec::with_capacity(dimension * pixels);
        for feature in 0..dimension {
            for pixel in 0..pixels {
                basis.push(basis_weight(feature, pixel));
            }
        }
        Self {
            model_id: model_id.into(),
            dimension,
            basis,
        }
    }

    fn embed_one(&self, image: &DynamicImage) -> Vec<f32> {
        let small = image
            .resize_exact(PROJECTION_GRID, PROJECTION_GRID, FilterType::Triangle)
            .to_luma8();
        let mut pixels: Vec<f32> = small.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();

        // Center on the image mean; the shared brightness component would
        // otherwise dominate every projection and compress all cosines
        // toward 1.
        let mean = pixels.iter().sum::<f32>() / pixels.len() as f32;
        for px in pixels.iter_mut() {
            *px -= mean;
        }

        let stride = pixels.len();
        let mut out = vec![0.0f32; self.dimension];
        for (feature, value) in out.iter_mut().enumerate() {
            let row = &self.basis[feature * stride..(feature + 1) * stride];
            let mut acc = 0.0f32;
            for (weight, px) in row.iter().zip(pixels.iter()) {
                acc += weight * px;
            }
            *value = acc;
        }
        out
    }
}

impl FeatureExtractor for ProjectionExtractor {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, images: &[DynamicImage]) -> Vec<Result<Vec<f32>, SignalError>> {
        images.iter().map(|img| Ok(self.embed_one(img))).collect()
    }
}

fn basis_weight(feature: usize, pixel: usize) -> f32 {
    let h = hash64(&(PROJECTION_SEED, feature as u64, pixel as u64));
    ((h >> 32) as f32 * 0.0001).sin()
}

/// Resolve an embedding config to a loaded extractor.
///
/// Only `projection*` model ids are built in; anything else must already
/// sit in the model cache or the load fails, which is what triggers the
/// hash fallback upstream.
pub(crate) fn load_extractor(
    cfg: &EmbeddingConfig,
) -> Result<Box<dyn FeatureExtractor>, SignalError> {
    if cfg.model_id.starts_with("projection") {
        Ok(Box::new(ProjectionExtractor::new(
            cfg.model_id.clone(),
            cfg.dimension,
        )))
    } else {
        Err(SignalError::ModelUnavailable(cfg.model_id.clone()))
    }
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left alone.
pub fn l2_normalize_in_place(values: &mut [f32]) {
    let norm_sq: f32 = values.iter().map(|v| v * v).sum();
    if norm_sq > 0.0 {
        let inv = norm_sq.sqrt().recip();
        for v in values.iter_mut() {
            *v *= inv;
        }
    }
}
