//! Image sources: where candidate images come from.
//!
//! The engine never walks directories or decodes files on its own; it asks
//! an [`ImageSource`] for an ordered id list and for decoded pixels on
//! demand. [`FsImageSource`] covers the common directory-tree case;
//! [`MemorySource`] serves in-process pipelines and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use walkdir::WalkDir;

use crate::types::ImageId;

/// File extensions treated as images, lowercase.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff",
];

/// Errors from listing or loading images.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot list images: {root} is not a directory")]
    NotADirectory { root: String },

    #[error("image not found: {0}")]
    NotFound(String),

    #[error("failed to decode {id}: {reason}")]
    Decode { id: String, reason: String },
}

/// Supplier of candidate images for a job.
///
/// `list_images` returns a stable, ordered id collection; `load_image`
/// resolves one id to decoded pixels. Load failures are per-image and the
/// engine records them without aborting the job.
pub trait ImageSource: Send + Sync {
    fn list_images(&self) -> Result<Vec<ImageId>, SourceError>;

    fn load_image(&self, id: &str) -> Result<DynamicImage, SourceError>;
}

/// Recursive directory source. Ids are the discovered file paths. The
/// listing is sorted so repeated runs see the same order.
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_image_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl ImageSource for FsImageSource {
    fn list_images(&self) -> Result<Vec<ImageId>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::NotADirectory {
                root: self.root.display().to_string(),
            });
        }

        let mut ids: Vec<ImageId> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| Self::is_image_path(entry.path()))
            .map(|entry| entry.path().display().to_string())
            .collect();

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn load_image(&self, id: &str) -> Result<DynamicImage, SourceError> {
        let path = Path::new(id);
        if !path.exists() {
            return Err(SourceError::NotFound(id.to_string()));
        }
        image::open(path).map_err(|err| SourceError::Decode {
            id: id.to_string(),
            reason: err.to_string(),
        })
    }
}

/// In-memory source holding pre-decoded images, with per-id failure
/// injection. Listing preserves insertion order.
#[derive(Default)]
pub struct MemorySource {
    order: Vec<ImageId>,
    images: HashMap<ImageId, DynamicImage>,
    failures: HashMap<ImageId, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ImageId>, image: DynamicImage) {
        let id = id.into();
        if !self.images.contains_key(&id) && !self.failures.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.failures.remove(&id);
        self.images.insert(id, image);
    }

    /// Register an id whose load always fails with `reason`.
    pub fn insert_failing(&mut self, id: impl Into<ImageId>, reason: impl Into<String>) {
        let id = id.into();
        if !self.images.contains_key(&id) && !self.failures.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.images.remove(&id);
        self.failures.insert(id, reason.into());
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl ImageSource for MemorySource {
    fn list_images(&self) -> Result<Vec<ImageId>, SourceError> {
        Ok(self.order.clone())
    }

    fn load_image(&self, id: &str) -> Result<DynamicImage, SourceError> {
        if let Some(reason) = self.failures.get(id) {
            return Err(SourceError::Decode {
                id: id.to_string(),
                reason: reason.clone(),
            });
        }
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }
}
