//! Job configuration: programmatic builders plus YAML file support.
//!
//! A [`JobConfig`] describes one detection job end to end: which signal
//! method to use, thresholds, chunking and worker limits, and the action to
//! apply to duplicate groups. Configs are validated up front; a job never
//! starts with an invalid one.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1"
//! name: "training-set sweep"
//! method: hash
//!
//! hash:
//!   algorithms: [content, average]
//!   hash_size: 8
//!
//! similarity:
//!   cosine_threshold: 0.92
//!   block_size: 50
//!   combine:
//!     policy: any
//!
//! action:
//!   action: copy
//!   destination: "/data/curation/dupes"
//!   dry_run: true
//!
//! resources:
//!   workers: 4
//!   memory_budget_mb: 1024
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{HashAlgorithm, SignalMethod};

/// Errors raised while loading or validating a job configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// What to do with the non-representative members of each duplicate group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Report only. Never touches the filesystem.
    #[default]
    Show,
    Copy,
    Move,
    Delete,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Show => "show",
            ActionKind::Copy => "copy",
            ActionKind::Move => "move",
            ActionKind::Delete => "delete",
        }
    }

    pub fn needs_destination(&self) -> bool {
        matches!(self, ActionKind::Copy | ActionKind::Move)
    }
}

/// How per-algorithm hash verdicts combine into one pair decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HashCombine {
    /// Any single algorithm over its threshold accepts the pair.
    #[default]
    Any,
    /// Every configured algorithm must be over its threshold.
    All,
    /// At least `count` algorithms must be over their thresholds.
    AtLeast { count: usize },
}

/// How group representatives are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativePolicy {
    /// Lexicographically smallest member id. Needs no extra metadata.
    #[default]
    LexicographicId,
    /// Member with the highest caller-supplied quality score. Ties and
    /// missing scores fall back to lexicographic order.
    HighestQuality,
}

/// Top-level configuration for one detection job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobConfig {
    /// Configuration format version.
    #[serde(default = "default_config_version")]
    pub version: String,

    /// Optional job name, echoed in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// Signal method for this job. Exactly one kind of signal is computed.
    #[serde(default)]
    pub method: SignalMethod,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub hash: HashConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub representative: RepresentativePolicy,

    #[serde(default)]
    pub action: ActionConfig,

    #[serde(default)]
    pub resources: ResourceConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            method: SignalMethod::default(),
            embedding: EmbeddingConfig::default(),
            hash: HashConfig::default(),
            similarity: SimilarityConfig::default(),
            representative: RepresentativePolicy::default(),
            action: ActionConfig::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl JobConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: JobConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_method(mut self, method: SignalMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action.action = action;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.action.destination = Some(destination.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.action.dry_run = dry_run;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.resources.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, hint: usize) -> Self {
        self.resources.chunk_size_hint = hint;
        self
    }

    /// Validate the whole configuration. Called automatically by the YAML
    /// loaders and again at job start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.version.as_str() {
            "1" | "1.0" => {}
            v => return Err(ConfigError::UnsupportedVersion(v.to_string())),
        }

        self.embedding.validate()?;
        self.hash.validate()?;
        self.similarity.validate(&self.hash)?;
        self.action.validate()?;
        self.resources.validate()?;

        // Accelerator-resident models cannot be shared across process
        // boundaries. Reject the combination instead of working around it.
        if self.resources.multi_process && self.embedding.device != "cpu" {
            return Err(ConfigError::Validation(format!(
                "multi-process execution cannot be combined with device '{}'; \
                 accelerator-resident models are process-local",
                self.embedding.device
            )));
        }

        Ok(())
    }
}

/// Embedding strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Feature-extraction model identifier. Models with the `projection`
    /// prefix are built in; anything else must be installed into the model
    /// cache by the caller.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Images per inference batch within a chunk.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// L2-normalize vectors before similarity computation.
    #[serde(default = "true_value")]
    pub normalize: bool,

    /// Mark produced vectors as reduced precision.
    #[serde(default)]
    pub reduced_precision: bool,

    /// Execution device. Anything other than `cpu` is treated as
    /// accelerator-resident.
    #[serde(default = "default_device")]
    pub device: String,
}

impl EmbeddingConfig {
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model_id.is_empty() {
            return Err(ConfigError::Validation(
                "embedding.model_id must not be empty".to_string(),
            ));
        }
        if self.dimension < 8 {
            return Err(ConfigError::Validation(
                "embedding.dimension must be >= 8".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "embedding.batch_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            normalize: true,
            reduced_precision: false,
            device: default_device(),
        }
    }
}

/// Hash strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashConfig {
    /// Algorithms to compute per image, in order.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<HashAlgorithm>,

    /// Side length of the square hash grid for the grid-based algorithms.
    #[serde(default = "default_hash_size")]
    pub hash_size: u32,
}

impl HashConfig {
    pub fn with_algorithms(mut self, algorithms: Vec<HashAlgorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::Validation(
                "hash.algorithms must not be empty".to_string(),
            ));
        }
        for (i, alg) in self.algorithms.iter().enumerate() {
            if self.algorithms[..i].contains(alg) {
                return Err(ConfigError::Validation(format!(
                    "hash.algorithms lists '{}' more than once",
                    alg.name()
                )));
            }
        }
        if !(4..=32).contains(&self.hash_size) {
            return Err(ConfigError::Validation(
                "hash.hash_size must be between 4 and 32".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithms: default_algorithms(),
            hash_size: default_hash_size(),
        }
    }
}

/// Per-algorithm similarity thresholds, expressed as
/// `1 - normalized hamming distance`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HashThresholds {
    #[serde(default = "default_content_threshold")]
    pub content: f64,
    #[serde(default = "default_edge_diff_threshold")]
    pub edge_diff: f64,
    #[serde(default = "default_average_threshold")]
    pub average: f64,
    #[serde(default = "default_wavelet_threshold")]
    pub wavelet: f64,
    #[serde(default = "default_color_threshold")]
    pub color: f64,
}

impl HashThresholds {
    pub fn for_algorithm(&self, algorithm: HashAlgorithm) -> f64 {
        match algorithm {
            HashAlgorithm::Content => self.content,
            HashAlgorithm::EdgeDiff => self.edge_diff,
            HashAlgorithm::Average => self.average,
            HashAlgorithm::Wavelet => self.wavelet,
            HashAlgorithm::Color => self.color,
        }
    }
}

impl Default for HashThresholds {
    fn default() -> Self {
        Self {
            content: default_content_threshold(),
            edge_diff: default_edge_diff_threshold(),
            average: default_average_threshold(),
            wavelet: default_wavelet_threshold(),
            color: default_color_threshold(),
        }
    }
}

/// ANN index parameters for the approximate strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnnParams {
    /// Whether the approximate strategy may be selected at all.
    #[serde(default = "true_value")]
    pub enabled: bool,

    /// Neighbors per graph node (higher = better recall, slower build).
    #[serde(default = "default_ann_m")]
    pub m: usize,

    /// Candidate list size during construction.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    /// Candidate list size during search.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,

    /// Neighbors fetched per vector when harvesting candidate pairs.
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,

    /// Below this many vectors the block scan wins; the index is skipped.
    #[serde(default = "default_min_vectors")]
    pub min_vectors: usize,
}

impl AnnParams {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_vectors(mut self, min: usize) -> Self {
        self.min_vectors = min;
        self
    }
}

impl Default for AnnParams {
    fn default() -> Self {
        Self {
            enabled: true,
            m: default_ann_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
            max_neighbors: default_max_neighbors(),
            min_vectors: default_min_vectors(),
        }
    }
}

/// Similarity engine configuration shared by both strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Global acceptance threshold for embedding cosine similarity.
    #[serde(default = "default_cosine_threshold")]
    pub cosine_threshold: f64,

    #[serde(default)]
    pub hash_thresholds: HashThresholds,

    #[serde(default)]
    pub combine: HashCombine,

    /// Side length of the bounded comparison blocks in the scan strategy.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    #[serde(default)]
    pub ann: AnnParams,
}

impl SimilarityConfig {
    pub fn with_cosine_threshold(mut self, threshold: f64) -> Self {
        self.cosine_threshold = threshold;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_combine(mut self, combine: HashCombine) -> Self {
        self.combine = combine;
        self
    }

    fn validate(&self, hash: &HashConfig) -> Result<(), ConfigError> {
        check_threshold("similarity.cosine_threshold", self.cosine_threshold)?;
        for alg in HashAlgorithm::ALL {
            check_threshold(
                &format!("similarity.hash_thresholds.{}", alg.name()),
                self.hash_thresholds.for_algorithm(alg),
            )?;
        }
        if self.block_size == 0 {
            return Err(ConfigError::Validation(
                "similarity.block_size must be >= 1".to_string(),
            ));
        }
        if let HashCombine::AtLeast { count } = self.combine {
            if count == 0 {
                return Err(ConfigError::Validation(
                    "similarity.combine.count must be >= 1".to_string(),
                ));
            }
            if count > hash.algorithms.len() {
                return Err(ConfigError::Validation(format!(
                    "similarity.combine.count ({count}) exceeds the {} configured \
                     hash algorithms",
                    hash.algorithms.len()
                )));
            }
        }
        if self.ann.m < 2 {
            return Err(ConfigError::Validation(
                "similarity.ann.m must be >= 2".to_string(),
            ));
        }
        if self.ann.max_neighbors == 0 {
            return Err(ConfigError::Validation(
                "similarity.ann.max_neighbors must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            cosine_threshold: default_cosine_threshold(),
            hash_thresholds: HashThresholds::default(),
            combine: HashCombine::default(),
            block_size: default_block_size(),
            ann: AnnParams::default(),
        }
    }
}

/// Action executor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub action: ActionKind,

    /// Target directory for copy and move.
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Record what would happen without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Required for a non-dry-run delete.
    #[serde(default)]
    pub confirm_delete: bool,
}

impl ActionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.action.needs_destination() && self.destination.is_none() {
            return Err(ConfigError::Validation(format!(
                "action.destination is required for the '{}' action",
                self.action.name()
            )));
        }
        if self.action == ActionKind::Delete && !self.dry_run && !self.confirm_delete {
            return Err(ConfigError::Validation(
                "delete requires action.confirm_delete (or dry_run) to be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker, memory, and chunking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Worker threads for in-chunk parallelism. `0` resolves to the number
    /// of logical CPUs, capped at 8.
    #[serde(default)]
    pub workers: usize,

    /// Explicit chunk size. `0` lets the planner derive one from the
    /// memory budget.
    #[serde(default)]
    pub chunk_size_hint: usize,

    /// Ceiling for concurrently resident decoded images, in megabytes.
    #[serde(default = "default_memory_budget_mb")]
    pub memory_budget_mb: usize,

    /// Planner's estimate of one decoded image's peak cost, in megabytes.
    #[serde(default = "default_per_image_cost_mb")]
    pub per_image_cost_mb: f64,

    /// Wall-clock deadline per chunk, checked after the chunk's parallel
    /// section finishes. A late chunk is discarded whole and its images
    /// recorded as failures; in-flight decode or inference work is never
    /// interrupted, so this bounds damage, not latency. `None` disables
    /// the deadline.
    #[serde(default)]
    pub chunk_timeout_ms: Option<u64>,

    /// Set when the caller shards work across processes. Incompatible with
    /// accelerator-resident models.
    #[serde(default)]
    pub multi_process: bool,
}

impl ResourceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_budget_mb == 0 {
            return Err(ConfigError::Validation(
                "resources.memory_budget_mb must be >= 1".to_string(),
            ));
        }
        if self.per_image_cost_mb <= 0.0 {
            return Err(ConfigError::Validation(
                "resources.per_image_cost_mb must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            chunk_size_hint: 0,
            memory_budget_mb: default_memory_budget_mb(),
            per_image_cost_mb: default_per_image_cost_mb(),
            chunk_timeout_ms: None,
            multi_process: false,
        }
    }
}

fn check_threshold(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{field} must be in [0.0, 1.0], got {value}"
        )));
    }
    Ok(())
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1".to_string()
}
fn true_value() -> bool {
    true
}
fn default_model_id() -> String {
    "projection-384".to_string()
}
fn default_dimension() -> usize {
    384
}
fn default_batch_size() -> usize {
    16
}
fn default_device() -> String {
    "cpu".to_string()
}
fn default_algorithms() -> Vec<HashAlgorithm> {
    vec![HashAlgorithm::Content]
}
fn default_hash_size() -> u32 {
    8
}
fn default_cosine_threshold() -> f64 {
    0.92
}
fn default_content_threshold() -> f64 {
    0.90
}
fn default_edge_diff_threshold() -> f64 {
    0.85
}
fn default_average_threshold() -> f64 {
    0.80
}
fn default_wavelet_threshold() -> f64 {
    0.85
}
fn default_color_threshold() -> f64 {
    0.75
}
fn default_block_size() -> usize {
    50
}
fn default_ann_m() -> usize {
    16
}
fn default_ef_construction() -> usize {
    200
}
fn default_ef_search() -> usize {
    50
}
fn default_max_neighbors() -> usize {
    32
}
fn default_min_vectors() -> usize {
    256
}
fn default_memory_budget_mb() -> usize {
    1024
}
fn default_per_image_cost_mb() -> f64 {
    24.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_is_valid() {
        let config = JobConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.method, SignalMethod::Hash);
        assert_eq!(config.similarity.cosine_threshold, 0.92);
        assert_eq!(config.similarity.block_size, 50);
    }

    #[test]
    fn load_valid_yaml() {
        let yaml = r#"
version: "1"
name: "nightly sweep"
method: hash
hash:
  algorithms: [content, average, color]
similarity:
  block_size: 25
  combine:
    policy: at_least
    count: 2
"#;

        let config = JobConfig::from_yaml(yaml).expect("yaml should parse");
        assert_eq!(config.name.as_deref(), Some("nightly sweep"));
        assert_eq!(config.hash.algorithms.len(), 3);
        assert_eq!(config.similarity.block_size, 25);
        assert_eq!(config.similarity.combine, HashCombine::AtLeast { count: 2 });
    }

    #[test]
    fn load_from_file() {
        let yaml = r#"
version: "1"
method: embedding
embedding:
  model_id: "projection-256"
  dimension: 256
"#;
        let mut temp_file = NamedTempFile::new().expect("temp file");
        temp_file
            .write_all(yaml.as_bytes())
            .expect("write temp yaml");

        let config = JobConfig::from_file(temp_file.path()).expect("load from file");
        assert_eq!(config.method, SignalMethod::Embedding);
        assert_eq!(config.embedding.dimension, 256);
        // Sections absent from the file fill in from the serde defaults.
        assert_eq!(config.similarity.block_size, 50);
        assert_eq!(config.similarity.ann.min_vectors, 256);
    }

    #[test]
    fn unsupported_version_rejected() {
        let result = JobConfig::from_yaml("version: \"7\"");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(v)) if v == "7"));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = JobConfig::default();
        config.similarity.cosine_threshold = 1.5;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cosine_threshold"));

        config.similarity.cosine_threshold = -0.25;
        assert!(config.validate().is_err());

        // 0.0 accepts every pair; extreme, but inside the range.
        config.similarity.cosine_threshold = 0.0;
        config.validate().expect("zero threshold is well-formed");
    }

    #[test]
    fn duplicate_hash_algorithms_rejected() {
        let mut config = JobConfig::default();
        config.hash.algorithms = vec![HashAlgorithm::Content, HashAlgorithm::Content];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn at_least_count_bounded_by_algorithm_list() {
        let mut config = JobConfig::default();
        config.hash.algorithms = vec![HashAlgorithm::Content, HashAlgorithm::Average];
        config.similarity.combine = HashCombine::AtLeast { count: 3 };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        config.similarity.combine = HashCombine::AtLeast { count: 2 };
        config.validate().expect("count within bounds");
    }

    #[test]
    fn copy_requires_destination() {
        let config = JobConfig::default().with_action(ActionKind::Copy);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("destination"));

        let config = JobConfig::default()
            .with_action(ActionKind::Copy)
            .with_destination("/tmp/dupes");
        config.validate().expect("destination satisfies copy");
    }

    #[test]
    fn delete_requires_confirmation_unless_dry_run() {
        let config = JobConfig::default().with_action(ActionKind::Delete);
        assert!(config.validate().is_err());

        let config = JobConfig::default()
            .with_action(ActionKind::Delete)
            .with_dry_run(true);
        config.validate().expect("dry-run delete needs no confirm");

        let mut config = JobConfig::default().with_action(ActionKind::Delete);
        config.action.confirm_delete = true;
        config.validate().expect("confirmed delete validates");
    }

    #[test]
    fn multi_process_with_accelerator_rejected() {
        let mut config = JobConfig::default().with_method(SignalMethod::Embedding);
        config.resources.multi_process = true;
        config.embedding.device = "cuda:0".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multi-process"));

        config.embedding.device = "cpu".to_string();
        config.validate().expect("cpu device is process-shareable");
    }

    #[test]
    fn hash_threshold_defaults_per_algorithm() {
        let thresholds = HashThresholds::default();
        assert_eq!(thresholds.for_algorithm(HashAlgorithm::Content), 0.90);
        assert_eq!(thresholds.for_algorithm(HashAlgorithm::EdgeDiff), 0.85);
        assert_eq!(thresholds.for_algorithm(HashAlgorithm::Average), 0.80);
        assert_eq!(thresholds.for_algorithm(HashAlgorithm::Wavelet), 0.85);
        assert_eq!(thresholds.for_algorithm(HashAlgorithm::Color), 0.75);
    }

    #[test]
    fn builders_compose() {
        let config = JobConfig::default()
            .with_method(SignalMethod::Embedding)
            .with_workers(4)
            .with_chunk_size(100)
            .with_dry_run(true);

        assert_eq!(config.method, SignalMethod::Embedding);
        assert_eq!(config.resources.workers, 4);
        assert_eq!(config.resources.chunk_size_hint, 100);
        assert!(config.action.dry_run);
    }
}
