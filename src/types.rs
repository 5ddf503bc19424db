//! Core data model for duplicate detection jobs.
//!
//! Everything that flows between pipeline stages lives here: image records,
//! similarity signals, edges, groups, and the final job report. All types are
//! serde-serializable so callers can persist or ship reports as JSON.

use serde::{Deserialize, Serialize};

/// Stable identifier for an image. Usually an absolute path, but any
/// caller-supplied key works as long as it is unique within a job.
pub type ImageId = String;

/// Which kind of similarity signal a job computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMethod {
    /// Dense feature vectors from a feature-extraction model.
    Embedding,
    /// Perceptual hash signatures. No model required.
    #[default]
    Hash,
}

impl SignalMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SignalMethod::Embedding => "embedding",
            SignalMethod::Hash => "hash",
        }
    }
}

/// Lifecycle state of an image within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    Loaded,
    Failed,
}

/// One image tracked through a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub state: RecordState,
    /// Populated only when `state` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ImageRecord {
    pub fn pending(id: impl Into<ImageId>) -> Self {
        Self {
            id: id.into(),
            state: RecordState::Pending,
            failure: None,
        }
    }

    pub fn mark_loaded(&mut self) {
        self.state = RecordState::Loaded;
        self.failure = None;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.state = RecordState::Failed;
        self.failure = Some(reason.into());
    }
}

/// Perceptual hash algorithms supported by the hash strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// DCT-based content hash. Robust to resizing and mild compression.
    Content,
    /// Horizontal gradient hash. Sensitive to structural edits.
    EdgeDiff,
    /// Mean-brightness hash. Cheapest, loosest.
    Average,
    /// Haar-wavelet hash over the low-frequency band.
    Wavelet,
    /// Per-channel color distribution hash. Catches color-only edits the
    /// grayscale algorithms miss.
    Color,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 5] = [
        HashAlgorithm::Content,
        HashAlgorithm::EdgeDiff,
        HashAlgorithm::Average,
        HashAlgorithm::Wavelet,
        HashAlgorithm::Color,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Content => "content",
            HashAlgorithm::EdgeDiff => "edge_diff",
            HashAlgorithm::Average => "average",
            HashAlgorithm::Wavelet => "wavelet",
            HashAlgorithm::Color => "color",
        }
    }
}

/// Dense embedding produced by a feature extractor for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub image_id: ImageId,
    pub values: Vec<f32>,
    pub dimension: usize,
    pub model_id: String,
    /// True when the vector was stored at reduced precision.
    pub reduced_precision: bool,
}

/// Fixed-width bit signature from one hash algorithm for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSignature {
    pub image_id: ImageId,
    pub algorithm: HashAlgorithm,
    /// Packed bits, most significant bit first within each byte.
    pub bits: Vec<u8>,
    /// Number of meaningful bits in `bits`. Trailing pad bits are zero.
    pub bit_len: usize,
}

impl HashSignature {
    /// Hamming distance to another signature. `None` when the signatures
    /// come from different algorithms or widths and cannot be compared.
    pub fn hamming_distance(&self, other: &HashSignature) -> Option<u32> {
        if self.algorithm != other.algorithm || self.bit_len != other.bit_len {
            return None;
        }
        let mut dist = 0u32;
        for (a, b) in self.bits.iter().zip(other.bits.iter()) {
            dist += (a ^ b).count_ones();
        }
        Some(dist)
    }

    /// Similarity in `[0, 1]`: `1 - hamming / bit_len`.
    pub fn similarity(&self, other: &HashSignature) -> Option<f64> {
        if self.bit_len == 0 {
            return None;
        }
        self.hamming_distance(other)
            .map(|d| 1.0 - f64::from(d) / self.bit_len as f64)
    }
}

/// All hash signatures computed for one image, one per configured algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashBundle {
    pub image_id: ImageId,
    pub signatures: Vec<HashSignature>,
}

impl HashBundle {
    pub fn signature(&self, algorithm: HashAlgorithm) -> Option<&HashSignature> {
        self.signatures.iter().find(|s| s.algorithm == algorithm)
    }
}

/// Per-image similarity signal. A job computes exactly one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Embedding(EmbeddingVector),
    Hashes(HashBundle),
}

impl Signal {
    pub fn image_id(&self) -> &str {
        match self {
            Signal::Embedding(e) => &e.image_id,
            Signal::Hashes(h) => &h.image_id,
        }
    }

    pub fn method(&self) -> SignalMethod {
        match self {
            Signal::Embedding(_) => SignalMethod::Embedding,
            Signal::Hashes(_) => SignalMethod::Hash,
        }
    }
}

/// An accepted similarity between two images.
///
/// Pairs are stored in canonical order (`first < second` lexicographically)
/// so each undirected pair appears exactly once no matter which side
/// discovered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub first: ImageId,
    pub second: ImageId,
    /// Similarity score in `[0, 1]`, already past the acceptance threshold.
    pub score: f64,
    pub method: SignalMethod,
}

impl SimilarityEdge {
    pub fn new(
        a: impl Into<ImageId>,
        b: impl Into<ImageId>,
        score: f64,
        method: SignalMethod,
    ) -> Self {
        let (a, b) = (a.into(), b.into());
        debug_assert_ne!(a, b, "self-pairs must be filtered before edge creation");
        if a <= b {
            Self {
                first: a,
                second: b,
                score,
                method,
            }
        } else {
            Self {
                first: b,
                second: a,
                score,
                method,
            }
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }
}

/// A connected component of images joined by accepted edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Always one of `members`.
    pub representative: ImageId,
    /// Sorted lexicographically. Length is at least 2.
    pub members: Vec<ImageId>,
    /// Minimum pairwise score among the accepted edges inside the group.
    pub score: f64,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }
}

/// One image the job could not fully process. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub id: ImageId,
    pub reason: String,
}

impl ImageFailure {
    pub fn new(id: impl Into<ImageId>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// What the executor did (or would do) to one group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The operation ran against the filesystem.
    Applied,
    /// Dry run: the operation was recorded but nothing was touched.
    Planned,
    /// Source already absent, or nothing to do. Not an error.
    Skipped,
    Failed,
}

/// Per-file record of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ImageId,
    pub outcome: ActionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of the action phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub dry_run: bool,
    pub applied: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<ActionRecord>,
}

impl ActionSummary {
    pub(crate) fn push(&mut self, record: ActionRecord) {
        match record.outcome {
            ActionOutcome::Applied => self.applied += 1,
            ActionOutcome::Planned => self.planned += 1,
            ActionOutcome::Skipped => self.skipped += 1,
            ActionOutcome::Failed => self.failed += 1,
        }
        self.records.push(record);
    }
}

/// Counters describing how a job ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub total_images: usize,
    pub signaled_images: usize,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub edges_found: usize,
    /// Strategy the similarity phase actually used.
    pub strategy: String,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

/// Final report for one detection job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub groups: Vec<DuplicateGroup>,
    /// True when the embedding strategy fell back to hashing.
    pub degraded: bool,
    pub per_image_errors: Vec<ImageFailure>,
    pub action_summary: ActionSummary,
    pub stats: JobStats,
}

impl JobResult {
    /// Images that belong to some duplicate group.
    pub fn grouped_image_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(id: &str, algorithm: HashAlgorithm, bits: Vec<u8>, bit_len: usize) -> HashSignature {
        HashSignature {
            image_id: id.to_string(),
            algorithm,
            bits,
            bit_len,
        }
    }

    #[test]
    fn edge_orders_pair_canonically() {
        let forward = SimilarityEdge::new("a.png", "b.png", 0.95, SignalMethod::Hash);
        let reversed = SimilarityEdge::new("b.png", "a.png", 0.95, SignalMethod::Hash);

        assert_eq!(forward.first, "a.png");
        assert_eq!(forward.second, "b.png");
        assert_eq!(forward.key(), reversed.key());
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a = sig("a", HashAlgorithm::Average, vec![0b1111_0000], 8);
        let b = sig("b", HashAlgorithm::Average, vec![0b0000_1111], 8);
        assert_eq!(a.hamming_distance(&b), Some(8));

        let c = sig("c", HashAlgorithm::Average, vec![0b1111_0000], 8);
        assert_eq!(a.hamming_distance(&c), Some(0));
    }

    #[test]
    fn signatures_from_different_algorithms_are_incomparable() {
        let a = sig("a", HashAlgorithm::Average, vec![0xFF], 8);
        let b = sig("b", HashAlgorithm::Content, vec![0xFF], 8);
        assert_eq!(a.hamming_distance(&b), None);
        assert_eq!(a.similarity(&b), None);
    }

    #[test]
    fn similarity_is_one_minus_normalized_distance() {
        let a = sig("a", HashAlgorithm::Average, vec![0b1010_1010], 8);
        let b = sig("b", HashAlgorithm::Average, vec![0b1010_1000], 8);

        let sim = a.similarity(&b).expect("comparable signatures");
        assert!((sim - 0.875).abs() < 1e-9);

        let identical = a.similarity(&a).expect("comparable signatures");
        assert!((identical - 1.0).abs() < 1e-9);
    }

    #[test]
    fn record_state_transitions() {
        let mut record = ImageRecord::pending("img-1");
        assert_eq!(record.state, RecordState::Pending);

        record.mark_loaded();
        assert_eq!(record.state, RecordState::Loaded);
        assert!(record.failure.is_none());

        record.mark_failed("decode failed");
        assert_eq!(record.state, RecordState::Failed);
        assert_eq!(record.failure.as_deref(), Some("decode failed"));
    }

    #[test]
    fn action_summary_tracks_outcomes() {
        let mut summary = ActionSummary::default();
        summary.push(ActionRecord {
            id: "a".into(),
            outcome: ActionOutcome::Applied,
            destination: None,
            error: None,
        });
        summary.push(ActionRecord {
            id: "b".into(),
            outcome: ActionOutcome::Skipped,
            destination: None,
            error: None,
        });

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.records.len(), 2);
    }

    #[test]
    fn bundle_lookup_by_algorithm() {
        let bundle = HashBundle {
            image_id: "img".into(),
            signatures: vec![
                sig("img", HashAlgorithm::Content, vec![0xAB], 8),
                sig("img", HashAlgorithm::Color, vec![0xCD], 8),
            ],
        };

        assert!(bundle.signature(HashAlgorithm::Content).is_some());
        assert!(bundle.signature(HashAlgorithm::Wavelet).is_none());
    }
}
