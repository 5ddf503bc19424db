//! Perceptual hash computation.
//!
//! Three of the five algorithms (content, average, edge-difference) ride on
//! `image_hasher`; the wavelet and color hashes are computed directly from
//! the pixel grid. All of them reduce an image to a fixed-width bit string
//! whose Hamming distance tracks visual similarity.

use image::DynamicImage;
use image::imageops::FilterType;
use image_hasher::{HashAlg, Hasher, HasherConfig};

use crate::config::HashConfig;
use crate::types::{HashAlgorithm, HashBundle, HashSignature};

/// Computes the configured hash signatures for one image at a time.
/// Cheap to share across worker threads.
pub struct HashComputer {
    algorithms: Vec<HashAlgorithm>,
    hash_size: u32,
    content: Hasher,
    average: Hasher,
    edge_diff: Hasher,
}

impl HashComputer {
    pub fn new(cfg: &HashConfig) -> Self {
        let size = cfg.hash_size;
        Self {
            algorithms: cfg.algorithms.clone(),
            hash_size: size,
            content: HasherConfig::new()
                .hash_size(size, size)
                .preproc_dct()
                .hash_alg(HashAlg::Mean)
                .to_hasher(),
            average: HasherConfig::new()
                .hash_size(size, size)
                .hash_alg(HashAlg::Mean)
                .to_hasher(),
            edge_diff: HasherConfig::new()
                .hash_size(size, size)
                .hash_alg(HashAlg::Gradient)
                .to_hasher(),
        }
    }

    pub fn algorithms(&self) -> &[HashAlgorithm] {
        &self.algorithms
    }

    /// Compute every configured signature for `image`.
    pub fn compute(&self, id: &str, image: &DynamicImage) -> HashBundle {
        let signatures = self
            .algorithms
            .iter()
            .map(|&algorithm| self.signature(id, image, algorithm))
            .collect();
        HashBundle {
            image_id: id.to_string(),
            signatures,
        }
    }

    fn signature(&self, id: &str, image: &DynamicImage, algorithm: HashAlgorithm) -> HashSignature {
        let grid_bits = (self.hash_size * self.hash_size) as usize;
        let (bits, bit_len) = match algorithm {
            HashAlgorithm::Content => (self.content.hash_image(image).as_bytes().to_vec(), grid_bits),
            HashAlgorithm::Average => (self.average.hash_image(image).as_bytes().to_vec(), grid_bits),
            HashAlgorithm::EdgeDiff => (
                self.edge_diff.hash_image(image).as_bytes().to_vec(),
                grid_bits,
            ),
            HashAlgorithm::Wavelet => wavelet_hash(image, self.hash_size),
            HashAlgorithm::Color => color_hash(image, self.hash_size),
        };
        HashSignature {
            image_id: id.to_string(),
            algorithm,
            bits,
            bit_len,
        }
    }
}

/// Haar-wavelet hash: three rounds of 2x2 averaging take the image down to
/// the low-frequency band, then each coefficient is thresholded against
/// the band median.
fn wavelet_hash(image: &DynamicImage, hash_size: u32) -> (Vec<u8>, usize) {
    const LEVELS: u32 = 3;
    let base = hash_size << LEVELS;
    let gray = image
        .resize_exact(base, base, FilterType::Triangle)
        .to_luma8();

    let mut grid: Vec<f32> = gray.pixels().map(|p| f32::from(p.0[0])).collect();
    let mut side = base as usize;
    for _ in 0..LEVELS {
        let next = side / 2;
        let mut reduced = vec![0.0f32; next * next];
        for y in 0..next {
            for x in 0..next {
                let a = grid[(2 * y) * side + 2 * x];
                let b = grid[(2 * y) * side + 2 * x + 1];
                let c = grid[(2 * y + 1) * side + 2 * x];
                let d = grid[(2 * y + 1) * side + 2 * x + 1];
                reduced[y * next + x] = (a + b + c + d) * 0.25;
            }
        }
        grid = reduced;
        side = next;
    }

    let mut sorted = grid.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[sorted.len() / 2];

    let bits: Vec<bool> = grid.iter().map(|&v| v > median).collect();
    (pack_bits(&bits), bits.len())
}

/// Color distribution hash: each channel of the downscaled image is
/// thresholded against that channel's mean. Bit order is channel-major.
fn color_hash(image: &DynamicImage, hash_size: u32) -> (Vec<u8>, usize) {
    let rgb = image
        .resize_exact(hash_size, hash_size, FilterType::Triangle)
        .to_rgb8();
    let count = (hash_size * hash_size) as f32;

    let mut sums = [0.0f32; 3];
    for p in rgb.pixels() {
        for (c, sum) in sums.iter_mut().enumerate() {
            *sum += f32::from(p.0[c]);
        }
    }
    let means = [sums[0] / count, sums[1] / count, sums[2] / count];

    let mut bits = Vec::with_capacity(3 * count as usize);
    for (c, mean) in means.iter().enumerate() {
        for p in rgb.pixels() {
            bits.push(f32::from(p.0[c]) > *mean);
        }
    }
    (pack_bits(&bits), bits.len())
}

/// Pack bits into bytes, most significant bit first. Trailing pad bits
/// stay zero so packed signatures of equal width XOR cleanly.
fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}
