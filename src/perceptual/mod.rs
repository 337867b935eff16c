//! Perceptual Fingerprint Engine
//!
//! 64-bit perceptual fingerprints for images, plus the frame-level
//! average-hash used by the video tier. Image fingerprints come from a
//! DCT-preprocessed (frequency-domain) hash, tolerant of recompression and
//! resizing; similarity is Hamming distance over the 64-bit vector.
//!
//! Matching is an append-only table compared O(n²) over the image subset.
//! That quadratic pass is a documented scaling limit, accepted because
//! per-folder image counts are modest; it is not silently optimized away.
//!
//! Average-hash tie behavior: a pixel is a 1-bit only when strictly greater
//! than the grid mean, so a constant image hashes to all-zero bits. Two
//! flat-color frames (letterbox bars, fades) therefore compare at distance
//! 0, deterministically.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageReader};
use image_hasher::{HasherConfig, ImageHash};
use log::{debug, trace};
use std::path::{Path, PathBuf};

/// Number of bits in a fingerprint
pub const FINGERPRINT_BITS: u32 = 64;

/// Side of the down-sampled grid used by the average-hash
const AVERAGE_HASH_GRID: u32 = 8;

/// Side of the thumbnail used for frame difference measurement
const DIFF_GRID: u32 = 64;

/// A 64-bit perceptual fingerprint
pub type PerceptualFingerprint = u64;

/// Compute the DCT-based fingerprint of an image file.
///
/// Returns `None` on undecodable input; the failure is logged and the file
/// is skipped without aborting the batch.
pub fn fingerprint_file(path: &Path) -> Option<PerceptualFingerprint> {
    let image = match ImageReader::open(path) {
        Ok(reader) => match reader.decode() {
            Ok(image) => image,
            Err(e) => {
                debug!("skipping undecodable image '{}': {}", path.display(), e);
                return None;
            }
        },
        Err(e) => {
            debug!("skipping unreadable image '{}': {}", path.display(), e);
            return None;
        }
    };
    Some(fingerprint_image(&image))
}

/// Compute the DCT-based fingerprint of an already-decoded image.
pub fn fingerprint_image(image: &DynamicImage) -> PerceptualFingerprint {
    let hasher = HasherConfig::new()
        .hash_size(AVERAGE_HASH_GRID, AVERAGE_HASH_GRID)
        .preproc_dct()
        .to_hasher();
    hash_to_bits(&hasher.hash_image(image))
}

/// Pack an `ImageHash` into a 64-bit fingerprint, big-endian bit order.
fn hash_to_bits(hash: &ImageHash) -> PerceptualFingerprint {
    let mut bits = [0u8; 8];
    for (slot, byte) in bits.iter_mut().zip(hash.as_bytes()) {
        *slot = *byte;
    }
    u64::from_be_bytes(bits)
}

/// Hamming distance between two fingerprints: XOR popcount.
pub fn hamming_distance(a: PerceptualFingerprint, b: PerceptualFingerprint) -> u32 {
    (a ^ b).count_ones()
}

/// Average-hash of a grayscale frame: down-sample to an 8x8 grid and set a
/// bit for every pixel strictly greater than the grid mean.
pub fn average_hash(frame: &GrayImage) -> PerceptualFingerprint {
    let small = image::imageops::resize(frame, AVERAGE_HASH_GRID, AVERAGE_HASH_GRID, FilterType::Triangle);

    let sum: u64 = small.pixels().map(|p| p.0[0] as u64).sum();
    let count = (AVERAGE_HASH_GRID * AVERAGE_HASH_GRID) as u64;
    let mean = sum as f64 / count as f64;

    let mut bits: u64 = 0;
    for pixel in small.pixels() {
        bits <<= 1;
        if (pixel.0[0] as f64) > mean {
            bits |= 1;
        }
    }
    bits
}

/// Mean absolute pixel difference between two frames, both down-sampled to
/// a 64x64 grayscale thumbnail first. Used for scene-change detection.
pub fn mean_frame_difference(a: &GrayImage, b: &GrayImage) -> f64 {
    let small_a = image::imageops::resize(a, DIFF_GRID, DIFF_GRID, FilterType::Triangle);
    let small_b = image::imageops::resize(b, DIFF_GRID, DIFF_GRID, FilterType::Triangle);

    let sum: u64 = small_a
        .pixels()
        .zip(small_b.pixels())
        .map(|(pa, pb)| (pa.0[0] as i32 - pb.0[0] as i32).unsigned_abs() as u64)
        .sum();
    sum as f64 / (DIFF_GRID * DIFF_GRID) as f64
}

/// Append-only table of fingerprints for all images seen in the current
/// scan. Exclusively owned by the thread running the image tier.
#[derive(Debug, Default)]
pub struct FingerprintTable {
    entries: Vec<(PathBuf, PerceptualFingerprint)>,
}

impl FingerprintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `fingerprint` against every previously recorded image and
    /// return all matches under `threshold`. One new image may match
    /// several earlier images; every match is returned.
    pub fn matches_for(
        &self,
        fingerprint: PerceptualFingerprint,
        threshold: u32,
    ) -> Vec<(&Path, u32)> {
        self.entries
            .iter()
            .filter_map(|(path, earlier)| {
                let distance = hamming_distance(fingerprint, *earlier);
                (distance < threshold).then_some((path.as_path(), distance))
            })
            .collect()
    }

    /// Record a fingerprint. Always called, matched or not, so later images
    /// can match against this one too.
    pub fn push(&mut self, path: &Path, fingerprint: PerceptualFingerprint) {
        trace!("fingerprinted '{}' -> {:016x}", path.display(), fingerprint);
        self.entries.push((path.to_path_buf(), fingerprint));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform_frame(value: u8) -> GrayImage {
        GrayImage::from_pixel(8, 8, Luma([value]))
    }

    fn gradient_image() -> DynamicImage {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_hamming_metric_properties() {
        let x = 0xdead_beef_0123_4567u64;
        let y = 0x0bad_cafe_89ab_cdefu64;
        let z = 0u64;

        // d(x, x) = 0
        assert_eq!(hamming_distance(x, x), 0);
        // symmetry
        assert_eq!(hamming_distance(x, y), hamming_distance(y, x));
        // triangle inequality
        assert!(hamming_distance(x, z) <= hamming_distance(x, y) + hamming_distance(y, z));
    }

    #[test]
    fn test_fingerprint_determinism() {
        let image = gradient_image();
        assert_eq!(fingerprint_image(&image), fingerprint_image(&image));
    }

    #[test]
    fn test_fingerprint_self_distance_is_zero() {
        let fp = fingerprint_image(&gradient_image());
        assert_eq!(hamming_distance(fp, fp), 0);
    }

    #[test]
    fn test_uniform_frames_hash_to_all_zero_bits() {
        // Every pixel equals the mean, so no pixel is strictly greater:
        // constant images of any brightness hash identically.
        let dark = average_hash(&uniform_frame(10));
        let bright = average_hash(&uniform_frame(200));

        assert_eq!(dark, 0);
        assert_eq!(bright, 0);
        assert_eq!(hamming_distance(dark, bright), 0);
    }

    #[test]
    fn test_average_hash_half_and_half() {
        // Left half dark, right half bright: exactly the bright half is
        // above the mean.
        let frame = GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 0 } else { 200 }]));
        let bits = average_hash(&frame);
        assert_eq!(bits.count_ones(), 32);
    }

    #[test]
    fn test_mean_frame_difference() {
        let a = uniform_frame(10);
        let b = uniform_frame(60);
        let diff = mean_frame_difference(&a, &b);
        assert!((diff - 50.0).abs() < 1.0);
        assert!(mean_frame_difference(&a, &a) < f64::EPSILON);
    }

    #[test]
    fn test_table_reports_all_matches_but_not_distant_ones() {
        let fp1 = 0u64;
        let fp2 = 0b11111u64; // distance 5 from fp1
        let fp3 = 0b11111_11111_11111_11111u64; // distance 20 from fp1, 15 from fp2

        let mut table = FingerprintTable::new();
        table.push(Path::new("img1.jpg"), fp1);

        let matches = table.matches_for(fp2, 12);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].1, 5);
        table.push(Path::new("img2.jpg"), fp2);

        assert_eq!(hamming_distance(fp1, fp3), 20);
        assert_eq!(hamming_distance(fp2, fp3), 15);
        let matches = table.matches_for(fp3, 12);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_table_chain_emits_exactly_two_pairs() {
        // image1 ~ image2 and image2 ~ image3, but image1 vs image3 is over
        // the threshold: the table must emit exactly (1,2) and (2,3).
        let fp1 = 0u64;
        let fp2 = 0x1fu64; // 5 bits set -> d(1,2)=5
        let fp3 = fp2 | (0x1fu64 << 20); // 5 fresh bits -> d(2,3)=5, d(1,3)=10
        assert_eq!(hamming_distance(fp1, fp2), 5);
        assert_eq!(hamming_distance(fp2, fp3), 5);
        assert_eq!(hamming_distance(fp1, fp3), 10);

        let threshold = 7;
        let mut table = FingerprintTable::new();
        let mut pairs = Vec::new();

        for (name, fp) in [("img1", fp1), ("img2", fp2), ("img3", fp3)] {
            for (matched, dist) in table.matches_for(fp, threshold) {
                pairs.push((matched.to_path_buf(), PathBuf::from(name), dist));
            }
            table.push(Path::new(name), fp);
        }

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, PathBuf::from("img1"));
        assert_eq!(pairs[0].1, PathBuf::from("img2"));
        assert_eq!(pairs[1].0, PathBuf::from("img2"));
        assert_eq!(pairs[1].1, PathBuf::from("img3"));
    }
}
