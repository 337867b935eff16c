//! Video Fingerprint Engine
//!
//! Compares two videos by sampling a bounded set of frames, hashing each
//! with the 8x8 average-hash, and scoring the fraction of sample positions
//! whose hashes agree within a Hamming threshold.
//!
//! Sampling strategy depends on the longer of the two durations:
//! - short videos: frames at fixed percent-of-duration positions;
//! - long videos: for each percent anchor, search forward inside a bounded
//!   window for the first real scene change, falling back to the anchor
//!   frame itself. Long static scenes would otherwise anchor every sample
//!   on near-identical frames.
//!
//! A byte-identical pair short-circuits to `duplicate` before any frame is
//! decoded, re-using the Content Identity Filter contract.
//!
//! Per-pair execution is side-effect-free, which is what allows the
//! orchestrator to fan comparisons out over a worker pool.

use crate::core::error::Result;
use crate::identity;
use crate::perceptual::{average_hash, hamming_distance, mean_frame_difference, PerceptualFingerprint};
use crate::video::source::VideoSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Reference percent-of-duration sample positions
pub const DEFAULT_PERCENT_POSITIONS: [u8; 5] = [5, 20, 45, 65, 80];

/// Videos longer than this use scene-anchored sampling
pub const DEFAULT_DURATION_CUTOFF_SECS: f64 = 60.0;

/// Forward search window for a scene change past each percent anchor
const SCENE_SEARCH_WINDOW_SECS: f64 = 3.0;

/// Step between probed frames inside the search window
const SCENE_SEARCH_STEP_SECS: f64 = 0.5;

/// Mapping from percent sample key to the average-hash of the frame
/// sampled there. Only comparable against a fingerprint produced with the
/// same sampling strategy.
pub type VideoFingerprint = BTreeMap<u8, PerceptualFingerprint>;

/// Final classification of a compared pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOutcome {
    /// Byte-identical content
    Duplicate,
    /// Score at or above the match-ratio threshold
    Similar,
    /// Everything else, including pairs with no comparable samples
    Different,
}

/// Per-sample comparison detail
#[derive(Debug, Clone, Serialize)]
pub struct SampleDetail {
    pub percent: u8,
    pub hamming: u32,
    pub matched: bool,
}

/// Result of comparing two videos
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub outcome: ComparisonOutcome,
    /// Fraction of matched samples, 0.0–1.0 (exactly 1.0 for duplicates)
    pub score: f64,
    pub matched: usize,
    pub total: usize,
    pub details: Vec<SampleDetail>,
}

impl ComparisonReport {
    fn duplicate() -> Self {
        Self {
            outcome: ComparisonOutcome::Duplicate,
            score: 1.0,
            matched: 0,
            total: 0,
            details: Vec::new(),
        }
    }
}

/// Stateless comparison engine over a `VideoSource`.
#[derive(Clone)]
pub struct VideoComparer {
    source: Arc<dyn VideoSource>,
    scene_threshold: f64,
    match_hamming_thresh: u32,
}

impl VideoComparer {
    pub fn new(source: Arc<dyn VideoSource>, scene_threshold: f64, match_hamming_thresh: u32) -> Self {
        Self {
            source,
            scene_threshold,
            match_hamming_thresh,
        }
    }

    /// Sample frames at fixed percent-of-duration positions.
    fn percent_fingerprint(
        &self,
        path: &Path,
        duration_secs: f64,
        percents: &[u8],
    ) -> Result<VideoFingerprint> {
        let mut fingerprint = VideoFingerprint::new();
        for &percent in percents {
            let t = (duration_secs * percent as f64 / 100.0).max(0.0);
            if let Some(frame) = self.source.frame_at(path, t)? {
                fingerprint.insert(percent, average_hash(&frame));
            }
        }
        Ok(fingerprint)
    }

    /// For each percent anchor, search forward within a bounded window for
    /// the first frame whose grayscale difference from the previous probed
    /// frame reaches the scene threshold; fall back to the anchor frame if
    /// the window holds no scene change.
    fn scene_anchored_fingerprint(
        &self,
        path: &Path,
        duration_secs: f64,
        percents: &[u8],
    ) -> Result<VideoFingerprint> {
        let mut fingerprint = VideoFingerprint::new();
        for &percent in percents {
            let anchor = (duration_secs * percent as f64 / 100.0).max(0.0);
            let end = (anchor + SCENE_SEARCH_WINDOW_SECS).min(duration_secs);

            let mut prev = self
                .source
                .frame_at(path, (anchor - SCENE_SEARCH_STEP_SECS).max(0.0))?;
            let mut found = false;
            let mut t = anchor;
            while t <= end + 1e-9 {
                let Some(frame) = self.source.frame_at(path, t)? else {
                    t += SCENE_SEARCH_STEP_SECS;
                    continue;
                };
                if let Some(ref previous) = prev {
                    if mean_frame_difference(previous, &frame) >= self.scene_threshold {
                        fingerprint.insert(percent, average_hash(&frame));
                        found = true;
                        break;
                    }
                }
                prev = Some(frame);
                t += SCENE_SEARCH_STEP_SECS;
            }

            if !found {
                if let Some(frame) = self.source.frame_at(path, anchor)? {
                    fingerprint.insert(percent, average_hash(&frame));
                }
            }
        }
        Ok(fingerprint)
    }

    /// Compare two videos and classify the pair.
    pub fn compare(
        &self,
        a: &Path,
        b: &Path,
        percent_positions: &[u8],
        duration_cutoff: f64,
        match_ratio_thresh: f64,
    ) -> Result<ComparisonReport> {
        if identity::files_identical(a, b)? {
            return Ok(ComparisonReport::duplicate());
        }

        let duration_a = self.source.metadata(a)?.duration_secs;
        let duration_b = self.source.metadata(b)?.duration_secs;
        let use_scene = duration_a.max(duration_b) > duration_cutoff;

        let (fa, fb) = if use_scene {
            (
                self.scene_anchored_fingerprint(a, duration_a, percent_positions)?,
                self.scene_anchored_fingerprint(b, duration_b, percent_positions)?,
            )
        } else {
            (
                self.percent_fingerprint(a, duration_a, percent_positions)?,
                self.percent_fingerprint(b, duration_b, percent_positions)?,
            )
        };

        // Keys present in only one fingerprint are ignored; `total` counts
        // positions sampled successfully on both sides.
        let mut matched = 0;
        let mut total = 0;
        let mut details = Vec::new();
        for (percent, hash_a) in &fa {
            let Some(hash_b) = fb.get(percent) else {
                continue;
            };
            total += 1;
            let hamming = hamming_distance(*hash_a, *hash_b);
            let is_match = hamming <= self.match_hamming_thresh;
            if is_match {
                matched += 1;
            }
            details.push(SampleDetail {
                percent: *percent,
                hamming,
                matched: is_match,
            });
        }

        let score = if total > 0 {
            matched as f64 / total as f64
        } else {
            0.0
        };
        let outcome = if score >= match_ratio_thresh {
            ComparisonOutcome::Similar
        } else {
            ComparisonOutcome::Different
        };

        Ok(ComparisonReport {
            outcome,
            score,
            matched,
            total,
            details,
        })
    }
}
