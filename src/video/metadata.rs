//! Video Metadata Screener
//!
//! Cheap duration/resolution comparison that prunes the O(n²) video-pair
//! space before the expensive fingerprint engine runs. The screener is
//! deliberately permissive: when metadata is missing it keeps the pair,
//! favoring false positives at this stage over silently dropping a real
//! duplicate.

/// Container-level metadata for a video file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    /// Duration in seconds
    pub duration_secs: f64,
    /// Frames per second
    pub fps: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl VideoMetadata {
    /// Basic validity: unreadable/corrupt videos report zero or negative
    /// duration or fps and are excluded from the candidate pool entirely.
    pub fn is_valid(&self) -> bool {
        self.duration_secs > 0.0 && self.fps > 0.0
    }
}

/// Relative difference between two positive quantities: |a-b| / max(a,b).
fn relative_difference(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.max(b)
}

/// Decide whether two videos are worth a detailed fingerprint comparison.
///
/// Missing metadata (`None`, or zero duration/resolution inside a present
/// record) keeps the pair as a candidate. Otherwise the pair is rejected
/// when the relative duration difference exceeds `duration_tol`, or the
/// relative width or height difference exceeds `res_tol`.
pub fn is_candidate(
    a: Option<&VideoMetadata>,
    b: Option<&VideoMetadata>,
    duration_tol: f64,
    res_tol: f64,
) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return true;
    };

    if a.duration_secs > 0.0 && b.duration_secs > 0.0 {
        if relative_difference(a.duration_secs, b.duration_secs) > duration_tol {
            return false;
        }
    }

    if a.width > 0 && b.width > 0 {
        if relative_difference(a.width as f64, b.width as f64) > res_tol {
            return false;
        }
        if relative_difference(a.height as f64, b.height as f64) > res_tol {
            return false;
        }
    }

    true
}
