//! Video duplicate detection
//!
//! Two tiers: a cheap metadata screener that prunes the pairwise candidate
//! space, and the frame-sampling fingerprint engine that scores the
//! surviving pairs. Both sit on top of the `VideoSource` seam so the codec
//! backend (ffmpeg tooling) stays swappable and testable.
//!
//! # Submodules
//!
//! - `source` - The `VideoSource` trait and the ffprobe/ffmpeg backend
//! - `metadata` - Container metadata and the candidate screener
//! - `fingerprint` - Frame sampling, average-hash comparison, scoring

pub mod fingerprint;
pub mod metadata;
pub mod source;

pub use fingerprint::{ComparisonOutcome, ComparisonReport, VideoComparer};
pub use metadata::{is_candidate, VideoMetadata};
pub use source::{FfmpegSource, VideoSource};
