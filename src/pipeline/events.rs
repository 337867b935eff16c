//! Scan events
//!
//! The orchestrator runs on its own thread and reports progress through a
//! channel of `ScanEvent`s. The CLI consumes them to drive progress bars
//! and to collect pairs into the session; nothing in the pipeline ever
//! touches the terminal directly.

use crate::session::{AutoDuplicateRecord, MediaPair};
use std::fmt;

/// Pipeline phase, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Exact-content dedup over every media file
    Identity,
    /// Perceptual fingerprinting over the image subset
    Images,
    /// Metadata screening over the video subset
    VideoScreening,
    /// Parallel fingerprint comparison of surviving video pairs
    VideoComparison,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Identity => "exact duplicates",
            Phase::Images => "image similarity",
            Phase::VideoScreening => "video screening",
            Phase::VideoComparison => "video comparison",
        };
        write!(f, "{}", name)
    }
}

/// Counts reported when a scan runs to completion
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    pub total_files: usize,
    pub images: usize,
    pub videos: usize,
    pub auto_duplicates: usize,
    pub pairs_found: usize,
    pub comparisons_run: usize,
}

/// Progress and result messages emitted by a running scan
#[derive(Debug)]
pub enum ScanEvent {
    /// Free-form status line
    Status(String),
    /// Progress within a phase, 0-100. Monotonic per phase.
    PhaseProgress { phase: Phase, percent: u8 },
    /// A phase finished
    PhaseComplete { phase: Phase },
    /// A pair needing operator review was found
    PairFound(MediaPair),
    /// A byte-identical file was moved aside
    AutoDuplicate(AutoDuplicateRecord),
    /// Identity tier summary, emitted once after the first phase
    IdentityReport { total_files: usize, moved: usize },
    /// The scan ran to completion
    Finished(ScanSummary),
    /// The scan could not continue
    Fatal(String),
}
