//! Error types for the media dedup pipeline
//!
//! The taxonomy distinguishes per-file failures, which are always non-fatal
//! (skip, log, continue), from the two scan-fatal conditions: a missing scan
//! root and an explicit operator abort.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the dedup pipeline
#[derive(Error, Debug)]
pub enum ScanError {
    /// Permission or I/O failure while reading a file. The file is skipped
    /// and excluded from all further tiers.
    #[error("cannot read '{path}': {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Corrupt or unsupported media that could not be decoded.
    #[error("cannot decode '{path}': {message}")]
    Undecodable { path: PathBuf, message: String },

    /// Zero or negative duration/fps reported for a video. The file is
    /// excluded from the video candidate pool.
    #[error("invalid metadata for '{path}' (duration {duration}s, fps {fps})")]
    InvalidMetadata {
        path: PathBuf,
        duration: f64,
        fps: f64,
    },

    /// A single pair's fingerprint comparison failed. The pair is treated
    /// as "no match"; other pairs continue.
    #[error("comparison of '{a}' vs '{b}' failed: {message}")]
    ComparisonFailure {
        a: PathBuf,
        b: PathBuf,
        message: String,
    },

    /// The scan target is missing. This aborts the scan immediately.
    #[error("scan root not found: '{0}'")]
    RootNotFound(PathBuf),

    /// General I/O error outside of a specific media file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration load/save error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session file load/save error
    #[error("session error: {0}")]
    Session(String),
}

impl ScanError {
    /// Wrap an I/O failure on a specific file as `Unreadable`.
    pub fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScanError::Unreadable {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Wrap a decode failure on a specific file as `Undecodable`.
    pub fn undecodable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScanError::Undecodable {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_path() {
        let err = ScanError::unreadable("/media/clip.mp4", "permission denied");
        assert!(err.to_string().contains("/media/clip.mp4"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_root_not_found_display() {
        let err = ScanError::RootNotFound(PathBuf::from("/missing"));
        assert!(err.to_string().contains("/missing"));
    }
}
