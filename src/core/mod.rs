//! Core functionality module
//!
//! Shared building blocks for the dedup pipeline: configuration management,
//! the error taxonomy, and media file classification/enumeration.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and the per-run `VideoSettings` snapshot
//! - `error` - Error types and result aliases
//! - `media` - Media file classification and the filesystem walk

pub mod config;
pub mod error;
pub mod media;
