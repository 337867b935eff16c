//! Media Dedup Tool Library
//!
//! A library for finding exact and near-duplicate photos and videos in a
//! folder. Byte-exact copies are detected by content hashing and moved
//! aside automatically; visually similar images and videos are queued as
//! pairs in a persistent review session for operator decisions.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error handling, and media file enumeration
//! - [`identity`] - Exact-duplicate detection via streaming SHA-256
//! - [`perceptual`] - 64-bit perceptual fingerprints and Hamming matching
//! - [`video`] - Metadata screening and frame-sampling video comparison
//! - [`pipeline`] - The scan orchestrator and its event stream
//! - [`session`] - The persistent review session and file relocation
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use media_dedup_tool::core::config::Config;
//! use media_dedup_tool::pipeline::Orchestrator;
//! use media_dedup_tool::video::FfmpegSource;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default();
//!     let (events, receiver) = crossbeam_channel::unbounded();
//!     let abort = Arc::new(AtomicBool::new(false));
//!
//!     let mut orchestrator = Orchestrator::new(
//!         "/media/photos",
//!         config,
//!         events,
//!         abort,
//!         Arc::new(FfmpegSource::new()),
//!     );
//!     let session = orchestrator.run()?;
//!     session.save()?;
//!
//!     for event in receiver.try_iter() {
//!         // update progress, collect pairs, ...
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! A scan runs four tiers in order:
//!
//! 1. **Content identity** - every media file is SHA-256 hashed; later
//!    byte-identical copies move into the `certain_duplicates` folder.
//! 2. **Image similarity** - surviving images get a DCT fingerprint and
//!    pair up under a Hamming-distance threshold.
//! 3. **Video screening** - container metadata prunes the pairwise video
//!    space by duration and resolution tolerance.
//! 4. **Video comparison** - surviving pairs are frame-sampled and scored
//!    on a bounded worker pool.
//!
//! Video probing shells out to `ffprobe`/`ffmpeg`; any `VideoSource`
//! implementation can stand in for tests or alternative backends.

pub mod cli;
pub mod core;
pub mod identity;
pub mod perceptual;
pub mod pipeline;
pub mod session;
pub mod video;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
