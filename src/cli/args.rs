//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use crate::session::Decision;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Find duplicate and near-duplicate photos and videos in a folder
#[derive(Parser, Debug)]
#[command(name = "media-dedup")]
#[command(version = "1.0.0")]
#[command(
    about = "Find exact and near-duplicate photos and videos in a media folder",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a folder for duplicates and build a review session
    Scan {
        /// Folder to scan
        path: PathBuf,

        /// Worker pool size for video comparisons (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Minimum video similarity score to report, 0.0-1.0 (overrides config)
        #[arg(long)]
        score_threshold: Option<f64>,

        /// Maximum Hamming distance for image pairs (overrides config)
        #[arg(long)]
        phash_threshold: Option<u32>,

        /// Rescan without asking, even if a previous session exists
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Compare two video files and print the detailed report as JSON
    Compare {
        /// First video
        a: PathBuf,

        /// Second video
        b: PathBuf,
    },

    /// Inspect and act on a saved review session
    Session {
        #[command(subcommand)]
        session_command: SessionCommands,
    },

    /// Open or reset the configuration file
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\media_dedup_tool\config.toml
    /// - Linux/macOS: ~/.config/media_dedup_tool/config.toml
    Config {
        /// Show the config file path without doing anything else
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Show current configuration
    ShowConfig,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List every pair and auto-resolved duplicate in the session
    Show {
        /// Scanned folder holding the session
        path: PathBuf,
    },

    /// Record a decision on a pair; repeating the same decision resets it
    Decide {
        /// Scanned folder holding the session
        path: PathBuf,

        /// Pair index as printed by `session show`
        index: usize,

        /// Decision to apply
        decision: DecisionArg,
    },

    /// Manually add a pair to the session for later review
    AddPair {
        /// Scanned folder holding the session
        path: PathBuf,

        /// First file of the pair
        file_a: PathBuf,

        /// Second file of the pair
        file_b: PathBuf,

        /// Similarity score on the 0-100 scale
        #[arg(short, long, default_value = "0")]
        score: u32,
    },

    /// Save the session and optionally move discarded files aside
    Finalize {
        /// Scanned folder holding the session
        path: PathBuf,

        /// Also move every discarded file into the resolved folder
        #[arg(long)]
        move_files: bool,

        /// Skip the confirmation prompt before moving files
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// CLI-facing spelling of a pair decision
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DecisionArg {
    KeepA,
    KeepB,
    DiscardBoth,
    Different,
    Pending,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::KeepA => Decision::KeepA,
            DecisionArg::KeepB => Decision::KeepB,
            DecisionArg::DiscardBoth => Decision::DiscardBoth,
            DecisionArg::Different => Decision::Different,
            DecisionArg::Pending => Decision::Pending,
        }
    }
}
