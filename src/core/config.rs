//! Configuration module for the media dedup tool
//!
//! The main configuration is a TOML file in a standard location:
//! - Windows: %APPDATA%\media_dedup_tool\config.toml
//! - Linux/macOS: ~/.config/media_dedup_tool/config.toml
//!
//! Video comparison settings additionally persist as a flat key/value JSON
//! file (`video_settings.json`) next to the TOML config, so they survive
//! between runs and can be replaced wholesale without touching the rest of
//! the configuration. A `VideoSettings` snapshot is immutable for the
//! duration of a scan.

use crate::core::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for the config directory
const APP_NAME: &str = "media_dedup_tool";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// File name for the persisted video settings
pub const VIDEO_SETTINGS_FILE_NAME: &str = "video_settings.json";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME))
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config").join(APP_NAME))
    }
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output folder naming
    pub output: OutputConfig,

    /// Image tier settings
    pub images: ImageConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Video tier settings
    pub video: VideoSettings,
}

/// Names of the folders the pipeline moves files into, created inside the
/// scan root. Both are excluded from enumeration on later scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination for byte-exact duplicates found by the identity tier
    pub certain_duplicates_dir: String,

    /// Destination for files discarded by operator decisions at finalize
    pub resolved_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            certain_duplicates_dir: "certain_duplicates".to_string(),
            resolved_dir: "resolved".to_string(),
        }
    }
}

/// Image tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Maximum Hamming distance (out of 64 bits) for two image fingerprints
    /// to be reported as a pair
    pub phash_threshold: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { phash_threshold: 12 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Whether to also log to a file
    pub log_to_file: bool,

    /// Path to the log file
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("media_dedup.log"),
        }
    }
}

/// Immutable-per-run video comparison settings.
///
/// Loaded at process start, possibly replaced wholesale between runs, never
/// mutated mid-scan. Absent keys fall back to the documented defaults and
/// out-of-range values are clamped on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoSettings {
    /// Relative duration tolerance for the metadata screener (0.0–1.0)
    pub duration_tol: f64,

    /// Relative width/height tolerance for the metadata screener (0.0–1.0)
    pub res_tol: f64,

    /// Minimum comparison score for a pair to be reported (0.0–1.0)
    pub score_threshold: f64,

    /// Worker pool size for parallel comparisons (1–64)
    pub max_workers: usize,

    /// Mean pixel-difference sensitivity for scene-change detection (0–255)
    pub scene_threshold: f64,

    /// Per-frame Hamming threshold for a sample to count as matched (0–64)
    pub match_hamming_thresh: u32,

    /// Fraction of matched samples for a pair to classify as similar (0.0–1.0)
    pub match_ratio_thresh: f64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            duration_tol: 0.02,
            res_tol: 0.05,
            score_threshold: 0.6,
            max_workers: default_worker_count(),
            scene_threshold: 30.0,
            match_hamming_thresh: 10,
            match_ratio_thresh: 0.6,
        }
    }
}

/// Default worker count: available CPU parallelism clamped to [1, 32].
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(1, 32)
}

impl VideoSettings {
    /// Clamp every field to its documented range.
    pub fn clamped(mut self) -> Self {
        self.duration_tol = self.duration_tol.clamp(0.0, 1.0);
        self.res_tol = self.res_tol.clamp(0.0, 1.0);
        self.score_threshold = self.score_threshold.clamp(0.0, 1.0);
        self.max_workers = self.max_workers.clamp(1, 64);
        self.scene_threshold = self.scene_threshold.clamp(0.0, 255.0);
        self.match_hamming_thresh = self.match_hamming_thresh.min(64);
        self.match_ratio_thresh = self.match_ratio_thresh.clamp(0.0, 1.0);
        self
    }

    /// Load settings from a flat JSON file, falling back to defaults for
    /// absent keys and clamping out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("cannot read '{}': {}", path.display(), e)))?;
        let settings: VideoSettings = serde_json::from_str(&json)
            .map_err(|e| ScanError::Config(format!("cannot parse '{}': {}", path.display(), e)))?;
        Ok(settings.clamped())
    }

    /// Load from the standard location, or defaults if no file exists.
    pub fn load_default() -> Self {
        get_config_dir()
            .map(|dir| dir.join(VIDEO_SETTINGS_FILE_NAME))
            .filter(|p| p.exists())
            .and_then(|p| Self::load(&p).ok())
            .unwrap_or_default()
    }

    /// Persist settings as a flat JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScanError::Config(format!("cannot create '{}': {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Config(format!("cannot serialize settings: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| ScanError::Config(format!("cannot write '{}': {}", path.display(), e)))?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("cannot read '{}': {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ScanError::Config(format!("cannot parse '{}': {}", path.display(), e)))?;
        config.video = config.video.clamped();
        Ok(config)
    }

    /// Load from the standard location, or defaults if no file exists.
    /// The persisted video settings file, if present, overrides the TOML
    /// `[video]` section.
    pub fn load_default() -> Self {
        let mut config = get_config_path()
            .filter(|p| p.exists())
            .and_then(|p| Self::load(&p).ok())
            .unwrap_or_default();
        if let Some(dir) = get_config_dir() {
            let settings_path = dir.join(VIDEO_SETTINGS_FILE_NAME);
            if settings_path.exists() {
                if let Ok(settings) = VideoSettings::load(&settings_path) {
                    config.video = settings;
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_settings_defaults() {
        let s = VideoSettings::default();
        assert!((s.duration_tol - 0.02).abs() < f64::EPSILON);
        assert!((s.res_tol - 0.05).abs() < f64::EPSILON);
        assert!((s.score_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(s.match_hamming_thresh, 10);
        assert!((1..=32).contains(&s.max_workers));
    }

    #[test]
    fn test_clamping() {
        let s = VideoSettings {
            duration_tol: 3.0,
            res_tol: -1.0,
            score_threshold: 2.0,
            max_workers: 500,
            scene_threshold: 400.0,
            match_hamming_thresh: 100,
            match_ratio_thresh: -0.5,
        }
        .clamped();

        assert_eq!(s.duration_tol, 1.0);
        assert_eq!(s.res_tol, 0.0);
        assert_eq!(s.score_threshold, 1.0);
        assert_eq!(s.max_workers, 64);
        assert_eq!(s.scene_threshold, 255.0);
        assert_eq!(s.match_hamming_thresh, 64);
        assert_eq!(s.match_ratio_thresh, 0.0);
    }

    #[test]
    fn test_absent_keys_fall_back_to_defaults() {
        let partial: VideoSettings = serde_json::from_str(r#"{"duration_tol": 0.1}"#).unwrap();
        assert!((partial.duration_tol - 0.1).abs() < f64::EPSILON);
        assert!((partial.res_tol - 0.05).abs() < f64::EPSILON);
        assert_eq!(partial.match_hamming_thresh, 10);
    }

    #[test]
    fn test_video_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video_settings.json");

        let mut settings = VideoSettings::default();
        settings.duration_tol = 0.15;
        settings.match_hamming_thresh = 20;
        settings.save(&path).unwrap();

        let loaded = VideoSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.video, config.video);
        assert_eq!(
            parsed.output.certain_duplicates_dir,
            config.output.certain_duplicates_dir
        );
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.images.phash_threshold, 12);
        assert_eq!(parsed.output.resolved_dir, "resolved");
    }
}
