//! Video probing backend
//!
//! `VideoSource` is the seam between the video tiers and the codec layer:
//! container-level metadata (cheap, no frame decoding) and single-frame
//! sampling at a timestamp. The shipped implementation shells out to
//! `ffprobe`/`ffmpeg`; tests substitute a synthetic source.

use crate::core::error::{Result, ScanError};
use crate::video::metadata::VideoMetadata;
use image::GrayImage;
use log::trace;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// Abstraction over video metadata reads and frame sampling.
pub trait VideoSource: Send + Sync {
    /// Read duration, frame rate, and resolution from the container.
    fn metadata(&self, path: &Path) -> Result<VideoMetadata>;

    /// Decode the frame nearest `time_secs` as grayscale. `Ok(None)` means
    /// the position yielded no readable frame; the caller skips the sample.
    fn frame_at(&self, path: &Path, time_secs: f64) -> Result<Option<GrayImage>>;
}

/// `VideoSource` backed by the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    ffprobe_bin: String,
    ffmpeg_bin: String,
}

impl Default for FfmpegSource {
    fn default() -> Self {
        Self {
            ffprobe_bin: "ffprobe".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the binary names, e.g. for bundled or renamed builds.
    pub fn with_binaries(ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ffprobe_bin: ffprobe.into(),
            ffmpeg_bin: ffmpeg.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rational like `"30000/1001"` into frames per second.
fn parse_frame_rate(rate: &str) -> f64 {
    let mut parts = rate.splitn(2, '/');
    let num: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
    let den: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1.0);
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl VideoSource for FfmpegSource {
    fn metadata(&self, path: &Path) -> Result<VideoMetadata> {
        let output = Command::new(&self.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,duration",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| ScanError::unreadable(path, format!("{}: {}", self.ffprobe_bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::undecodable(path, stderr.trim()));
        }

        let probed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScanError::undecodable(path, format!("ffprobe output: {}", e)))?;

        let stream = probed.streams.first();
        let fps = stream
            .and_then(|s| s.r_frame_rate.as_deref())
            .map(parse_frame_rate)
            .unwrap_or(0.0);
        let duration_secs = stream
            .and_then(|s| s.duration.as_deref())
            .or(probed.format.as_ref().and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(VideoMetadata {
            duration_secs,
            fps,
            width: stream.and_then(|s| s.width).unwrap_or(0),
            height: stream.and_then(|s| s.height).unwrap_or(0),
        })
    }

    fn frame_at(&self, path: &Path, time_secs: f64) -> Result<Option<GrayImage>> {
        let output = Command::new(&self.ffmpeg_bin)
            .args(["-v", "error", "-ss", &format!("{:.3}", time_secs.max(0.0)), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .output()
            .map_err(|e| ScanError::unreadable(path, format!("{}: {}", self.ffmpeg_bin, e)))?;

        if !output.status.success() || output.stdout.is_empty() {
            trace!(
                "no frame at {:.2}s in '{}' ({})",
                time_secs,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        match image::load_from_memory(&output.stdout) {
            Ok(frame) => Ok(Some(frame.to_luma8())),
            Err(e) => {
                trace!(
                    "undecodable frame at {:.2}s in '{}': {}",
                    time_secs,
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }
}
