//! Media file classification and filesystem enumeration
//!
//! A `MediaFile` is ephemeral: it is derived from a single filesystem walk
//! at the start of a scan and never persisted. The walk excludes the
//! pipeline's own output folders so a re-scan does not re-process files it
//! already moved.

use crate::core::error::{Result, ScanError};
use log::trace;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image extensions recognized by the perceptual tier
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif"];

/// Video extensions recognized by the video tiers
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "m4v", "webm"];

/// Extension class of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// A media file discovered by the filesystem walk
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Extension class (image or video)
    pub kind: MediaKind,
    /// File size in bytes
    pub size: u64,
}

/// Lowercased extension of a path, or empty string if none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Classify a path by its extension. Returns `None` for non-media files.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = extension_of(path);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Walk `root` once and collect every media file, pruning the directories
/// named in `excluded_dirs` (the pipeline's output folders) and skipping
/// files named in `excluded_files` (the session file).
///
/// Returns `RootNotFound` if `root` does not exist; unreadable directory
/// entries are skipped silently, matching the walk behavior of the rest of
/// the pipeline (per-file failures are never scan-fatal).
pub fn collect_media_files(
    root: &Path,
    excluded_dirs: &[&str],
    excluded_files: &[&str],
) -> Result<Vec<MediaFile>> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_dir() && excluded_dirs.iter().any(|d| *d == name))
    });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if excluded_files.iter().any(|f| *f == name) {
            continue;
        }

        let Some(kind) = classify(path) else {
            continue;
        };

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                trace!("skipping '{}' (metadata unavailable: {})", path.display(), e);
                continue;
            }
        };

        files.push(MediaFile {
            path: path.to_path_buf(),
            kind,
            size,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify(Path::new("a/photo.JPG")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("a/photo.webp")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("a/clip.mp4")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("a/clip.MOV")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("a/notes.txt")), None);
        assert_eq!(classify(Path::new("a/noext")), None);
    }

    #[test]
    fn test_collect_missing_root_fails() {
        let result = collect_media_files(Path::new("/definitely/not/here"), &[], &[]);
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_collect_excludes_output_dirs_and_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join("b.mp4"), b"x").unwrap();
        fs::write(root.join("readme.txt"), b"x").unwrap();
        fs::write(root.join("dedup_session.json"), b"[]").unwrap();

        let excluded = root.join("certain_duplicates");
        fs::create_dir(&excluded).unwrap();
        fs::write(excluded.join("c.jpg"), b"x").unwrap();

        let nested = root.join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("d.png"), b"x").unwrap();

        let files = collect_media_files(
            root,
            &["certain_duplicates"],
            &["dedup_session.json"],
        )
        .unwrap();

        let mut names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.mp4", "d.png"]);
    }

    #[test]
    fn test_collect_reports_kind_and_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v.mkv"), b"12345").unwrap();

        let files = collect_media_files(dir.path(), &[], &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].kind, MediaKind::Video);
        assert_eq!(files[0].size, 5);
    }
}
