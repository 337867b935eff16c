//! Collision-safe file relocation
//!
//! "Discarding" a file never deletes it: files move into a designated
//! output folder, and a `(1)`, `(2)`, ... suffix before the extension
//! protects against same-named files arriving from different folders.

use crate::core::error::{Result, ScanError};
use std::fs;
use std::path::{Path, PathBuf};

/// First destination inside `dir` for `file_name` that does not exist yet.
pub fn collision_free_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (file_name.to_string(), String::new()),
    };

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}({}){}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move `path` into `dest_dir`, creating the directory if needed and
/// renaming on collision. Falls back to copy-and-remove when a plain
/// rename fails (e.g. across filesystems). Returns the final destination.
pub fn relocate(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(ScanError::Io)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::unreadable(path, "path has no file name"))?;
    let dest = collision_free_destination(dest_dir, file_name);

    if fs::rename(path, &dest).is_err() {
        fs::copy(path, &dest).map_err(|e| ScanError::unreadable(path, e))?;
        fs::remove_file(path).map_err(|e| ScanError::unreadable(path, e))?;
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_suffix_goes_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        fs::write(dir.path().join("photo(1).jpg"), b"x").unwrap();

        let dest = collision_free_destination(dir.path(), "photo.jpg");
        assert_eq!(dest, dir.path().join("photo(2).jpg"));
    }

    #[test]
    fn test_no_collision_keeps_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let dest = collision_free_destination(dir.path(), "clip.mp4");
        assert_eq!(dest, dir.path().join("clip.mp4"));
    }

    #[test]
    fn test_extensionless_names_get_plain_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        let dest = collision_free_destination(dir.path(), "README");
        assert_eq!(dest, dir.path().join("README(1)"));
    }

    #[test]
    fn test_relocate_moves_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.jpg");
        fs::write(&src, b"payload").unwrap();

        let dest_dir = dir.path().join("duplicates");
        fs::create_dir(&dest_dir).unwrap();
        fs::write(dest_dir.join("photo.jpg"), b"earlier").unwrap();

        let dest = relocate(&src, &dest_dir).unwrap();
        assert_eq!(dest, dest_dir.join("photo(1).jpg"));
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_relocate_creates_destination_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("clip.mp4");
        fs::write(&src, b"v").unwrap();

        let dest_dir = dir.path().join("nested").join("resolved");
        let dest = relocate(&src, &dest_dir).unwrap();
        assert!(dest.exists());
        assert!(!src.exists());
    }
}
