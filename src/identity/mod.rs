//! Content Identity Filter
//!
//! Exact-duplicate detection via full-content SHA-256. Hashing streams the
//! file in bounded chunks so arbitrarily large videos never load into
//! memory. Two files are treated as byte-identical when extension class,
//! size, and full digest all agree; false positives are accepted as
//! practically impossible.
//!
//! A separate bounded-prefix probe digest exists for cheap pre-screening.
//! It reads only the first 64 KiB and is intentionally NOT interchangeable
//! with the full digest: the dedup decision always uses the full-content
//! hash.

use crate::core::error::{Result, ScanError};
use crate::core::media::extension_of;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Buffer size for streaming hash computation (64 KiB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Number of leading bytes covered by the prefix probe digest
const PREFIX_PROBE_BYTES: u64 = 64 * 1024;

/// SHA-256 digest of a file's full byte stream
pub type ContentDigest = [u8; 32];

/// Compute the full-content digest of a file using streaming reads.
pub fn compute_file_digest(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).map_err(|e| ScanError::unreadable(path, e))?;

    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| ScanError::unreadable(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// Compute the fast prefix probe digest: a SHA-256 over at most the first
/// 64 KiB of the file. Cheap for large files, but only a probe - equal
/// prefix digests do not imply identical files.
pub fn compute_prefix_digest(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).map_err(|e| ScanError::unreadable(path, e))?;

    let mut reader = BufReader::new(file).take(PREFIX_PROBE_BYTES);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| ScanError::unreadable(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// Compute the digest of in-memory data. Test-only reference point for the
/// streaming implementations.
#[cfg(test)]
fn compute_data_digest(data: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Check whether two files are byte-identical: same extension class, same
/// size, same full-content digest.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    if extension_of(a) != extension_of(b) {
        return Ok(false);
    }

    let size_a = std::fs::metadata(a)
        .map_err(|e| ScanError::unreadable(a, e))?
        .len();
    let size_b = std::fs::metadata(b)
        .map_err(|e| ScanError::unreadable(b, e))?
        .len();
    if size_a != size_b {
        return Ok(false);
    }

    Ok(compute_file_digest(a)? == compute_file_digest(b)?)
}

/// Convert a digest to a hexadecimal string.
pub fn digest_to_hex(digest: &ContentDigest) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Single-writer mapping from content digest to the first-seen path.
///
/// The identity tier threads exactly one of these through its O(n) pass;
/// it is never shared across threads.
#[derive(Debug, Default)]
pub struct DigestIndex {
    first_seen: HashMap<ContentDigest, PathBuf>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` under `digest`. Returns the first-seen path if this
    /// digest was already present - that earlier file stays in the working
    /// set and the caller is expected to remove `path`.
    pub fn insert(&mut self, digest: ContentDigest, path: &Path) -> Option<&Path> {
        match self.first_seen.entry(digest) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                Some(entry.into_mut().as_path())
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Number of distinct digests seen so far.
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}
