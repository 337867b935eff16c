//! Session store
//!
//! The session is the only persisted state: the ordered list of pairs
//! awaiting (or holding) operator decisions, the auto-resolved exact
//! duplicates, and the scanned root. It serializes to a flat record list
//! so a scan can be paused and resumed; loading restores decisions
//! verbatim and does not re-validate that the files still exist.

use crate::core::error::{Result, ScanError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod moves;

/// File name of the persisted session inside the scan root
pub const SESSION_FILE_NAME: &str = "dedup_session.json";

/// Operator decision on a reviewed pair.
///
/// A closed five-case enum; decisions are never represented as free-form
/// strings anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "KEEP_A")]
    KeepA,
    #[serde(rename = "KEEP_B")]
    KeepB,
    #[serde(rename = "DISCARD_BOTH")]
    DiscardBoth,
    #[serde(rename = "DIFFERENT")]
    Different,
}

/// An unordered pair of media paths with a similarity score and the
/// operator's decision. Image-tier pairs carry the Hamming distance as the
/// score; video-tier pairs carry `round(score * 100)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    /// Similarity score on the 0–100 integer scale
    pub score: u32,
    pub decision: Decision,
}

impl MediaPair {
    pub fn new(file_a: impl Into<PathBuf>, file_b: impl Into<PathBuf>, score: u32) -> Self {
        Self {
            file_a: file_a.into(),
            file_b: file_b.into(),
            score,
            decision: Decision::Pending,
        }
    }

    /// Apply a decision. Re-applying the pair's current decision resets it
    /// to `Pending` - the deliberate "undo" affordance.
    pub fn apply(&mut self, decision: Decision) {
        self.decision = if self.decision == decision {
            Decision::Pending
        } else {
            decision
        };
    }

    /// Files this pair's decision discards at finalize time.
    /// `Different` and `Pending` discard nothing.
    pub fn discards(&self) -> Vec<&Path> {
        match self.decision {
            Decision::KeepA => vec![self.file_b.as_path()],
            Decision::KeepB => vec![self.file_a.as_path()],
            Decision::DiscardBoth => vec![self.file_a.as_path(), self.file_b.as_path()],
            Decision::Pending | Decision::Different => Vec::new(),
        }
    }
}

/// Result of the Content Identity Filter: the kept first-seen file and the
/// byte-identical later file that was moved aside. Always terminal; no
/// operator review needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoDuplicateRecord {
    pub kept: PathBuf,
    pub moved: PathBuf,
}

/// Decision tag as persisted in a session record: either a reviewed-pair
/// decision or the terminal exact-duplicate marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum RecordTag {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "KEEP_A")]
    KeepA,
    #[serde(rename = "KEEP_B")]
    KeepB,
    #[serde(rename = "DISCARD_BOTH")]
    DiscardBoth,
    #[serde(rename = "DIFFERENT")]
    Different,
    #[serde(rename = "EXACT_DUPLICATE")]
    ExactDuplicate,
}

impl From<Decision> for RecordTag {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Pending => RecordTag::Pending,
            Decision::KeepA => RecordTag::KeepA,
            Decision::KeepB => RecordTag::KeepB,
            Decision::DiscardBoth => RecordTag::DiscardBoth,
            Decision::Different => RecordTag::Different,
        }
    }
}

impl RecordTag {
    fn as_decision(self) -> Option<Decision> {
        match self {
            RecordTag::Pending => Some(Decision::Pending),
            RecordTag::KeepA => Some(Decision::KeepA),
            RecordTag::KeepB => Some(Decision::KeepB),
            RecordTag::DiscardBoth => Some(Decision::DiscardBoth),
            RecordTag::Different => Some(Decision::Different),
            RecordTag::ExactDuplicate => None,
        }
    }
}

/// One entry of the flat on-disk record list
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    file_a: PathBuf,
    file_b: PathBuf,
    score: u32,
    decision: RecordTag,
}

/// What finalize should do after saving the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeAction {
    SaveOnly,
    SaveAndMove,
}

/// Outcome of a finalize pass
#[derive(Debug, Default, Clone, Copy)]
pub struct FinalizeSummary {
    /// Files relocated into the resolved folder
    pub moved: usize,
    /// Discard targets that no longer existed on disk
    pub missing: usize,
}

/// A full analysis session: reviewed pairs in arrival order plus the
/// auto-resolved exact duplicates, rooted at the scanned folder.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub root: PathBuf,
    pub pairs: Vec<MediaPair>,
    pub auto_duplicates: Vec<AutoDuplicateRecord>,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pairs: Vec::new(),
            auto_duplicates: Vec::new(),
        }
    }

    /// Path of the session file for a given scan root.
    pub fn file_path(root: &Path) -> PathBuf {
        root.join(SESSION_FILE_NAME)
    }

    /// Whether a persisted session exists under `root`.
    pub fn exists(root: &Path) -> bool {
        Self::file_path(root).exists()
    }

    /// Number of pairs with a non-pending decision.
    pub fn decided_count(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.decision != Decision::Pending)
            .count()
    }

    /// Serialize the session as a flat record list: auto-duplicates first,
    /// then reviewed pairs in arrival order.
    pub fn save(&self) -> Result<()> {
        let mut records: Vec<SessionRecord> = self
            .auto_duplicates
            .iter()
            .map(|auto| SessionRecord {
                file_a: auto.kept.clone(),
                file_b: auto.moved.clone(),
                score: 100,
                decision: RecordTag::ExactDuplicate,
            })
            .collect();
        records.extend(self.pairs.iter().map(|pair| SessionRecord {
            file_a: pair.file_a.clone(),
            file_b: pair.file_b.clone(),
            score: pair.score,
            decision: pair.decision.into(),
        }));

        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| ScanError::Session(e.to_string()))?;
        fs::write(Self::file_path(&self.root), json).map_err(|e| {
            ScanError::Session(format!("cannot write session for '{}': {}", self.root.display(), e))
        })?;

        info!(
            "session saved: {} pairs, {} auto-duplicates",
            self.pairs.len(),
            self.auto_duplicates.len()
        );
        Ok(())
    }

    /// Reconstruct a session from the flat record list. Decisions are
    /// restored verbatim; files are not re-validated.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::file_path(root);
        let json = fs::read_to_string(&path)
            .map_err(|e| ScanError::Session(format!("cannot read '{}': {}", path.display(), e)))?;
        let records: Vec<SessionRecord> = serde_json::from_str(&json)
            .map_err(|e| ScanError::Session(format!("cannot parse '{}': {}", path.display(), e)))?;

        let mut session = Session::new(root);
        for record in records {
            match record.decision.as_decision() {
                Some(decision) => session.pairs.push(MediaPair {
                    file_a: record.file_a,
                    file_b: record.file_b,
                    score: record.score,
                    decision,
                }),
                None => session.auto_duplicates.push(AutoDuplicateRecord {
                    kept: record.file_a,
                    moved: record.file_b,
                }),
            }
        }
        Ok(session)
    }

    /// Save the session and, for `SaveAndMove`, relocate every discarded
    /// file into the resolved folder. Discard targets that disappeared in
    /// the meantime are counted and logged, not treated as errors.
    pub fn finalize(&self, action: FinalizeAction, resolved_dir: &str) -> Result<FinalizeSummary> {
        self.save()?;

        let mut summary = FinalizeSummary::default();
        if action == FinalizeAction::SaveOnly {
            return Ok(summary);
        }

        let dest_dir = self.root.join(resolved_dir);
        for pair in &self.pairs {
            for path in pair.discards() {
                if !path.exists() {
                    warn!("finalize: '{}' no longer exists, skipping", path.display());
                    summary.missing += 1;
                    continue;
                }
                let dest = moves::relocate(path, &dest_dir)?;
                info!("finalize: moved '{}' -> '{}'", path.display(), dest.display());
                summary.moved += 1;
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_decision_toggle_is_idempotent() {
        let mut pair = MediaPair::new("/m/a.jpg", "/m/b.jpg", 5);
        assert_eq!(pair.decision, Decision::Pending);

        pair.apply(Decision::KeepA);
        assert_eq!(pair.decision, Decision::KeepA);

        // Same decision again: back to pending
        pair.apply(Decision::KeepA);
        assert_eq!(pair.decision, Decision::Pending);

        // Different decision replaces, not toggles
        pair.apply(Decision::KeepB);
        pair.apply(Decision::DiscardBoth);
        assert_eq!(pair.decision, Decision::DiscardBoth);
    }

    #[test]
    fn test_discards_per_decision() {
        let mut pair = MediaPair::new("/m/a.jpg", "/m/b.jpg", 5);
        assert!(pair.discards().is_empty());

        pair.decision = Decision::KeepA;
        assert_eq!(pair.discards(), vec![Path::new("/m/b.jpg")]);

        pair.decision = Decision::KeepB;
        assert_eq!(pair.discards(), vec![Path::new("/m/a.jpg")]);

        pair.decision = Decision::DiscardBoth;
        assert_eq!(pair.discards().len(), 2);

        pair.decision = Decision::Different;
        assert!(pair.discards().is_empty());
    }

    #[test]
    fn test_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path());

        let mut pair1 = MediaPair::new("/m/a.jpg", "/m/b.jpg", 5);
        pair1.apply(Decision::KeepA);
        let mut pair2 = MediaPair::new("/m/c.mp4", "/m/d.mp4", 80);
        pair2.apply(Decision::Different);
        let pair3 = MediaPair::new("/m/e.jpg", "/m/f.jpg", 11);
        session.pairs = vec![pair1.clone(), pair2.clone(), pair3.clone()];

        session.auto_duplicates = vec![
            AutoDuplicateRecord {
                kept: PathBuf::from("/m/x.jpg"),
                moved: PathBuf::from("/m/dup/x.jpg"),
            },
            AutoDuplicateRecord {
                kept: PathBuf::from("/m/y.mp4"),
                moved: PathBuf::from("/m/dup/y.mp4"),
            },
        ];

        session.save().unwrap();
        let loaded = Session::load(dir.path()).unwrap();

        // Reviewed pairs are order-preserving
        assert_eq!(loaded.pairs, vec![pair1, pair2, pair3]);

        // Auto-duplicates are order-insensitive
        let expected: HashSet<_> = session
            .auto_duplicates
            .iter()
            .map(|a| (a.kept.clone(), a.moved.clone()))
            .collect();
        let actual: HashSet<_> = loaded
            .auto_duplicates
            .iter()
            .map(|a| (a.kept.clone(), a.moved.clone()))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_decided_count() {
        let mut session = Session::new("/m");
        session.pairs = vec![
            MediaPair::new("/m/a.jpg", "/m/b.jpg", 5),
            MediaPair::new("/m/c.jpg", "/m/d.jpg", 7),
        ];
        assert_eq!(session.decided_count(), 0);
        session.pairs[0].apply(Decision::KeepA);
        assert_eq!(session.decided_count(), 1);
    }

    #[test]
    fn test_finalize_moves_discarded_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let a = root.join("a.jpg");
        let b = root.join("b.jpg");
        let c = root.join("c.jpg");
        let d = root.join("d.jpg");
        for path in [&a, &b, &c, &d] {
            fs::write(path, b"x").unwrap();
        }

        let mut session = Session::new(root);
        let mut keep_a = MediaPair::new(&a, &b, 3);
        keep_a.apply(Decision::KeepA); // discards b
        let mut different = MediaPair::new(&c, &d, 9);
        different.apply(Decision::Different); // discards nothing
        session.pairs = vec![keep_a, different];

        let summary = session
            .finalize(FinalizeAction::SaveAndMove, "resolved")
            .unwrap();

        assert_eq!(summary.moved, 1);
        assert_eq!(summary.missing, 0);
        assert!(a.exists());
        assert!(!b.exists());
        assert!(root.join("resolved").join("b.jpg").exists());
        assert!(c.exists() && d.exists());
        assert!(Session::exists(root));
    }

    #[test]
    fn test_finalize_save_only_moves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();

        let mut session = Session::new(dir.path());
        let mut pair = MediaPair::new(&a, &b, 3);
        pair.apply(Decision::DiscardBoth);
        session.pairs = vec![pair];

        let summary = session.finalize(FinalizeAction::SaveOnly, "resolved").unwrap();
        assert_eq!(summary.moved, 0);
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn test_finalize_counts_missing_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path());
        let mut pair = MediaPair::new(dir.path().join("ghost.jpg"), dir.path().join("also.jpg"), 3);
        pair.apply(Decision::DiscardBoth);
        session.pairs = vec![pair];

        let summary = session
            .finalize(FinalizeAction::SaveAndMove, "resolved")
            .unwrap();
        assert_eq!(summary.moved, 0);
        assert_eq!(summary.missing, 2);
    }
}
