//! Scan orchestrator
//!
//! Runs the four analysis tiers in order over one scan root:
//!
//! 1. exact-content dedup (auto-resolves byte-identical files),
//! 2. perceptual image matching,
//! 3. video metadata screening,
//! 4. parallel video fingerprint comparison.
//!
//! The orchestrator owns a single state machine per scan and reports
//! progress through a `ScanEvent` channel. Per-file failures are logged to
//! the analysis log and skipped; only a missing root or an unwritable
//! session is scan-fatal. An abort flag is polled between units of work,
//! so a Ctrl+C lands within one file hash or one pair comparison.

use crate::core::config::Config;
use crate::core::error::{Result, ScanError};
use crate::core::media::{self, MediaFile, MediaKind};
use crate::identity::{self, DigestIndex};
use crate::perceptual::{self, FingerprintTable};
use crate::pipeline::events::{Phase, ScanEvent, ScanSummary};
use crate::session::moves;
use crate::session::{AutoDuplicateRecord, MediaPair, Session, SESSION_FILE_NAME};
use crate::video::fingerprint::{
    ComparisonReport, VideoComparer, DEFAULT_DURATION_CUTOFF_SECS, DEFAULT_PERCENT_POSITIONS,
};
use crate::video::metadata::{is_candidate, VideoMetadata};
use crate::video::source::VideoSource;
use chrono::Local;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// File name of the per-scan analysis log inside the scan root
pub const ANALYSIS_LOG_FILE_NAME: &str = "analysis_log.txt";

/// Lifecycle of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    ScanningIdentity,
    ScanningImages,
    ScreeningVideos,
    ComparingVideos,
    Done,
    Aborted,
}

impl ScanState {
    /// Whether a scan in this state is still doing work.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ScanState::ScanningIdentity
                | ScanState::ScanningImages
                | ScanState::ScreeningVideos
                | ScanState::ComparingVideos
        )
    }
}

/// Per-scan human-readable log of skips and decisions, written next to the
/// media. Writing is best-effort: a full disk must not kill the scan.
struct AnalysisLog {
    file: Option<File>,
}

impl AnalysisLog {
    fn create(root: &Path) -> Self {
        let path = root.join(ANALYSIS_LOG_FILE_NAME);
        let file = match File::create(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("cannot create '{}': {}", path.display(), e);
                None
            }
        };
        Self { file }
    }

    fn line(&mut self, message: &str) {
        if let Some(ref mut file) = self.file {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(file, "[{}] {}", stamp, message);
        }
    }
}

/// Result message from one comparison worker. `None` means the worker saw
/// the abort flag and skipped its pair.
type WorkerResult = (usize, usize, Option<Result<ComparisonReport>>);

/// Drives one scan of one root folder.
pub struct Orchestrator {
    root: PathBuf,
    config: Config,
    events: Sender<ScanEvent>,
    abort: Arc<AtomicBool>,
    source: Arc<dyn VideoSource>,
    state: ScanState,
}

impl Orchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        config: Config,
        events: Sender<ScanEvent>,
        abort: Arc<AtomicBool>,
        source: Arc<dyn VideoSource>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            events,
            abort,
            source,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    fn emit(&self, event: ScanEvent) {
        // A disconnected consumer is treated like an abort, not an error
        let _ = self.events.send(event);
    }

    fn progress(&self, phase: Phase, done: usize, total: usize, last: &mut u8) {
        let percent = if total == 0 {
            100
        } else {
            ((done * 100) / total) as u8
        };
        if percent > *last {
            *last = percent;
            self.emit(ScanEvent::PhaseProgress { phase, percent });
        }
    }

    /// Run the full pipeline. Returns the session holding every pair found
    /// and every auto-resolved duplicate; on abort the session is partial
    /// but internally consistent.
    pub fn run(&mut self) -> Result<Session> {
        if !self.root.exists() {
            return Err(ScanError::RootNotFound(self.root.clone()));
        }

        let mut log = AnalysisLog::create(&self.root);
        log.line(&format!("scan started: {}", self.root.display()));

        let mut session = Session::new(&self.root);
        let mut summary = ScanSummary::default();

        self.emit(ScanEvent::Status(format!(
            "scanning {}",
            self.root.display()
        )));
        let excluded_dirs = [
            self.config.output.certain_duplicates_dir.as_str(),
            self.config.output.resolved_dir.as_str(),
        ];
        let files = media::collect_media_files(&self.root, &excluded_dirs, &[SESSION_FILE_NAME])?;
        summary.total_files = files.len();
        info!("found {} media files under '{}'", files.len(), self.root.display());

        // A tier interrupted by the abort flag never reports itself as
        // complete: the abort check comes before its completion events.
        self.state = ScanState::ScanningIdentity;
        let (images, videos) = self.run_identity_tier(&files, &mut session, &mut log)?;
        if self.aborted() {
            return self.finish_aborted(session, &mut log);
        }
        summary.images = images.len();
        summary.videos = videos.len();
        summary.auto_duplicates = session.auto_duplicates.len();
        self.emit(ScanEvent::IdentityReport {
            total_files: files.len(),
            moved: session.auto_duplicates.len(),
        });
        self.emit(ScanEvent::PhaseComplete {
            phase: Phase::Identity,
        });

        self.state = ScanState::ScanningImages;
        self.run_image_tier(&images, &mut session, &mut log);
        if self.aborted() {
            return self.finish_aborted(session, &mut log);
        }
        self.emit(ScanEvent::PhaseComplete {
            phase: Phase::Images,
        });

        self.state = ScanState::ScreeningVideos;
        let candidates = self.run_screening_tier(&videos, &mut log);
        if self.aborted() {
            return self.finish_aborted(session, &mut log);
        }
        self.emit(ScanEvent::PhaseComplete {
            phase: Phase::VideoScreening,
        });

        self.state = ScanState::ComparingVideos;
        summary.comparisons_run = candidates.len();
        self.run_comparison_tier(&videos, candidates, &mut session, &mut log)?;
        if self.aborted() {
            return self.finish_aborted(session, &mut log);
        }
        self.emit(ScanEvent::PhaseComplete {
            phase: Phase::VideoComparison,
        });

        self.state = ScanState::Done;
        summary.pairs_found = session.pairs.len();
        log.line(&format!(
            "scan finished: {} pairs, {} exact duplicates",
            session.pairs.len(),
            session.auto_duplicates.len()
        ));
        self.emit(ScanEvent::Finished(summary));
        Ok(session)
    }

    fn finish_aborted(&mut self, session: Session, log: &mut AnalysisLog) -> Result<Session> {
        self.state = ScanState::Aborted;
        log.line("scan aborted");
        self.emit(ScanEvent::Status("scan aborted".to_string()));
        Ok(session)
    }

    /// Tier 1: hash every file, move byte-exact duplicates aside, and split
    /// the survivors into the image and video working sets.
    fn run_identity_tier(
        &self,
        files: &[MediaFile],
        session: &mut Session,
        log: &mut AnalysisLog,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut index = DigestIndex::new();
        let mut images = Vec::new();
        let mut videos = Vec::new();
        let mut last = 0u8;
        let dup_dir = self.root.join(&self.config.output.certain_duplicates_dir);

        for (i, file) in files.iter().enumerate() {
            if self.aborted() {
                break;
            }

            let digest = match identity::compute_file_digest(&file.path) {
                Ok(digest) => digest,
                Err(e) => {
                    log.line(&format!("skipped (unreadable): {} ({})", file.path.display(), e));
                    debug!("{}", e);
                    self.progress(Phase::Identity, i + 1, files.len(), &mut last);
                    continue;
                }
            };

            if let Some(first) = index.insert(digest, &file.path) {
                let kept = first.to_path_buf();
                let dest = moves::relocate(&file.path, &dup_dir)?;
                log.line(&format!(
                    "exact duplicate (sha256 {}): {} (kept {}) -> {}",
                    identity::digest_to_hex(&digest),
                    file.path.display(),
                    kept.display(),
                    dest.display()
                ));
                let record = AutoDuplicateRecord {
                    kept,
                    moved: dest,
                };
                session.auto_duplicates.push(record.clone());
                self.emit(ScanEvent::AutoDuplicate(record));
            } else {
                match file.kind {
                    MediaKind::Image => images.push(file.path.clone()),
                    MediaKind::Video => videos.push(file.path.clone()),
                }
            }

            self.progress(Phase::Identity, i + 1, files.len(), &mut last);
        }

        Ok((images, videos))
    }

    /// Tier 2: fingerprint every image and report each new image's matches
    /// against everything seen before it.
    fn run_image_tier(&self, images: &[PathBuf], session: &mut Session, log: &mut AnalysisLog) {
        let threshold = self.config.images.phash_threshold;
        let mut table = FingerprintTable::new();
        let mut last = 0u8;

        for (i, path) in images.iter().enumerate() {
            if self.aborted() {
                break;
            }

            let Some(fingerprint) = perceptual::fingerprint_file(path) else {
                log.line(&format!("skipped (undecodable image): {}", path.display()));
                self.progress(Phase::Images, i + 1, images.len(), &mut last);
                continue;
            };

            for (earlier, distance) in table.matches_for(fingerprint, threshold) {
                log.line(&format!(
                    "image pair: {} ~ {} (distance {})",
                    earlier.display(),
                    path.display(),
                    distance
                ));
                let pair = MediaPair::new(earlier, path, distance);
                session.pairs.push(pair.clone());
                self.emit(ScanEvent::PairFound(pair));
            }
            table.push(path, fingerprint);
            self.progress(Phase::Images, i + 1, images.len(), &mut last);
        }
    }

    /// Tier 3: fetch container metadata for every video, drop invalid ones
    /// from the pool, and screen all pairs down to the candidate list.
    fn run_screening_tier(
        &self,
        videos: &[PathBuf],
        log: &mut AnalysisLog,
    ) -> Vec<(usize, usize)> {
        let mut metadata: Vec<Option<VideoMetadata>> = Vec::with_capacity(videos.len());
        let mut last = 0u8;
        let total = videos.len() + videos.len().saturating_sub(1) * videos.len() / 2;
        let mut done = 0;

        for path in videos {
            if self.aborted() {
                return Vec::new();
            }
            let meta = match self.source.metadata(path) {
                Ok(meta) if meta.is_valid() => Some(meta),
                Ok(meta) => {
                    let err = ScanError::InvalidMetadata {
                        path: path.clone(),
                        duration: meta.duration_secs,
                        fps: meta.fps,
                    };
                    log.line(&format!("excluded: {}", err));
                    debug!("{}", err);
                    None
                }
                Err(e) => {
                    log.line(&format!("metadata unavailable: {} ({})", path.display(), e));
                    debug!("{}", e);
                    None
                }
            };
            metadata.push(meta);
            done += 1;
            self.progress(Phase::VideoScreening, done, total, &mut last);
        }

        // Videos with failed or invalid metadata carry `None` and were
        // excluded above, so they never enter the candidate pairs.
        let settings = &self.config.video;
        let mut candidates = Vec::new();
        for i in 0..videos.len() {
            for j in (i + 1)..videos.len() {
                done += 1;
                if metadata[i].is_some()
                    && metadata[j].is_some()
                    && is_candidate(
                        metadata[i].as_ref(),
                        metadata[j].as_ref(),
                        settings.duration_tol,
                        settings.res_tol,
                    )
                {
                    candidates.push((i, j));
                }
            }
            self.progress(Phase::VideoScreening, done, total, &mut last);
        }

        info!(
            "video screening kept {} of {} pairs",
            candidates.len(),
            videos.len().saturating_sub(1) * videos.len() / 2
        );
        candidates
    }

    /// Tier 4: compare candidate pairs on a bounded worker pool, collecting
    /// results in completion order.
    fn run_comparison_tier(
        &self,
        videos: &[PathBuf],
        candidates: Vec<(usize, usize)>,
        session: &mut Session,
        log: &mut AnalysisLog,
    ) -> Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }

        let settings = &self.config.video;
        let comparer = VideoComparer::new(
            Arc::clone(&self.source),
            settings.scene_threshold,
            settings.match_hamming_thresh,
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.max_workers)
            .build()
            .map_err(|e| ScanError::Config(format!("cannot build worker pool: {}", e)))?;

        let (tx, rx) = crossbeam_channel::unbounded::<WorkerResult>();
        let expected = candidates.len();
        let match_ratio = settings.match_ratio_thresh;

        // Fire-and-forget tasks; the drain below runs on this thread so a
        // one-worker pool cannot deadlock against its own receiver.
        for (i, j) in candidates {
            let tx = tx.clone();
            let comparer = comparer.clone();
            let abort = Arc::clone(&self.abort);
            let a = videos[i].clone();
            let b = videos[j].clone();
            pool.spawn(move || {
                if abort.load(Ordering::SeqCst) {
                    let _ = tx.send((i, j, None));
                    return;
                }
                let report = comparer.compare(
                    &a,
                    &b,
                    &DEFAULT_PERCENT_POSITIONS,
                    DEFAULT_DURATION_CUTOFF_SECS,
                    match_ratio,
                );
                // The receiver may be gone after an abort
                let _ = tx.send((i, j, Some(report)));
            });
        }
        drop(tx);

        let mut last = 0u8;
        for (done, (i, j, outcome)) in rx.iter().take(expected).enumerate() {
            let a = &videos[i];
            let b = &videos[j];
            match outcome {
                Some(Ok(report)) => {
                    log.line(&format!(
                        "video pair compared: {} ~ {} ({:?}, score {:.2})",
                        a.display(),
                        b.display(),
                        report.outcome,
                        report.score
                    ));
                    if report.score >= settings.score_threshold {
                        let score = (report.score * 100.0).round() as u32;
                        let pair = MediaPair::new(a, b, score);
                        session.pairs.push(pair.clone());
                        self.emit(ScanEvent::PairFound(pair));
                    }
                }
                Some(Err(e)) => {
                    // Treated as "no match"; the rest of the batch continues
                    let err = ScanError::ComparisonFailure {
                        a: a.clone(),
                        b: b.clone(),
                        message: e.to_string(),
                    };
                    log.line(&err.to_string());
                    debug!("{}", err);
                }
                None => {}
            }
            self.progress(Phase::VideoComparison, done + 1, expected, &mut last);
            if self.aborted() {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::metadata::VideoMetadata;
    use image::{GrayImage, Luma, RgbImage};
    use std::fs;

    /// Source for image-only scans: no file in the test set should ever
    /// reach it.
    struct NoVideoSource;

    impl VideoSource for NoVideoSource {
        fn metadata(&self, path: &Path) -> Result<VideoMetadata> {
            panic!("unexpected metadata request for {}", path.display());
        }

        fn frame_at(&self, path: &Path, _time_secs: f64) -> Result<Option<GrayImage>> {
            panic!("unexpected frame request for {}", path.display());
        }
    }

    /// Source reporting identical metadata and a constant frame for every
    /// path, so every video pair screens through and compares as similar.
    struct UniformSource;

    impl VideoSource for UniformSource {
        fn metadata(&self, _path: &Path) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                duration_secs: 30.0,
                fps: 25.0,
                width: 640,
                height: 480,
            })
        }

        fn frame_at(&self, _path: &Path, _time_secs: f64) -> Result<Option<GrayImage>> {
            Ok(Some(GrayImage::from_fn(64, 64, |x, _| {
                Luma([if x < 32 { 0 } else { 200 }])
            })))
        }
    }

    fn save_gradient_png(path: &Path, tweak: u8) {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            let v = ((x * 3 + y * 2) % 256) as u8;
            image::Rgb([v, v.wrapping_add(tweak), v])
        });
        img.save(path).unwrap();
    }

    fn run_scan(root: &Path, source: Arc<dyn VideoSource>) -> (Session, Vec<ScanEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut orchestrator = Orchestrator::new(
            root,
            Config::default(),
            tx,
            Arc::new(AtomicBool::new(false)),
            source,
        );
        let session = orchestrator.run().unwrap();
        assert_eq!(orchestrator.state(), ScanState::Done);
        (session, rx.try_iter().collect())
    }

    #[test]
    fn test_byte_identical_images_are_auto_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);
        fs::copy(root.join("a.png"), root.join("a_copy.png")).unwrap();

        let (session, events) = run_scan(root, Arc::new(NoVideoSource));

        assert_eq!(session.auto_duplicates.len(), 1);
        assert!(session.pairs.is_empty());
        // The duplicate was moved into the output folder, original kept
        let moved = &session.auto_duplicates[0].moved;
        assert!(moved.starts_with(root.join("certain_duplicates")));
        assert!(moved.exists());
        assert!(session.auto_duplicates[0].kept.exists());
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::AutoDuplicate(_))));
        assert!(events.iter().any(|e| matches!(e, ScanEvent::Finished(_))));
    }

    #[test]
    fn test_visually_similar_images_become_a_pending_pair() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);
        // Same structure, slightly different channel values: distinct bytes,
        // near-identical fingerprint.
        save_gradient_png(&root.join("b.png"), 2);

        let (session, _) = run_scan(root, Arc::new(NoVideoSource));

        assert!(session.auto_duplicates.is_empty());
        assert_eq!(session.pairs.len(), 1);
        let pair = &session.pairs[0];
        assert_eq!(pair.decision, crate::session::Decision::Pending);
        assert!(pair.score < 12, "distance was {}", pair.score);
    }

    #[test]
    fn test_similar_videos_pair_with_percent_score() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("one.mp4"), b"stream one").unwrap();
        fs::write(root.join("two.mp4"), b"stream two").unwrap();

        let (session, events) = run_scan(root, Arc::new(UniformSource));

        assert_eq!(session.pairs.len(), 1);
        assert_eq!(session.pairs[0].score, 100);
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::PhaseComplete {
                phase: Phase::VideoComparison
            }
        )));
    }

    #[test]
    fn test_output_folders_are_not_rescanned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);

        let resolved = root.join("resolved");
        fs::create_dir(&resolved).unwrap();
        fs::copy(root.join("a.png"), resolved.join("a.png")).unwrap();

        let (session, _) = run_scan(root, Arc::new(NoVideoSource));

        // The byte-identical copy inside resolved/ is invisible to the scan
        assert!(session.auto_duplicates.is_empty());
        assert!(session.pairs.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut orchestrator = Orchestrator::new(
            "/definitely/not/here",
            Config::default(),
            tx,
            Arc::new(AtomicBool::new(false)),
            Arc::new(NoVideoSource),
        );
        assert!(matches!(
            orchestrator.run(),
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_preset_abort_yields_empty_partial_session() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);
        save_gradient_png(&root.join("b.png"), 2);

        let (tx, rx) = crossbeam_channel::unbounded();
        let abort = Arc::new(AtomicBool::new(true));
        let mut orchestrator = Orchestrator::new(
            root,
            Config::default(),
            tx,
            abort,
            Arc::new(NoVideoSource),
        );
        let session = orchestrator.run().unwrap();

        assert_eq!(orchestrator.state(), ScanState::Aborted);
        assert!(session.pairs.is_empty());
        assert!(session.auto_duplicates.is_empty());
        // Aborting never moves files
        assert!(root.join("a.png").exists());
        assert!(root.join("b.png").exists());
        // The interrupted tier must not report itself as complete
        let events: Vec<ScanEvent> = rx.try_iter().collect();
        assert!(!events.iter().any(|e| matches!(
            e,
            ScanEvent::PhaseComplete { .. }
                | ScanEvent::IdentityReport { .. }
                | ScanEvent::Finished(_)
        )));
    }

    #[test]
    fn test_exact_duplicate_log_records_digest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);
        fs::copy(root.join("a.png"), root.join("b.png")).unwrap();

        let digest = identity::compute_file_digest(&root.join("a.png")).unwrap();
        run_scan(root, Arc::new(NoVideoSource));

        let log = fs::read_to_string(root.join(ANALYSIS_LOG_FILE_NAME)).unwrap();
        assert!(log.contains(&identity::digest_to_hex(&digest)));
    }

    #[test]
    fn test_analysis_log_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_gradient_png(&root.join("a.png"), 0);

        run_scan(root, Arc::new(NoVideoSource));

        let log = fs::read_to_string(root.join(ANALYSIS_LOG_FILE_NAME)).unwrap();
        assert!(log.contains("scan started"));
        assert!(log.contains("scan finished"));
    }
}
