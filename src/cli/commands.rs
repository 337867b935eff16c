//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    print_error, print_header, print_info, print_success, print_warning, ScanDisplay,
};
use crate::cli::{Args, Commands, SessionCommands};
use crate::core::config::{get_config_path, Config};
use crate::pipeline::{Orchestrator, ScanEvent, ScanSummary};
use crate::session::{Decision, FinalizeAction, MediaPair, Session};
use crate::video::fingerprint::{DEFAULT_DURATION_CUTOFF_SECS, DEFAULT_PERCENT_POSITIONS};
use crate::video::{FfmpegSource, VideoComparer};
use anyhow::{anyhow, bail, Context, Result};
use dialoguer::Confirm;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Commands::Scan {
            path,
            workers,
            score_threshold,
            phash_threshold,
            yes,
        } => {
            let mut config = config.clone();
            if let Some(workers) = workers {
                config.video.max_workers = *workers;
            }
            if let Some(threshold) = score_threshold {
                config.video.score_threshold = *threshold;
            }
            if let Some(threshold) = phash_threshold {
                config.images.phash_threshold = *threshold;
            }
            config.video = config.video.clone().clamped();

            run_scan(path, config, shutdown_flag, *yes)?;
        }
        Commands::Compare { a, b } => {
            run_compare(a, b, config)?;
        }
        Commands::Session { session_command } => {
            run_session_command(session_command, config)?;
        }
        Commands::Config { path, reset } => {
            handle_config_command(*path, *reset)?;
        }
        Commands::ShowConfig => {
            show_config(config)?;
        }
    }

    Ok(())
}

fn run_scan(root: &Path, config: Config, shutdown_flag: Arc<AtomicBool>, yes: bool) -> Result<()> {
    if Session::exists(root) && !yes {
        let rescan = Confirm::new()
            .with_prompt("A previous review session exists here. Rescan and overwrite it?")
            .default(false)
            .interact()?;
        if !rescan {
            print_info("keeping the existing session; use `session show` to review it");
            return Ok(());
        }
    }

    print_header("Media Duplicate Scan");
    print_info(&format!("scanning {}", root.display()));

    let (tx, rx) = crossbeam_channel::unbounded::<ScanEvent>();
    let fatal_tx = tx.clone();
    let source = Arc::new(FfmpegSource::new());
    let scan_root = root.to_path_buf();

    let handle = thread::spawn(move || {
        let mut orchestrator =
            Orchestrator::new(scan_root, config, tx, shutdown_flag, source);
        let result = orchestrator.run();
        if let Err(ref e) = result {
            let _ = fatal_tx.send(ScanEvent::Fatal(e.to_string()));
        }
        result
    });

    let mut display = ScanDisplay::new();
    let mut summary: Option<ScanSummary> = None;
    for event in rx {
        match event {
            ScanEvent::Status(message) => display.log(&message),
            ScanEvent::PhaseProgress { phase, percent } => display.update(phase, percent),
            ScanEvent::PhaseComplete { phase } => display.complete(phase),
            ScanEvent::PairFound(pair) => display.log(&format!(
                "pair: {} ~ {} (score {})",
                pair.file_a.display(),
                pair.file_b.display(),
                pair.score
            )),
            ScanEvent::AutoDuplicate(record) => display.log(&format!(
                "exact duplicate moved: {} (kept {})",
                record.moved.display(),
                record.kept.display()
            )),
            ScanEvent::IdentityReport { total_files, moved } => display.log(&format!(
                "{} files hashed, {} exact duplicates moved",
                total_files, moved
            )),
            ScanEvent::Finished(s) => summary = Some(s),
            ScanEvent::Fatal(message) => {
                display.finish();
                print_error(&message);
            }
        }
    }
    display.finish();

    let session = handle
        .join()
        .map_err(|_| anyhow!("scan thread panicked"))??;
    session.save()?;

    match summary {
        Some(summary) => {
            print_success(&format!(
                "scan complete: {} files ({} images, {} videos)",
                summary.total_files, summary.images, summary.videos
            ));
            print_info(&format!(
                "{} exact duplicates auto-resolved, {} pairs awaiting review",
                summary.auto_duplicates, summary.pairs_found
            ));
            if summary.pairs_found > 0 {
                print_info(&format!(
                    "review with: media-dedup session show {}",
                    session.root.display()
                ));
            }
        }
        None => {
            print_warning(&format!(
                "scan did not finish; partial session saved ({} pairs)",
                session.pairs.len()
            ));
        }
    }

    Ok(())
}

fn run_compare(a: &Path, b: &Path, config: &Config) -> Result<()> {
    let settings = &config.video;
    let comparer = VideoComparer::new(
        Arc::new(FfmpegSource::new()),
        settings.scene_threshold,
        settings.match_hamming_thresh,
    );
    let report = comparer.compare(
        a,
        b,
        &DEFAULT_PERCENT_POSITIONS,
        DEFAULT_DURATION_CUTOFF_SECS,
        settings.match_ratio_thresh,
    )?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_session_command(command: &SessionCommands, config: &Config) -> Result<()> {
    match command {
        SessionCommands::Show { path } => {
            let session = load_session(path)?;
            show_session(&session);
        }
        SessionCommands::Decide {
            path,
            index,
            decision,
        } => {
            let mut session = load_session(path)?;
            let count = session.pairs.len();
            let pair = session
                .pairs
                .get_mut(*index)
                .ok_or_else(|| anyhow!("no pair with index {} (session has {})", index, count))?;
            pair.apply(Decision::from(*decision));
            let applied = pair.decision;
            session.save()?;
            print_success(&format!("pair {} is now {:?}", index, applied));
        }
        SessionCommands::AddPair {
            path,
            file_a,
            file_b,
            score,
        } => {
            let mut session = if Session::exists(path) {
                load_session(path)?
            } else {
                Session::new(path)
            };
            session
                .pairs
                .push(MediaPair::new(file_a.clone(), file_b.clone(), *score));
            session.save()?;
            print_success(&format!(
                "added pair {}: {} ~ {}",
                session.pairs.len() - 1,
                file_a.display(),
                file_b.display()
            ));
        }
        SessionCommands::Finalize {
            path,
            move_files,
            yes,
        } => {
            let session = load_session(path)?;
            let action = if *move_files {
                let discards: usize = session.pairs.iter().map(|p| p.discards().len()).sum();
                if discards == 0 {
                    print_info("no decisions discard any files; saving only");
                    FinalizeAction::SaveOnly
                } else {
                    let confirmed = *yes
                        || Confirm::new()
                            .with_prompt(format!(
                                "Move {} discarded file(s) into '{}'?",
                                discards, config.output.resolved_dir
                            ))
                            .default(false)
                            .interact()?;
                    if confirmed {
                        FinalizeAction::SaveAndMove
                    } else {
                        FinalizeAction::SaveOnly
                    }
                }
            } else {
                FinalizeAction::SaveOnly
            };

            let summary = session.finalize(action, &config.output.resolved_dir)?;
            if action == FinalizeAction::SaveAndMove {
                print_success(&format!("moved {} file(s)", summary.moved));
                if summary.missing > 0 {
                    print_warning(&format!("{} discard target(s) were already gone", summary.missing));
                }
            } else {
                print_success("session saved");
            }
        }
    }

    Ok(())
}

fn load_session(root: &Path) -> Result<Session> {
    if !Session::exists(root) {
        bail!("no session found under '{}'; run a scan first", root.display());
    }
    Ok(Session::load(root)?)
}

fn show_session(session: &Session) {
    print_header("Review Session");
    print_info(&format!("root: {}", session.root.display()));

    if !session.auto_duplicates.is_empty() {
        println!("  auto-resolved exact duplicates:");
        for auto in &session.auto_duplicates {
            println!(
                "    {} (kept {})",
                auto.moved.display(),
                auto.kept.display()
            );
        }
        println!();
    }

    if session.pairs.is_empty() {
        print_info("no pairs awaiting review");
        return;
    }

    println!(
        "  {} pair(s), {} decided:",
        session.pairs.len(),
        session.decided_count()
    );
    for (index, pair) in session.pairs.iter().enumerate() {
        println!(
            "    [{}] {:<12} score {:>3}  {} ~ {}",
            index,
            format!("{:?}", pair.decision),
            pair.score,
            pair.file_a.display(),
            pair.file_b.display()
        );
    }
}

fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    let config_path = get_config_path().context("cannot determine the config directory")?;

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if reset {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let defaults = toml::to_string_pretty(&Config::default())?;
        fs::write(&config_path, defaults)?;
        info!("wrote default config to {}", config_path.display());
        print_success(&format!("config reset: {}", config_path.display()));
        return Ok(());
    }

    if config_path.exists() {
        println!("{}", fs::read_to_string(&config_path)?);
    } else {
        print_info(&format!(
            "no config file yet; run `config --reset` to create {}",
            config_path.display()
        ));
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
