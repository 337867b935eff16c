//! Progress bars and CLI output utilities
//!
//! The scan display owns one progress bar at a time, advancing it from the
//! orchestrator's phase events. Log lines suspend the bar so output stays
//! clean.

use crate::pipeline::Phase;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

fn phase_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {percent}% {msg}")
        .unwrap()
        .progress_chars("━━╾─")
}

fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {msg}")
        .unwrap()
        .progress_chars("━━━")
}

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Progress display for a running scan, one bar per pipeline phase.
pub struct ScanDisplay {
    bar: Option<ProgressBar>,
    phase: Option<Phase>,
}

impl ScanDisplay {
    pub fn new() -> Self {
        Self {
            bar: None,
            phase: None,
        }
    }

    fn bar_for(&mut self, phase: Phase) -> &ProgressBar {
        if self.phase != Some(phase) {
            if let Some(old) = self.bar.take() {
                old.finish_and_clear();
            }
            let bar = ProgressBar::new(100);
            bar.set_style(phase_bar_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar.set_message(phase.to_string());
            self.bar = Some(bar);
            self.phase = Some(phase);
        }
        self.bar.as_ref().unwrap()
    }

    /// Advance the bar for `phase`, creating it on first sight.
    pub fn update(&mut self, phase: Phase, percent: u8) {
        self.bar_for(phase).set_position(percent as u64);
    }

    /// Mark a phase done and retire its bar.
    pub fn complete(&mut self, phase: Phase) {
        let bar = self.bar_for(phase);
        bar.set_position(100);
        bar.set_style(completed_style());
        bar.finish_with_message(format!("{} done", phase));
        self.bar = None;
        self.phase = None;
    }

    /// Log a line while suspending the active bar.
    pub fn log(&self, msg: &str) {
        match self.bar {
            Some(ref bar) => bar.suspend(|| println!("  {}", msg)),
            None => println!("  {}", msg),
        }
    }

    /// Drop whatever bar is still active.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.phase = None;
    }
}

impl Default for ScanDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}
