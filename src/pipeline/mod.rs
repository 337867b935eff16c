//! Scan pipeline
//!
//! The orchestrator state machine and the event stream it reports through.
//! One orchestrator instance drives one scan of one root folder; the CLI
//! runs it on a worker thread and consumes `ScanEvent`s on the main thread.

pub mod events;
pub mod orchestrator;

pub use events::{Phase, ScanEvent, ScanSummary};
pub use orchestrator::{Orchestrator, ScanState};
