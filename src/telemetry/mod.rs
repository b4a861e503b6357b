//! # Telemetry Module
//!
//! Handles diagnostics of the incoming stream.
//!
//! This module handles:
//! - Keeping a short history of distinct raw lines for display
//! - Formatting smoothed samples as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod raw_history;
pub mod recorder;

pub use raw_history::RawLineHistory;
pub use recorder::{TelemetryRecord, TelemetryRecorder};
