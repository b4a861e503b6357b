//! JSONL recorder for smoothed samples.
//!
//! Files are named `airmouse_<session>_<sequence>.jsonl` so that name order is
//! creation order. A new file is started every `max_records_per_file`
//! records and only the newest `max_files_to_keep` files are retained.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TelemetryConfig;
use crate::connection::ConnectionStatus;
use crate::error::Result;
use crate::input::mapper::Vector2;

const FILE_PREFIX: &str = "airmouse_";
const FILE_EXTENSION: &str = "jsonl";

/// One JSONL record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub status: String,
    pub x: f32,
    pub y: f32,
    pub roll: f32,
    pub raw: String,
}

impl TelemetryRecord {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn now(status: ConnectionStatus, input: Vector2, roll: f32, raw: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            status: status.to_string(),
            x: input.x,
            y: input.y,
            roll,
            raw: raw.to_string(),
        }
    }
}

/// Rotating JSONL writer
#[derive(Debug)]
pub struct TelemetryRecorder {
    dir: PathBuf,
    session: String,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    sequence: u32,
}

impl TelemetryRecorder {
    /// Create the log directory if needed. No file is opened until the first record.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            session: Utc::now().format("%Y%m%d_%H%M%S").to_string(),
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    /// Append one record, rotating first if the current file is full.
    pub fn record(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// File currently being written
    #[must_use]
    pub fn current_file(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        self.sequence += 1;
        let path = self.dir.join(format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX, self.session, self.sequence, FILE_EXTENSION
        ));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Telemetry file: {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune();
        Ok(())
    }

    /// Delete the oldest log files beyond the retention limit.
    fn prune(&self) {
        let mut files = match self.log_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list telemetry files: {}", e);
                return;
            }
        };
        if files.len() <= self.max_files_to_keep {
            return;
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove telemetry file {}: {}", path.display(), e);
            }
        }
    }

    fn log_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX))
                && path.extension().is_some_and(|e| e == FILE_EXTENSION);
            if is_log {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Drop for TelemetryRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush telemetry: {}", e);
        }
    }
}
