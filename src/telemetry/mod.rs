//! # Telemetry Module
//!
//! Records control loop snapshots to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting snapshots as JSONL (JSON Lines), one record per line
//! - Rate limiting to one record per `log_interval_ms`
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123+00:00","uptime_ms":4200,"position":{"x":50,"y":100},...}
//! ```

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::clock::elapsed_ms;
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::runner::Snapshot;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    uptime_ms: u32,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Rotating JSONL snapshot writer.
#[derive(Debug)]
pub struct TelemetryRecorder {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    log_interval_ms: u32,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    sequence: u32,
    last_record_ms: Option<u32>,
}

impl TelemetryRecorder {
    /// Creates the log directory if needed. No file is opened until the first
    /// record.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            log_interval_ms: config.log_interval_ms,
            writer: None,
            records_in_file: 0,
            sequence: 0,
            last_record_ms: None,
        })
    }

    /// Writes `snapshot` unless the previous record is less than
    /// `log_interval_ms` old.
    ///
    /// Returns whether a record was written.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` if the record cannot be written.
    pub fn record(&mut self, now_ms: u32, snapshot: &Snapshot) -> Result<bool> {
        if let Some(last) = self.last_record_ms {
            if elapsed_ms(now_ms, last) < self.log_interval_ms {
                return Ok(false);
            }
        }

        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = Record {
            timestamp: Utc::now().to_rfc3339(),
            uptime_ms: now_ms,
            snapshot,
        };

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        self.records_in_file += 1;
        self.last_record_ms = Some(now_ms);
        Ok(true)
    }

    /// Flushes the current file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        self.sequence = self.sequence.wrapping_add(1);

        let path = self.dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Deletes the oldest files beyond `max_files_to_keep`.
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_telemetry_file(path))
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names embed a sortable timestamp and sequence number
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

fn is_telemetry_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == FILE_EXTENSION);
    name_matches && ext_matches
}
