//! Persistence of finished statistics
//!
//! Records are stored in their rounded [`StatsRecord`] form. A failed save
//! never invalidates the statistics it was given; callers decide whether to
//! warn or abort.

use crate::probe::ProbeError;
use crate::stats::{Statistics, StatsRecord};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Default history file name inside the application directory
pub const HISTORY_FILE_NAME: &str = "history.jsonl";

/// A persisted statistics record
pub type HistoryRecord = StatsRecord;

/// Storage for past runs
pub trait HistoryStore: Send + Sync {
    /// Append one run
    fn save(&self, stats: &Statistics) -> Result<(), ProbeError>;

    /// Up to `limit` records, most recent first
    fn query(&self, limit: usize) -> Result<Vec<HistoryRecord>, ProbeError>;
}

/// Append-only JSON Lines file
#[derive(Debug, Clone)]
pub struct JsonlHistoryStore {
    path: PathBuf,
}

impl JsonlHistoryStore {
    /// Store records in `path`; parent directories are created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store records in `~/.pingsweep/history.jsonl`
    pub fn open_default() -> Result<Self, ProbeError> {
        crate::config::app_file_path(HISTORY_FILE_NAME)
            .map(Self::new)
            .ok_or_else(|| ProbeError::Persistence("home directory not found".to_string()))
    }

    /// Location of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn save(&self, stats: &Statistics) -> Result<(), ProbeError> {
        let line = serde_json::to_string(&stats.to_record())
            .map_err(|e| ProbeError::Persistence(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| persistence(&self.path, &e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| persistence(&self.path, &e))?;
        writeln!(file, "{line}").map_err(|e| persistence(&self.path, &e))?;

        debug!(path = %self.path.display(), host = %stats.target, "saved history record");
        Ok(())
    }

    fn query(&self, limit: usize) -> Result<Vec<HistoryRecord>, ProbeError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(&self.path, &e)),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| persistence(&self.path, &e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, error = %e, "skipping malformed history record"),
            }
        }

        Ok(records.into_iter().rev().take(limit).collect())
    }
}

fn persistence(path: &Path, err: &std::io::Error) -> ProbeError {
    ProbeError::Persistence(format!("{}: {err}", path.display()))
}

/// In-process store, mainly for tests
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().expect("history poisoned").len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(&self, stats: &Statistics) -> Result<(), ProbeError> {
        self.records
            .lock()
            .expect("history poisoned")
            .push(stats.to_record());
        Ok(())
    }

    fn query(&self, limit: usize) -> Result<Vec<HistoryRecord>, ProbeError> {
        let records = self.records.lock().expect("history poisoned");
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
