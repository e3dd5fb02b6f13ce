use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::FormatChoice;
use crate::error::AppError;

/// The ledger keeps at most this many entries; the oldest fall off the tail.
pub const HISTORY_LIMIT: usize = 20;

/// One successfully completed download. Created on success only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub source_url: String,
    pub format: FormatChoice,
    pub completed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Detail line for a history row, e.g. `mp4 • 2026-08-07 12:00:00`.
    pub fn details(&self) -> String {
        format!(
            "{} • {}",
            self.format.as_str(),
            self.completed_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Bounded, persisted, newest-first record of completed downloads.
///
/// The in-memory copy is owned by the core loop and mirrored to a JSON file
/// on every mutation. A missing or unreadable file is treated as an empty
/// history; a failed write is logged and otherwise ignored, because history
/// persistence must never fail a download.
#[derive(Debug)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    path: PathBuf,
}

impl HistoryLedger {
    /// `<config_dir>/tube-downloader/history.json`
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| dirs::home_dir().unwrap_or_default());
        base.join("tube-downloader").join("history.json")
    }

    pub fn open_default() -> Self {
        Self::load(Self::default_path())
    }

    /// Read the persisted sequence, falling back to an empty ledger on any
    /// read or parse failure.
    pub fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(body) => match serde_json::from_str::<Vec<HistoryEntry>>(&body) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_LIMIT);
                    entries
                }
                Err(err) => {
                    tracing::warn!("ignoring malformed history at {}: {err}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { entries, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert at the head, evict past the cap, mirror to disk. A write
    /// failure is logged and swallowed.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
        if let Err(err) = self.persist() {
            tracing::warn!("failed to persist history: {err}");
        }
    }

    /// Rewrite the whole sequence, overwriting prior contents.
    pub fn persist(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::Persistence(e.to_string()))?;
        }
        let body = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        fs::write(&self.path, body).map_err(|e| AppError::Persistence(e.to_string()))
    }
}
