//! Run state: file records, progress counters, diagrams and the run log.
//!
//! `RunState` is owned by a single writer (the run loop or the interactive
//! console between runs). Every batch outcome is applied through one method
//! call so statuses, counters and diagrams change together.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::diagram::{DiagramSet, DiagramUpdate};
use crate::error::{Error, Result};
use crate::scan::ScannedFile;

/// Lifecycle of a file within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Not yet sent anywhere.
    Pending,
    /// Part of the batch currently being generated.
    Processing,
    /// Included in a successful batch.
    Completed,
    /// Its batch failed; needs an explicit retry.
    Failed,
    /// Larger than the single-file ceiling; never sent.
    Skipped,
}

impl FileStatus {
    /// Completed and Skipped files count as processed and are never planned again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One file of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative `/`-separated path; unique within the run.
    pub path: String,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Current status.
    pub status: FileStatus,
    /// Error message of the last failed batch containing this file.
    pub error: Option<String>,
}

impl FileRecord {
    /// A new Pending record.
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self { path: path.into(), size, status: FileStatus::Pending, error: None }
    }
}

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress information.
    Info,
    /// A batch or the run finished successfully.
    Success,
    /// Something was skipped or degraded.
    Warn,
    /// A batch failed.
    Error,
}

/// An append-only run log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable text.
    pub message: String,
}

/// Per-status file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// Files waiting to be planned.
    pub pending: usize,
    /// Files in the in-flight batch.
    pub processing: usize,
    /// Files included in successful batches.
    pub completed: usize,
    /// Files whose batch failed.
    pub failed: usize,
    /// Oversized files skipped by policy.
    pub skipped: usize,
}

impl StatusSummary {
    /// Total number of files.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed + self.skipped
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} completed, {} skipped, {} failed, {} pending",
            self.total(),
            self.completed,
            self.skipped,
            self.failed,
            self.pending + self.processing,
        )
    }
}

/// Resumable progress of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub(crate) files: Vec<FileRecord>,
    pub(crate) cursor: usize,
    pub(crate) processed_count: usize,
    pub(crate) diagrams: DiagramSet,
    pub(crate) is_running: bool,
    pub(crate) logs: Vec<LogEntry>,
}

impl RunState {
    /// Builds a fresh state from scan results, ordered by path.
    #[must_use]
    pub fn from_scan(scanned: Vec<ScannedFile>) -> Self {
        let mut files: Vec<FileRecord> =
            scanned.into_iter().map(|f| FileRecord::new(f.path, f.size)).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self {
            files,
            cursor: 0,
            processed_count: 0,
            diagrams: DiagramSet::new(),
            is_running: false,
            logs: Vec::new(),
        }
    }

    /// All file records in run order.
    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Index of the next unexamined file.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of Completed plus Skipped files.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Current diagrams.
    #[must_use]
    pub fn diagrams(&self) -> &DiagramSet {
        &self.diagrams
    }

    /// Whether the run loop is currently driving this state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// The run log, oldest first.
    #[must_use]
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Index of the file with the given path.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.files.binary_search_by(|f| f.path.as_str().cmp(path)).ok()
    }

    /// Counts files per status.
    #[must_use]
    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for file in &self.files {
            match file.status {
                FileStatus::Pending => summary.pending += 1,
                FileStatus::Processing => summary.processing += 1,
                FileStatus::Completed => summary.completed += 1,
                FileStatus::Failed => summary.failed += 1,
                FileStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Paths of Completed and Skipped files.
    pub fn processed_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().filter(|f| f.status.is_terminal()).map(|f| f.path.as_str())
    }

    /// Failed files as `(index, record)`.
    pub fn failed(&self) -> impl Iterator<Item = (usize, &FileRecord)> {
        self.files.iter().enumerate().filter(|(_, f)| f.status == FileStatus::Failed)
    }

    /// Appends a log entry and mirrors it to `tracing`.
    pub fn log(&mut self, timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => info!(%level, "{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        self.logs.push(LogEntry { timestamp, level, message });
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    /// Moves the cursor forward; never backward.
    pub(crate) fn advance_cursor(&mut self, to: usize) {
        self.cursor = self.cursor.max(to);
    }

    pub(crate) fn mark_processing(&mut self, indices: &[usize]) {
        for &i in indices {
            self.files[i].status = FileStatus::Processing;
        }
    }

    /// Marks a single oversized file as Skipped.
    pub(crate) fn apply_skip(&mut self, index: usize) {
        let file = &mut self.files[index];
        if !file.status.is_terminal() {
            self.processed_count += 1;
        }
        file.status = FileStatus::Skipped;
        file.error = None;
        self.advance_cursor(index + 1);
    }

    /// Applies a successful batch: statuses, diagrams, counter and cursor together.
    pub(crate) fn apply_success(
        &mut self,
        indices: &[usize],
        next_cursor: usize,
        update: DiagramUpdate,
    ) {
        for &i in indices {
            let file = &mut self.files[i];
            if !file.status.is_terminal() {
                self.processed_count += 1;
            }
            file.status = FileStatus::Completed;
            file.error = None;
        }
        self.diagrams.apply(update);
        self.advance_cursor(next_cursor);
    }

    /// Applies a failed batch. Diagrams, counters and the cursor are untouched.
    pub(crate) fn apply_failure(&mut self, indices: &[usize], message: &str) {
        for &i in indices {
            let file = &mut self.files[i];
            file.status = FileStatus::Failed;
            file.error = Some(message.to_string());
        }
        self.is_running = false;
    }

    /// Resets a Failed file to Pending and rewinds the cursor to it if needed.
    ///
    /// Failed files are never counted as processed, so the counter is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFile`] for an out-of-range index and
    /// [`Error::NotRetryable`] if the file is not Failed.
    pub fn retry(&mut self, index: usize) -> Result<()> {
        let file = self
            .files
            .get_mut(index)
            .ok_or_else(|| Error::UnknownFile(index.to_string()))?;
        if file.status != FileStatus::Failed {
            return Err(Error::NotRetryable {
                path: file.path.clone(),
                status: file.status.to_string(),
            });
        }
        file.status = FileStatus::Pending;
        file.error = None;
        self.cursor = self.cursor.min(index);
        Ok(())
    }

    /// [`RunState::retry`] by path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFile`] if no file has this path, otherwise as [`RunState::retry`].
    pub fn retry_path(&mut self, path: &str) -> Result<()> {
        let index = self.index_of(path).ok_or_else(|| Error::UnknownFile(path.to_string()))?;
        self.retry(index)
    }

    /// Retries every Failed file; returns how many were reset.
    pub fn retry_all_failed(&mut self) -> usize {
        let failed: Vec<usize> = self.failed().map(|(i, _)| i).collect();
        for &i in &failed {
            // Indices come from `failed()`, so each one is retryable.
            let _ = self.retry(i);
        }
        failed.len()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}
