//! Snapshot codec and store: the persisted, resumable form of a run.
//!
//! The store writes into an output directory through the `FileSystem` port:
//!
//! ```text
//! <output_dir>/
//!   ├── codemapper_state.json   # Snapshot (progress, diagrams, log tail)
//!   └── diagram.mmd             # Overview diagram source
//! ```
//!
//! Per-file status is not stored. On load, a file counts as processed when
//! its path appears in `filePathsProcessed`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ServiceContext;
use crate::diagram::DiagramSet;
use crate::error::{Error, Result};
use crate::run::state::{FileStatus, LogEntry, RunState};

/// File name of the persisted snapshot.
pub const STATE_FILE: &str = "codemapper_state.json";
/// File name of the exported Overview diagram.
pub const DIAGRAM_FILE: &str = "diagram.mmd";

/// Persisted run progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Name of the analysed project (the target directory's name).
    pub project_name: String,
    /// Completed plus Skipped files at save time.
    pub processed_count: usize,
    /// Run cursor at save time.
    pub current_file_index: usize,
    /// All diagrams.
    pub diagrams: DiagramSet,
    /// Most recent log entries.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Paths of Completed and Skipped files.
    #[serde(default)]
    pub file_paths_processed: Vec<String>,
}

impl Snapshot {
    /// Captures `state`, keeping only the last `log_tail` log entries.
    #[must_use]
    pub fn capture(state: &RunState, project_name: &str, log_tail: usize) -> Self {
        let logs = state.logs();
        let tail_start = logs.len().saturating_sub(log_tail);
        Self {
            project_name: project_name.to_string(),
            processed_count: state.processed_count(),
            current_file_index: state.cursor(),
            diagrams: state.diagrams().clone(),
            logs: logs[tail_start..].to_vec(),
            file_paths_processed: state.processed_paths().map(str::to_string).collect(),
        }
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] for malformed input.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Snapshot(format!("malformed snapshot: {e}")))
    }
}

/// What happened when a snapshot was applied to a freshly scanned state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Files marked processed from the snapshot.
    pub restored: usize,
    /// Snapshot paths that no longer exist in the scan.
    pub missing: usize,
    /// `processedCount` stored in the snapshot, when it disagrees with the rebuilt count.
    pub stale_count: Option<usize>,
}

impl RunState {
    /// Applies a snapshot to a freshly scanned state.
    ///
    /// Statuses are rebuilt by path membership: files above
    /// `max_single_file_bytes` come back Skipped, the rest Completed. The
    /// processed counter is recomputed, and the cursor is clamped to the
    /// first file that still needs work so newly added files are not passed
    /// over.
    pub fn restore(&mut self, snapshot: Snapshot, max_single_file_bytes: u64) -> RestoreReport {
        let processed: HashSet<&str> =
            snapshot.file_paths_processed.iter().map(String::as_str).collect();

        let mut restored = 0;
        for file in &mut self.files {
            if processed.contains(file.path.as_str()) {
                file.status = if file.size > max_single_file_bytes {
                    FileStatus::Skipped
                } else {
                    FileStatus::Completed
                };
                file.error = None;
                restored += 1;
            }
        }

        self.processed_count = self.files.iter().filter(|f| f.status.is_terminal()).count();
        let first_open =
            self.files.iter().position(|f| !f.status.is_terminal()).unwrap_or(self.files.len());
        self.cursor = snapshot.current_file_index.min(first_open);
        self.diagrams = snapshot.diagrams;

        let mut logs = snapshot.logs;
        logs.append(&mut self.logs);
        self.logs = logs;

        RestoreReport {
            restored,
            missing: processed.len() - restored,
            stale_count: (snapshot.processed_count != self.processed_count)
                .then_some(snapshot.processed_count),
        }
    }
}

/// Reads and writes snapshots in an output directory.
///
/// All I/O goes through `ctx.fs` so the store works with live and
/// in-memory filesystems.
pub struct SnapshotStore<'a> {
    ctx: &'a ServiceContext,
    dir: PathBuf,
}

impl<'a> SnapshotStore<'a> {
    /// Creates a store writing into `dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, dir: &Path) -> Self {
        Self { ctx, dir: dir.to_path_buf() }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Path of the exported Overview diagram.
    #[must_use]
    pub fn diagram_path(&self) -> PathBuf {
        self.dir.join(DIAGRAM_FILE)
    }

    /// Writes the snapshot, then the Overview diagram.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if either write fails.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = snapshot.encode()?;
        let state_path = self.state_path();
        self.ctx.fs.write(&state_path, &json).map_err(|e| {
            Error::Snapshot(format!("failed to write {}: {e}", state_path.display()))
        })?;

        let diagram_path = self.diagram_path();
        self.ctx.fs.write(&diagram_path, snapshot.diagrams.overview()).map_err(|e| {
            Error::Snapshot(format!("failed to write {}: {e}", diagram_path.display()))
        })?;

        debug!(
            processed = snapshot.processed_count,
            cursor = snapshot.current_file_index,
            "snapshot saved"
        );
        Ok(())
    }

    /// Loads the snapshot if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let path = self.state_path();
        if !self.ctx.fs.exists(&path) {
            return Ok(None);
        }
        let text = self
            .ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| Error::Snapshot(format!("failed to read {}: {e}", path.display())))?;
        Snapshot::decode(&text).map(Some)
    }
}
