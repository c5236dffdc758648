//! Batch planning: groups the remaining files into coherent, size-bounded batches.
//!
//! The planner walks the ordered file list from the cursor and admits files
//! until one of the stop rules fires:
//!
//! - a file from a different directory than the batch's first file,
//! - a file larger than `max_single_file_bytes` (admitted alone if the batch
//!   is empty, producing a skip-only plan),
//! - a file that would push the batch over `max_batch_bytes` (admitted alone
//!   if the batch is empty),
//! - `max_files_per_batch` reached or the list exhausted.
//!
//! Files that are already Completed or Skipped are stepped over.

use crate::diagram::OVERVIEW_KEY;
use crate::run::state::FileRecord;

/// Module key used for files at the project root.
pub const ROOT_MODULE: &str = "root";

/// Module key for a top-level directory named like the reserved Overview entry.
pub const OVERVIEW_DIR_MODULE: &str = "Overview/";

/// Size limits applied by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of files in one batch (values below 1 act as 1).
    pub max_files_per_batch: usize,
    /// Maximum cumulative size of a multi-file batch.
    pub max_batch_bytes: u64,
    /// Files above this size are skipped instead of generated.
    pub max_single_file_bytes: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_files_per_batch: 8,
            max_batch_bytes: 60_000,
            max_single_file_bytes: 100_000,
        }
    }
}

/// What the run loop should do with a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Nothing left to process from the cursor; just move the cursor.
    Empty,
    /// A single oversized file that is marked Skipped without generation.
    SkipOnly,
    /// Files to send to the generation call.
    Generate,
}

/// One planned batch. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Indices into the file list, ascending.
    pub indices: Vec<usize>,
    /// Module key of the batch, `None` for an empty plan.
    pub module: Option<String>,
    /// Cursor position after this plan is consumed.
    pub next_cursor: usize,
    /// How the plan is to be handled.
    pub kind: PlanKind,
}

impl BatchPlan {
    /// Returns `true` if the plan admits no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Directory component of a relative path, or [`ROOT_MODULE`] when there is none.
///
/// A top-level `Overview` directory maps to [`OVERVIEW_DIR_MODULE`] so its
/// diagram never lands on the Overview entry.
#[must_use]
pub fn module_key(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((OVERVIEW_KEY, _)) => OVERVIEW_DIR_MODULE,
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => ROOT_MODULE,
    }
}

/// Plans the next batch starting at `cursor`.
#[must_use]
pub fn plan_next(files: &[FileRecord], cursor: usize, limits: &BatchLimits) -> BatchPlan {
    let max_files = limits.max_files_per_batch.max(1);
    let mut indices = Vec::new();
    let mut batch_dir: Option<&str> = None;
    let mut batch_bytes = 0u64;
    let mut kind = PlanKind::Generate;
    let mut i = cursor;

    while i < files.len() && indices.len() < max_files {
        let file = &files[i];
        if file.status.is_terminal() {
            i += 1;
            continue;
        }

        let dir = module_key(&file.path);
        let empty = indices.is_empty();

        if file.size > limits.max_single_file_bytes {
            if empty {
                indices.push(i);
                batch_dir = Some(dir);
                kind = PlanKind::SkipOnly;
                i += 1;
            }
            break;
        }

        if batch_dir.is_some_and(|current| current != dir) {
            break;
        }

        if batch_bytes + file.size > limits.max_batch_bytes {
            if empty {
                indices.push(i);
                batch_dir = Some(dir);
                i += 1;
            }
            break;
        }

        indices.push(i);
        batch_dir = Some(dir);
        batch_bytes += file.size;
        i += 1;
    }

    if indices.is_empty() {
        kind = PlanKind::Empty;
    }

    BatchPlan {
        indices,
        module: batch_dir.map(str::to_string),
        next_cursor: i,
        kind,
    }
}
