//! Source file discovery and the project tree used as prompt context.

pub mod tree;

pub use tree::render_tree;

use std::path::{Component, Path};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the root, `/`-separated.
    pub path: String,
    /// Size on disk in bytes.
    pub size: u64,
}

/// Enumerates files under `root` whose extension is in `extensions`.
///
/// Directories whose name appears in `ignore_dirs` are not descended into.
/// Symbolic links are followed, so a dangling link or a link cycle is a
/// scan error. Output order follows the directory walk and carries no meaning; callers
/// sort before use.
///
/// # Errors
///
/// Returns [`Error::ScanRootMissing`] if `root` is not a directory and
/// [`Error::Scan`] if any entry below it cannot be read. A failure anywhere
/// aborts the whole scan.
pub fn scan(
    root: &Path,
    extensions: &[String],
    ignore_dirs: &[String],
) -> Result<Vec<ScannedFile>> {
    if !root.is_dir() {
        return Err(Error::ScanRootMissing(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && is_ignored(entry, ignore_dirs)));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| Error::Scan { root: root.to_path_buf(), source })?;
        if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), extensions) {
            continue;
        }
        let metadata =
            entry.metadata().map_err(|source| Error::Scan { root: root.to_path_buf(), source })?;
        let Some(path) = relative_path(root, entry.path()) else {
            continue;
        };
        files.push(ScannedFile { path, size: metadata.len() });
    }

    debug!(root = %root.display(), files = files.len(), "scan finished");
    Ok(files)
}

fn is_ignored(entry: &walkdir::DirEntry, ignore_dirs: &[String]) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| ignore_dirs.iter().any(|d| d == name))
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

/// Renders `path` relative to `root` with `/` separators on every platform.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
