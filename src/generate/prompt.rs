//! Prompt construction for one batch.

use std::fmt::Write;

use super::parse::{MODULE_MARKER, OVERVIEW_MARKER};

/// Appended to a file body that was cut at the character ceiling.
pub const TRUNCATION_NOTE: &str = "\n... [truncated]";

/// A batch file as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Relative path.
    pub path: String,
    /// Contents, already truncated.
    pub content: String,
}

impl SourceFile {
    /// Builds a source file, truncating `content` to `max_chars` characters.
    pub fn new(path: impl Into<String>, content: &str, max_chars: usize) -> Self {
        Self { path: path.into(), content: truncate_chars(content, max_chars) }
    }
}

/// Everything the model sees for one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    /// Current Overview diagram.
    pub overview: &'a str,
    /// Module key the batch resolved to.
    pub module_name: &'a str,
    /// Current module diagram, `None` on first encounter.
    pub module: Option<&'a str>,
    /// Batch contents.
    pub files: &'a [SourceFile],
    /// Project tree of the whole file set.
    pub tree: &'a str,
}

/// Cuts `content` to at most `max_chars` characters, marking the cut.
#[must_use]
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_at, _)) => format!("{}{TRUNCATION_NOTE}", &content[..byte_at]),
        None => content.to_string(),
    }
}

/// Instructions describing the task and the response protocol.
#[must_use]
pub fn system_prompt() -> String {
    format!(
        "You are a software architect maintaining C4-model architecture diagrams written in \
         Mermaid syntax. You receive the current diagrams, the project's directory tree and a \
         batch of source files from one directory. Revise the diagrams so they also reflect \
         the new files. Keep every element that is still valid; add, rename or connect \
         elements as the code requires. Never drop prior content without reason.\n\n\
         Respond with exactly two sections and nothing else:\n\
         {OVERVIEW_MARKER}\n<the complete updated system-level diagram (C4Context or C4Container)>\n\
         {MODULE_MARKER}\n<the complete updated C4Component diagram for the batch's module>\n"
    )
}

/// Renders the user prompt for a batch.
#[must_use]
pub fn build_prompt(batch: &BatchContext<'_>) -> String {
    let mut out = String::new();

    out.push_str("## Project tree\n```\n");
    out.push_str(batch.tree);
    out.push_str("```\n\n");

    out.push_str("## Current overview diagram\n```mermaid\n");
    out.push_str(batch.overview.trim_end());
    out.push_str("\n```\n\n");

    let _ = writeln!(out, "## Module `{}`", batch.module_name);
    match batch.module {
        Some(diagram) => {
            out.push_str("Current module diagram:\n```mermaid\n");
            out.push_str(diagram.trim_end());
            out.push_str("\n```\n\n");
        }
        None => out.push_str("No diagram exists for this module yet; create one.\n\n"),
    }

    let _ = writeln!(out, "## Batch files ({})", batch.files.len());
    for file in batch.files {
        let _ = write!(out, "\n### {}\n```\n{}\n```\n", file.path, file.content.trim_end());
    }
    out
}
