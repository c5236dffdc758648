//! Splits a model response into overview and module fragments.
//!
//! The model is asked to emit [`OVERVIEW_MARKER`] and [`MODULE_MARKER`]
//! lines, each followed by one Mermaid diagram. Anything missing, empty or
//! unparseable yields `None` for that fragment, which callers treat as
//! "keep the previous diagram".

/// Line introducing the Overview diagram.
pub const OVERVIEW_MARKER: &str = "---OVERVIEW---";
/// Line introducing the module diagram.
pub const MODULE_MARKER: &str = "---MODULE---";

/// Diagram fragments found in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    /// Text after the overview marker.
    pub overview: Option<String>,
    /// Text after the module marker.
    pub module: Option<String>,
}

/// Extracts both fragments from `text`.
#[must_use]
pub fn parse_response(text: &str) -> Fragments {
    let overview_at = text.find(OVERVIEW_MARKER);
    let module_at = text.find(MODULE_MARKER);

    Fragments {
        overview: overview_at.and_then(|at| section(text, at, OVERVIEW_MARKER, module_at)),
        module: module_at.and_then(|at| section(text, at, MODULE_MARKER, overview_at)),
    }
}

/// Text between a marker and the other marker (if it comes later) or the end.
fn section(text: &str, at: usize, marker: &str, other_at: Option<usize>) -> Option<String> {
    let start = at + marker.len();
    let end = other_at.filter(|&o| o > at).unwrap_or(text.len());
    if end <= start {
        return None;
    }
    let cleaned = strip_fences(&text[start..end]);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Drops Markdown fence lines (```` ``` ```` / ```` ```mermaid ````) and trims.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
