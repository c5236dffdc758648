//! Diagram state: the current Mermaid source per diagram key.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Reserved key of the system-level diagram.
pub const OVERVIEW_KEY: &str = "Overview";

/// Seed for the Overview diagram at the start of a run.
pub const OVERVIEW_TEMPLATE: &str = "C4Context\n    title System Overview\n";

/// Mapping from diagram key to Mermaid source.
///
/// The Overview entry always exists. Entries are only ever inserted or
/// overwritten, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagramSet {
    entries: BTreeMap<String, String>,
}

/// Diagram text produced for one batch. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramUpdate {
    /// Replacement for the Overview diagram.
    pub overview: Option<String>,
    /// Module key the batch resolved to.
    pub module_name: String,
    /// Replacement (or first version) of the module diagram.
    pub module: Option<String>,
}

impl Default for DiagramSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramSet {
    /// Creates a set holding only the seeded Overview diagram.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(OVERVIEW_KEY.to_string(), OVERVIEW_TEMPLATE.to_string());
        Self { entries }
    }

    /// Current Overview source.
    #[must_use]
    pub fn overview(&self) -> &str {
        self.entries.get(OVERVIEW_KEY).map_or(OVERVIEW_TEMPLATE, String::as_str)
    }

    /// Source of the diagram stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of diagrams, Overview included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the Overview entry is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, source)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Module keys (every key except Overview).
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str).filter(|k| *k != OVERVIEW_KEY)
    }

    /// Applies a batch result. Absent fragments leave their diagram untouched.
    pub fn apply(&mut self, update: DiagramUpdate) {
        if let Some(overview) = update.overview {
            self.entries.insert(OVERVIEW_KEY.to_string(), overview);
        }
        // The reserved key only takes overview fragments.
        if let Some(module) = update.module.filter(|_| update.module_name != OVERVIEW_KEY) {
            self.entries.insert(update.module_name, module);
        }
    }
}

impl<'de> Deserialize<'de> for DiagramSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = BTreeMap::<String, String>::deserialize(deserializer)?;
        entries.entry(OVERVIEW_KEY.to_string()).or_insert_with(|| OVERVIEW_TEMPLATE.to_string());
        Ok(Self { entries })
    }
}

impl FromIterator<(String, String)> for DiagramSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.entries.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_seeded_overview() {
        let set = DiagramSet::new();
        assert_eq!(set.overview(), OVERVIEW_TEMPLATE);
        assert_eq!(set.len(), 1);
        assert_eq!(set.modules().count(), 0);
    }

    #[test]
    fn apply_creates_and_replaces_module_entries() {
        let mut set = DiagramSet::new();
        set.apply(DiagramUpdate {
            overview: Some("C4Context\n  v1".into()),
            module_name: "src/api".into(),
            module: Some("C4Component\n  v1".into()),
        });
        set.apply(DiagramUpdate {
            overview: None,
            module_name: "src/api".into(),
            module: Some("C4Component\n  v2".into()),
        });

        assert_eq!(set.overview(), "C4Context\n  v1");
        assert_eq!(set.get("src/api"), Some("C4Component\n  v2"));
        assert_eq!(set.modules().collect::<Vec<_>>(), vec!["src/api"]);
    }

    #[test]
    fn absent_fragments_leave_diagrams_unchanged() {
        let mut set = DiagramSet::new();
        set.apply(DiagramUpdate {
            overview: None,
            module_name: "lib".into(),
            module: None,
        });
        assert_eq!(set.overview(), OVERVIEW_TEMPLATE);
        assert_eq!(set.get("lib"), None);
    }

    #[test]
    fn deserializing_without_overview_reseeds_it() {
        let set: DiagramSet = serde_json::from_str(r#"{"core":"C4Component"}"#).unwrap();
        assert_eq!(set.overview(), OVERVIEW_TEMPLATE);
        assert_eq!(set.get("core"), Some("C4Component"));
    }

    #[test]
    fn serializes_as_a_plain_object() {
        let set: DiagramSet =
            [("Overview".to_string(), "o".to_string()), ("a".to_string(), "m".to_string())]
                .into_iter()
                .collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"{"Overview":"o","a":"m"}"#);
    }
}
