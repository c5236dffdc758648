//! Records interactions into a cassette file.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction};
use crate::error::Result;

/// Accumulates interactions and writes them as YAML when finished.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder that will write to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            interactions: Vec::new(),
        }
    }

    /// Appends an interaction; `seq` is its position in the cassette.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Number of interactions captured so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Converts the recording into an in-memory cassette without writing it.
    #[must_use]
    pub fn into_cassette(self) -> Cassette {
        Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            interactions: self.interactions,
        }
    }

    /// Writes everything recorded so far and returns the cassette path.
    ///
    /// The recorder stays usable; a later call rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if serialization or the write fails.
    pub fn save(&self) -> Result<PathBuf> {
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, yaml)?;
        Ok(self.path.clone())
    }

    /// Writes the cassette and consumes the recorder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if serialization or the write fails.
    pub fn finish(self) -> Result<PathBuf> {
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finish_writes_sequenced_interactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cassettes/run.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "run");
        assert!(recorder.is_empty());
        recorder.record("llm", "generate", json!({"prompt": "a"}), json!({"Ok": {"text": "1"}}));
        recorder.record("llm", "generate", json!({"prompt": "b"}), json!({"Err": "boom"}));
        assert_eq!(recorder.len(), 2);

        let written = recorder.finish().unwrap();
        assert_eq!(written, path);

        let cassette = Cassette::load(&path).unwrap();
        assert_eq!(cassette.name, "run");
        let seqs: Vec<u64> = cassette.interactions.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(cassette.interactions[1].output, json!({"Err": "boom"}));
    }

    #[test]
    fn save_into_a_file_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "occupied").unwrap();

        let mut recorder = CassetteRecorder::new(blocker.join("run.yaml"), "run");
        recorder.record("llm", "generate", json!({}), json!({"Ok": {"text": "1"}}));

        let err = recorder.save().unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)), "{err:?}");
        assert!(err.to_string().starts_with("IO error"));
        // The recorder keeps its interactions after a failed save.
        assert_eq!(recorder.len(), 1);
    }
}
