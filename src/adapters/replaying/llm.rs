//! Replaying adapter for the `LlmClient` port.

use std::path::Path;
use std::sync::Mutex;

use super::replay_result;
use crate::cassette::{Cassette, CassetteReplayer};
use crate::ports::llm::{GenerationFuture, GenerationRequest, GenerationResponse, LlmClient};

/// Serves recorded generation results from a cassette.
pub struct ReplayingLlmClient {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingLlmClient {
    /// Creates a client backed by an already-loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        Self { replayer: Mutex::new(CassetteReplayer::new(cassette)) }
    }

    /// Loads the cassette at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the cassette cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        Ok(Self::new(&Cassette::load(path)?))
    }

    /// Builds a cassette-free client from a list of canned outcomes.
    ///
    /// `Ok(text)` is served as a successful generation and `Err(message)`
    /// as a failed one, in order.
    #[must_use]
    pub fn scripted(outcomes: &[Result<&str, &str>]) -> Self {
        let mut recorder = crate::cassette::CassetteRecorder::new("", "scripted");
        for outcome in outcomes {
            let output = match outcome {
                Ok(text) => serde_json::json!({ "Ok": { "text": text } }),
                Err(message) => serde_json::json!({ "Err": message }),
            };
            recorder.record("llm", "generate", serde_json::Value::Null, output);
        }
        Self::new(&recorder.into_cassette())
    }
}

impl LlmClient for ReplayingLlmClient {
    fn generate(&self, _request: &GenerationRequest) -> GenerationFuture<'_> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            replayer.next_interaction("llm", "generate").output
        };
        Box::pin(async move { replay_result::<GenerationResponse>(output, "llm::generate") })
    }
}
