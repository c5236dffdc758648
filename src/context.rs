//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::adapters::live::{LiveClock, LiveFileSystem, LiveLlmClient};
use crate::adapters::recording::RecordingLlmClient;
use crate::adapters::replaying::ReplayingLlmClient;
use crate::cassette::CassetteRecorder;
use crate::config::ProviderConfig;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::llm::LlmClient;

/// Environment variable naming a cassette file to record generation calls into.
pub const RECORD_ENV: &str = "CODEMAPPER_RECORD";
/// Environment variable naming a cassette file to replay generation calls from.
pub const REPLAY_ENV: &str = "CODEMAPPER_REPLAY";

/// Bundles all port trait objects into a single context.
///
/// Constructors wire up different adapter implementations (live,
/// recording, replaying).
pub struct ServiceContext {
    /// Clock for log timestamps.
    pub clock: Box<dyn Clock>,
    /// Filesystem for batch reads and snapshot writes.
    pub fs: Box<dyn FileSystem>,
    /// Language model used for diagram generation.
    pub llm: Box<dyn LlmClient>,
    /// Cassette recorder shared with the recording LLM adapter; saved on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Assembles a context from explicit adapters.
    #[must_use]
    pub fn new(clock: Box<dyn Clock>, fs: Box<dyn FileSystem>, llm: Box<dyn LlmClient>) -> Self {
        Self { clock, fs, llm, recorder: None }
    }

    /// Creates a live context calling the configured provider.
    #[must_use]
    pub fn live(provider: ProviderConfig) -> Self {
        Self::new(
            Box::new(LiveClock),
            Box::new(LiveFileSystem),
            Box::new(LiveLlmClient::new(provider)),
        )
    }

    /// Creates a live context that also records every generation call to `path`.
    ///
    /// The cassette is written when the context is dropped.
    #[must_use]
    pub fn recording(provider: ProviderConfig, path: &Path) -> Self {
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "codemapper-session")));
        let llm = RecordingLlmClient::new(
            Box::new(LiveLlmClient::new(provider)),
            Arc::clone(&recorder),
        );
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(llm),
            recorder: Some(recorder),
        }
    }

    /// Creates a context whose generation calls are answered from a cassette.
    ///
    /// Clock and filesystem stay live, so a recorded run can be reproduced
    /// against the same project tree without network access.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying_llm(path: &Path) -> Result<Self, String> {
        let llm = ReplayingLlmClient::from_file(path)?;
        Ok(Self::new(Box::new(LiveClock), Box::new(LiveFileSystem), Box::new(llm)))
    }

    /// Picks the context for a CLI run from the environment.
    ///
    /// `CODEMAPPER_REPLAY` wins over provider configuration; otherwise the
    /// provider is read via `provider` and `CODEMAPPER_RECORD` optionally
    /// enables recording.
    ///
    /// # Errors
    ///
    /// Returns an error string if the cassette cannot be loaded or the
    /// provider configuration is invalid.
    pub fn from_env<F>(provider: F) -> Result<Self, String>
    where
        F: FnOnce() -> crate::error::Result<ProviderConfig>,
    {
        if let Some(path) = env_path(REPLAY_ENV) {
            info!(cassette = %path.display(), "replaying generation calls");
            return Self::replaying_llm(&path);
        }
        let provider = provider().map_err(|e| e.to_string())?;
        info!(provider = %provider.provider, model = %provider.model, "using live provider");
        Ok(match env_path(RECORD_ENV) {
            Some(path) => {
                info!(cassette = %path.display(), "recording generation calls");
                Self::recording(provider, &path)
            }
            None => Self::live(provider),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let Ok(guard) = recorder.lock() else {
            warn!("cassette recorder lock poisoned; recording lost");
            return;
        };
        match guard.save() {
            Ok(path) => info!(cassette = %path.display(), calls = guard.len(), "recording saved"),
            Err(e) => warn!(error = %e, "failed to write cassette"),
        }
    }
}
