//! Run settings and language-model provider configuration.

use std::fmt;
use std::path::PathBuf;

use crate::batch::BatchLimits;
use crate::error::{Error, Result};

/// Default base URL for OpenAI-compatible endpoints.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Source extensions scanned when no allow-list is given.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "jsx", "ts", "tsx", "java", "kt", "scala", "rb", "php", "cs", "c",
    "h", "cc", "cpp", "hpp", "swift", "m", "vue", "svelte", "ex", "exs", "erl", "clj", "hs",
    "ml", "lua", "dart", "sql", "proto", "graphql", "sh",
];

/// Directory names never descended into.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
    ".idea",
    ".vscode",
];

/// Everything the run loop needs besides the ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Batch size limits handed to the planner.
    pub limits: BatchLimits,
    /// Per-file character ceiling applied when building the prompt.
    pub max_file_chars: usize,
    /// Number of log entries kept in a persisted snapshot.
    pub log_tail: usize,
    /// Extension allow-list (without the leading dot, compared case-insensitively).
    pub extensions: Vec<String>,
    /// Directory names skipped during the scan.
    pub ignore_dirs: Vec<String>,
    /// Where `diagram.mmd` and `codemapper_state.json` are written.
    pub output_dir: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            limits: BatchLimits::default(),
            max_file_chars: 20_000,
            log_tail: 200,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| (*s).to_string()).collect(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
}

impl Provider {
    /// Parses the `LLM_PROVIDER` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for names that are not recognised.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(Error::Config(format!(
                "unknown LLM_PROVIDER {other:?} (expected gemini, openai or anthropic)"
            ))),
        }
    }

    /// Model used when `MODEL_NAME` is unset.
    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

/// Which endpoint to call and with what credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Selected backend.
    pub provider: Provider,
    /// Credential; may be empty only for custom OpenAI-compatible endpoints.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL for OpenAI-compatible endpoints.
    pub base_url: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderConfig {
    /// Reads `LLM_PROVIDER`, `API_KEY`, `MODEL_NAME` and `OPENAI_BASE_URL`
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider is unknown or its credential is missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider is unknown or its credential is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = Provider::parse(&var("LLM_PROVIDER").unwrap_or_default())?;
        let api_key = var("API_KEY").unwrap_or_default();
        let model = var("MODEL_NAME").unwrap_or_else(|| provider.default_model().to_string());
        let custom_base = var("OPENAI_BASE_URL");
        let base_url = custom_base
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let key_required = match provider {
            Provider::Gemini | Provider::Anthropic => true,
            Provider::OpenAi => custom_base.is_none(),
        };
        if key_required && api_key.is_empty() {
            return Err(Error::Config(format!(
                "API_KEY is required for the {provider} provider"
            )));
        }

        Ok(Self { provider, api_key, model, base_url })
    }
}
