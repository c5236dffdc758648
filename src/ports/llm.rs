//! LLM client port: the single text-generation call made per batch.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use super::PortError;

/// Boxed future type alias used by [`LlmClient`] to keep the trait dyn-compatible.
pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationResponse, PortError>> + Send + 'a>>;

/// A request for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Instructions describing the response protocol.
    pub system: String,
    /// Diagram state, project tree and batch contents.
    pub prompt: String,
}

/// The text returned by a generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResponse {
    /// The generated text.
    pub text: String,
}

/// Sends generation requests to a language model.
pub trait LlmClient: Send + Sync {
    /// Generates text for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, auth, non-2xx status, etc.).
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_>;
}
