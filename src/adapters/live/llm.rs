//! Live adapter for the `LlmClient` port.
//!
//! Speaks three wire formats: Gemini `generateContent`, OpenAI-compatible
//! chat completions, and the Anthropic messages API.

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{Provider, ProviderConfig};
use crate::ports::llm::{GenerationFuture, GenerationRequest, GenerationResponse, LlmClient};
use crate::ports::PortError;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 8192;

/// Live LLM client that calls the configured provider over HTTP.
pub struct LiveLlmClient {
    client: Client,
    config: ProviderConfig,
}

impl LiveLlmClient {
    /// Creates a client for the given provider configuration.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self { client: Client::new(), config }
    }

    fn build(&self, request: &GenerationRequest) -> Result<RequestBuilder, PortError> {
        let key = self.config.api_key.as_str();
        let needs_key = self.config.provider != Provider::OpenAi;
        if needs_key && key.is_empty() {
            return Err(format!("missing API key for the {} provider", self.config.provider).into());
        }

        let builder = match self.config.provider {
            Provider::Gemini => {
                let url = format!("{GEMINI_API_URL}/{}:generateContent", self.config.model);
                let body = GeminiRequest {
                    system_instruction: GeminiContent {
                        role: None,
                        parts: vec![GeminiPart { text: &request.system }],
                    },
                    contents: vec![GeminiContent {
                        role: Some("user"),
                        parts: vec![GeminiPart { text: &request.prompt }],
                    }],
                };
                self.client.post(url).header("x-goog-api-key", key).json(&body)
            }
            Provider::OpenAi => {
                let url = format!("{}/chat/completions", self.config.base_url);
                let body = OpenAiRequest {
                    model: &self.config.model,
                    messages: vec![
                        ChatMessage { role: "system", content: &request.system },
                        ChatMessage { role: "user", content: &request.prompt },
                    ],
                };
                let builder = self.client.post(url).json(&body);
                if key.is_empty() {
                    builder
                } else {
                    builder.bearer_auth(key)
                }
            }
            Provider::Anthropic => {
                let body = AnthropicRequest {
                    model: &self.config.model,
                    max_tokens: ANTHROPIC_MAX_TOKENS,
                    system: &request.system,
                    messages: vec![ChatMessage { role: "user", content: &request.prompt }],
                };
                self.client
                    .post(ANTHROPIC_API_URL)
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
        };
        Ok(builder)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiTextPart>,
}

#[derive(Deserialize)]
struct GeminiTextPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

/// Error envelope shared by all three providers.
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extracts the generated text from a successful response body.
fn extract_text(provider: Provider, body: &str) -> Result<String, PortError> {
    let parse_err = |e: serde_json::Error| -> PortError {
        format!("Failed to parse {provider} response: {e}").into()
    };

    let text = match provider {
        Provider::Gemini => {
            let response: GeminiResponse = serde_json::from_str(body).map_err(parse_err)?;
            response
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
        }
        Provider::OpenAi => {
            let response: OpenAiResponse = serde_json::from_str(body).map_err(parse_err)?;
            response.choices.into_iter().next().and_then(|c| c.message.content)
        }
        Provider::Anthropic => {
            let response: AnthropicResponse = serde_json::from_str(body).map_err(parse_err)?;
            Some(response.content.into_iter().map(|b| b.text).collect::<String>())
        }
    };

    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(format!("{provider} returned no text").into()),
    }
}

/// Formats a non-2xx response, preferring the provider's own error message.
fn status_error(provider: Provider, status: u16, body: &str) -> PortError {
    let msg = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    format!("{provider} API error ({status}): {msg}").into()
}

impl LlmClient for LiveLlmClient {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        let provider = self.config.provider;
        let built = self.build(request);

        Box::pin(async move {
            let response = built?.send().await.map_err(|e| -> PortError {
                format!("{provider} API request failed: {e}").into()
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| -> PortError {
                format!("Failed to read {provider} API response: {e}").into()
            })?;

            if !status.is_success() {
                return Err(status_error(provider, status.as_u16(), &body));
            }

            let text = extract_text(provider, &body)?;
            Ok(GenerationResponse { text })
        })
    }
}
