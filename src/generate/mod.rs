//! Generation adapter: one model call per batch, turned into a diagram update.

pub mod parse;
pub mod prompt;

pub use parse::{parse_response, Fragments, MODULE_MARKER, OVERVIEW_MARKER};
pub use prompt::{build_prompt, system_prompt, BatchContext, SourceFile};

use tracing::debug;

use crate::diagram::DiagramUpdate;
use crate::error::{Error, Result};
use crate::ports::llm::{GenerationRequest, LlmClient};

/// Sends the batch to the model and parses the answer.
///
/// Sections missing from the response come back as `None` in the update so
/// the previous diagram is kept.
///
/// # Errors
///
/// Returns [`Error::Generation`] if the call itself fails. Nothing is applied
/// anywhere in that case.
pub async fn generate_diagrams(
    llm: &dyn LlmClient,
    batch: &BatchContext<'_>,
) -> Result<DiagramUpdate> {
    let request = GenerationRequest {
        system: system_prompt(),
        prompt: build_prompt(batch),
    };
    debug!(
        module = batch.module_name,
        files = batch.files.len(),
        prompt_chars = request.prompt.len(),
        "sending batch"
    );

    let response = llm.generate(&request).await.map_err(|e| Error::Generation(e.to_string()))?;
    let Fragments { overview, module } = parse_response(&response.text);

    Ok(DiagramUpdate {
        overview,
        module_name: batch.module_name.to_string(),
        module,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::ReplayingLlmClient;

    fn batch<'a>(files: &'a [SourceFile]) -> BatchContext<'a> {
        BatchContext { overview: "C4Context", module_name: "src", module: None, files, tree: "" }
    }

    #[tokio::test]
    async fn successful_response_becomes_update() {
        let llm = ReplayingLlmClient::scripted(&[Ok(
            "---OVERVIEW---\nC4Context\n  v2\n---MODULE---\n```mermaid\nC4Component\n```",
        )]);
        let files = [SourceFile::new("src/lib.rs", "pub fn x() {}", 100)];

        let update = generate_diagrams(&llm, &batch(&files)).await.unwrap();

        assert_eq!(update.overview.as_deref(), Some("C4Context\n  v2"));
        assert_eq!(update.module.as_deref(), Some("C4Component"));
        assert_eq!(update.module_name, "src");
    }

    #[tokio::test]
    async fn transport_failure_is_a_generation_error() {
        let llm = ReplayingLlmClient::scripted(&[Err("gemini API error (503): overloaded")]);
        let err = generate_diagrams(&llm, &batch(&[])).await.unwrap_err();
        assert!(matches!(err, Error::Generation(ref m) if m.contains("503")));
    }
}
