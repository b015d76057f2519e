//! VLM interaction: build the vision request and call the provider once.
//!
//! Prompt text lives in [`crate::prompts`]; this module only assembles the
//! messages, enforces the call timeout and maps provider errors. There is no
//! retry: a failed call is reported upward and the extraction fails.

use crate::config::ExtractionConfig;
use crate::document::DocumentType;
use crate::error::ExtractionError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Ask the model to extract fields from one document image.
///
/// ## Message Layout
///
/// 1. **System message**: the extraction-assistant instruction (or the
///    configured override)
/// 2. **User message**: the type-specific prompt plus the PNG attachment
///
/// Returns the raw completion text.
pub async fn invoke_model(
    provider: &Arc<dyn LLMProvider>,
    image: ImageData,
    document_type: &DocumentType,
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<String, ExtractionError> {
    let start = Instant::now();
    let messages = build_messages(image, prompt, config);
    let options = build_options(config);
    let secs = config.api_timeout_secs;

    let response = tokio::time::timeout(
        Duration::from_secs(secs),
        provider.chat(&messages, Some(&options)),
    )
    .await
    .map_err(|_| {
        warn!("{}: LLM call timed out after {}s", document_type, secs);
        ExtractionError::InvocationTimeout { secs }
    })?
    .map_err(|e| {
        warn!("{}: LLM call failed: {}", document_type, e);
        ExtractionError::InvocationFailed {
            message: e.to_string(),
        }
    })?;

    debug!(
        "{}: {} input tokens, {} output tokens, {:?}",
        document_type,
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );

    if response.content.trim().is_empty() {
        return Err(ExtractionError::EmptyCompletion);
    }
    Ok(response.content)
}

fn build_messages(image: ImageData, prompt: &str, config: &ExtractionConfig) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(prompt, vec![image]),
    ]
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(300));
    }

    #[test]
    fn request_has_system_and_user_turns() {
        let image = ImageData::new("iVBORw0KGgo=".to_string(), "image/png");
        let messages = build_messages(image, "extract", &ExtractionConfig::default());
        assert_eq!(messages.len(), 2);
    }
}
