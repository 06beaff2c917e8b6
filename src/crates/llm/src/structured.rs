//! Structured output helpers

use crate::error::{LlmError, Result};
use crate::messages::Message;
use crate::request::{ChatRequest, ResponseFormat};
use crate::traits::ChatModel;
use crate::config::ModelOptions;
use serde::de::DeserializeOwned;

/// Strip a surrounding markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output as `T`
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(strip_code_fences(text)).map_err(|e| LlmError::ParseError(e.to_string()))
}

/// Ask `model` for an answer constrained to `format` and parse it as `T`
pub async fn chat_structured<T: DeserializeOwned>(
    model: &dyn ChatModel,
    messages: Vec<Message>,
    format: ResponseFormat,
    options: ModelOptions,
) -> Result<T> {
    let name = format.name.clone();
    let request = ChatRequest::new(messages)
        .with_response_format(format)
        .with_options(options);
    let text = model.chat(request).await?.text();
    parse_structured(&text).map_err(|e| {
        tracing::warn!(schema = %name, error = %e, "Structured output did not parse");
        e
    })
}
