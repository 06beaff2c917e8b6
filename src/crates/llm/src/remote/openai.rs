//! OpenAI-compatible `/chat/completions` client.
//!
//! Works against OpenAI and any service exposing the same wire format.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{ChatModel, ChatRequest, Message, OpenAiCompatClient, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-4.1")?;
//! let client = OpenAiCompatClient::new(config)?;
//! let response = client.chat(ChatRequest::new(vec![Message::user("Hello!")])).await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::messages::{Message, MessageRole};
use crate::request::{ChatRequest, ChatResponse, ToolCall, UsageMetadata};
use crate::traits::{ChatModel, TokenStream};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn convert_message(msg: &Message) -> OpenAiMessage {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };
        let tool_calls = if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|call| OpenAiToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: OpenAiFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        OpenAiMessage {
            role: role.to_string(),
            content: Some(msg.text()),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> OpenAiRequest {
        let tools = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect::<Vec<_>>();

        let response_format = request.response_format.as_ref().map(|format| {
            json!({
                "type": "json_schema",
                "json_schema": { "name": format.name, "schema": format.schema },
            })
        });

        OpenAiRequest {
            model: request
                .options
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            response_format,
            reasoning: request.options.reasoning.clone(),
            reasoning_effort: request.options.reasoning_effort.clone(),
            stream,
        }
    }

    fn convert_response(resp: OpenAiResponse) -> Result<ChatResponse> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments));
                ToolCall::new(call.id, call.function.name, arguments)
            })
            .collect();

        let message = Message::assistant(choice.message.content.unwrap_or_default())
            .with_tool_calls(tool_calls);

        let usage = resp.usage.map(|u| UsageMetadata {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            reasoning_tokens: u.completion_tokens_details.and_then(|d| d.reasoning_tokens),
        });

        Ok(ChatResponse { message, usage })
    }

    async fn send(&self, body: &OpenAiRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut req = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body);
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        tracing::debug!(model = %body.model, stream = body.stream, "Sending completion request");
        let response = req.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 => LlmError::AuthenticationError(error_text),
            429 => LlmError::RateLimitExceeded(error_text),
            code => LlmError::ProviderError {
                status: code,
                message: error_text,
            },
        })
    }
}

/// Token deltas in one server-sent-events line, `None` for `[DONE]`
fn parse_sse_line(line: &str) -> Option<Result<Option<String>>> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return None;
    }
    let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(e.into())),
    };
    let token = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|t| !t.is_empty());
    Some(Ok(token))
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = self.build_body(&request, false);
        let response = self.send(&body).await?;
        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Self::convert_response(parsed)
    }

    async fn stream(&self, request: ChatRequest) -> Result<TokenStream> {
        let body = self.build_body(&request, true);
        let response = self.send(&body).await?;
        let mut bytes = response.bytes_stream();

        let tokens = async_stream::stream! {
            let mut buffer = String::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::from(e));
                        break 'read;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(idx) = buffer.find('\n') {
                    let line: String = buffer.drain(..=idx).collect();
                    match parse_sse_line(&line) {
                        None if line.contains("[DONE]") => break 'read,
                        None => {}
                        Some(Ok(Some(token))) => yield Ok::<String, LlmError>(token),
                        Some(Ok(None)) => {}
                        Some(Err(e)) => {
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(tokens))
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    #[serde(default)]
    completion_tokens_details: Option<OpenAiCompletionTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionTokensDetails {
    reasoning_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelOptions;
    use crate::request::{ResponseFormat, ToolSpec};

    fn client(model: &str) -> OpenAiCompatClient {
        OpenAiCompatClient::new(RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", model))
            .unwrap()
    }

    #[test]
    fn test_message_conversion_all_roles() {
        let sys = OpenAiCompatClient::convert_message(&Message::system("You are helpful"));
        assert_eq!(sys.role, "system");
        assert_eq!(sys.content.as_deref(), Some("You are helpful"));

        let user = OpenAiCompatClient::convert_message(&Message::user("Hello"));
        assert_eq!(user.role, "user");

        let tool = OpenAiCompatClient::convert_message(&Message::tool("call_1", "42"));
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_assistant_tool_calls_serialize_arguments_as_string() {
        let msg = Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_1",
            "tavily_search",
            json!({"query": "rust"}),
        )]);
        let converted = OpenAiCompatClient::convert_message(&msg);
        let calls = converted.tool_calls.unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"query":"rust"}"#);
        assert_eq!(calls[0].kind, "function");
    }

    #[test]
    fn test_body_carries_options_tools_and_format() {
        let request = ChatRequest::new(vec![Message::user("hi")])
            .with_tools(vec![ToolSpec::new("search", "web search", json!({"type": "object"}))])
            .with_response_format(ResponseFormat::json_schema("Plan", json!({"type": "object"})))
            .with_options(ModelOptions::for_model("o3-mini", true));
        let body = serde_json::to_value(client("gpt-4.1").build_body(&request, false)).unwrap();

        assert_eq!(body["model"], "o3-mini");
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert_eq!(body["response_format"]["json_schema"]["name"], "Plan");
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn test_default_model_used_without_override() {
        let body = client("gpt-4.1").build_body(&ChatRequest::new(vec![]), true);
        assert_eq!(body.model, "gpt-4.1");
        assert!(body.stream);
        assert!(body.tools.is_none());
    }

    #[test]
    fn test_response_conversion_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "scrape_competitor_page", "arguments": "{\"url\":\"https://a.io\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20}
        });
        let response =
            OpenAiCompatClient::convert_response(serde_json::from_value(raw).unwrap()).unwrap();
        assert_eq!(response.tool_calls()[0].arguments["url"], "https://a.io");
        assert_eq!(response.text(), "");
        assert_eq!(response.usage.unwrap().output_tokens, 20);
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let raw = json!({"choices": []});
        let err = OpenAiCompatClient::convert_response(serde_json::from_value(raw).unwrap()).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_sse_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap().unwrap(), Some("Hel".to_string()));
        assert!(parse_sse_line("data: [DONE]").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
        let empty = r#"data: {"choices":[{"delta":{}}]}"#;
        assert_eq!(parse_sse_line(empty).unwrap().unwrap(), None);
    }
}
