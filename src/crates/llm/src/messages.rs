//! Chat messages and text extraction.
//!
//! Completion services answer in several shapes: a plain string, a list of
//! typed content blocks (text, reasoning summaries, ...) or some other JSON
//! object. [`MessageContent`] captures all of them and [`extract_text`] maps
//! every shape to plain text without ever failing.

use crate::request::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[serde(alias = "human")]
    User,
    #[serde(alias = "ai")]
    Assistant,
    Tool,
}

/// A typed content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// Reasoning summary; never part of the answer text.
    Reasoning {
        #[serde(default)]
        summary: Value,
    },
    #[serde(other)]
    Unknown,
}

/// Message content in any shape a service may return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Value> for MessageContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => MessageContent::Text(text),
            Value::Array(items) => {
                match serde_json::from_value::<Vec<ContentBlock>>(Value::Array(items.clone())) {
                    Ok(blocks) => MessageContent::Blocks(blocks),
                    Err(_) => MessageContent::Other(Value::Array(items)),
                }
            }
            other => MessageContent::Other(other),
        }
    }
}

/// Plain text of any content shape.
///
/// - text is returned as is
/// - blocks concatenate their `text` parts; reasoning and unknown blocks are skipped
/// - objects carrying a `text` or `content` field yield that field's text
/// - anything else is rendered as JSON
pub fn extract_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect(),
        MessageContent::Other(value) => value_text(value),
    }
}

/// [`extract_text`] over an arbitrary JSON value
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                text.to_string()
            } else if let Some(inner) = map.get("content") {
                extract_text(&MessageContent::from(inner.clone()))
            } else {
                value.to_string()
            }
        }
        Value::Array(_) => match MessageContent::from(value.clone()) {
            MessageContent::Other(other) => other.to_string(),
            content => extract_text(&content),
        },
        other => other.to_string(),
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,

    #[serde(default)]
    pub content: MessageContent,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Tool observation answering the call `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Plain text of the content
    pub fn text(&self) -> String {
        extract_text(&self.content)
    }
}
