//! Scripted collaborators for tests
//!
//! [`ScriptedModel`] answers every request through a closure, so a test can
//! branch on the system prompt or the last user message and count calls.
//! [`ScriptedTool`] does the same for tools.

use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, Message, MessageRole};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

type Responder = dyn Fn(&ChatRequest) -> llm::Result<ChatResponse> + Send + Sync;

/// A [`ChatModel`] driven by a closure
pub struct ScriptedModel {
    responder: Box<Responder>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ChatRequest) -> llm::Result<ChatResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answer with `text`
    pub fn constant(text: impl Into<String>) -> Arc<Self> {
        let text = text.into();
        Self::new(move |_| Ok(reply(&text)))
    }

    /// Fail every call
    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        let message = message.into();
        Self::new(move |_| Err(LlmError::InvalidResponse(message.clone())))
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of calls whose system prompt contains `needle`
    pub fn calls_with_system(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| system_text(request).contains(needle))
            .count()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        let response = (self.responder)(&request);
        self.requests.lock().push(request);
        response
    }
}

/// Assistant reply with plain text
pub fn reply(text: &str) -> ChatResponse {
    ChatResponse::new(Message::assistant(text))
}

/// Assistant reply carrying a structured JSON answer
pub fn structured(value: Value) -> ChatResponse {
    ChatResponse::new(Message::assistant(value.to_string()))
}

/// Text of the system message of `request`
pub fn system_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .find(|msg| msg.role == MessageRole::System)
        .map(Message::text)
        .unwrap_or_default()
}

/// Text of the last user message of `request`
pub fn user_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|msg| msg.role == MessageRole::User)
        .map(Message::text)
        .unwrap_or_default()
}

type ToolResponder = dyn Fn(&Value) -> Result<String, ToolError> + Send + Sync;

/// A [`Tool`] driven by a closure
pub struct ScriptedTool {
    name: String,
    responder: Box<ToolResponder>,
    calls: Mutex<Vec<Value>>,
}

impl ScriptedTool {
    pub fn new<F>(name: impl Into<String>, responder: F) -> Arc<Self>
    where
        F: Fn(&Value) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted tool"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        self.calls.lock().push(args.clone());
        (self.responder)(&args)
    }
}
