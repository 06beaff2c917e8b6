//! Request and response bodies

use crate::config::ChatMode;
use crate::investigator::ResearchPlan;
use llm::Message;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_ID: &str = "default-thread";

fn default_thread_id() -> String {
    DEFAULT_THREAD_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub thinking: Option<bool>,
    /// `brew`, `brew_parallel`, `brew_sequential`, `search` or `research`;
    /// anything else runs brew with the configured dispatch
    #[serde(default)]
    pub mode: Option<String>,
}

impl ChatRequest {
    pub fn chat_mode(&self) -> ChatMode {
        ChatMode::from_request(self.mode.as_deref())
    }
}

/// Body of `POST /api/investigator/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub topic: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub thinking: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub thread_id: String,
    pub plan: ResearchPlan,
}

/// Body of `POST /api/investigator/approve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub thread_id: String,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub status: String,
    pub thread_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchMode;
    use llm::MessageRole;

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages": [{"role": "human", "content": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(request.thread_id, DEFAULT_THREAD_ID);
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert!(request.mode.is_none());
        assert_eq!(request.chat_mode(), ChatMode::Brew(None));

        let request: ChatRequest = serde_json::from_str(
            r#"{"messages": [], "thread_id": "t1", "mode": "parallel", "thinking": true}"#,
        )
        .unwrap();
        assert_eq!(request.chat_mode(), ChatMode::Brew(Some(DispatchMode::Parallel)));
        assert_eq!(request.thinking, Some(true));

        let request: ChatRequest =
            serde_json::from_str(r#"{"messages": [], "mode": "research"}"#).unwrap();
        assert_eq!(request.chat_mode(), ChatMode::Research);
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages": [], "mode": "turbo"}"#).unwrap();
        assert_eq!(request.chat_mode(), ChatMode::Brew(None));
    }

    #[test]
    fn test_approve_feedback_defaults_to_empty() {
        let request: ApproveRequest = serde_json::from_str(r#"{"thread_id": "t"}"#).unwrap();
        assert!(request.feedback.is_empty());
    }
}
