//! Research graph state
//!
//! Every field is last-write-wins; each stage owns the fields it writes.

use langgraph_core::StateSchema;
use llm::{Message, MessageRole, ModelOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    Completed,
}

/// One item of the research todo list shown to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchTodo {
    pub content: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl ResearchTodo {
    pub fn pending(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: TodoStatus::Pending,
        }
    }
}

/// Structured planner output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TodoList {
    #[serde(default)]
    pub todos: Vec<String>,
}

impl TodoList {
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["todos"]
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchState {
    pub messages: Vec<Message>,
    /// Question under research, taken from the latest user message
    pub query: String,
    pub todos: Vec<ResearchTodo>,
    /// Discovery agent's annotated source list
    pub discovery: String,
    pub sources: Vec<String>,
    /// Full-text findings of the extraction agent
    pub extracted: String,
    pub final_response: String,
    pub status: String,
    pub model_options: ModelOptions,
}

impl ResearchState {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// `query`, or the latest user message when no query was recorded
    pub fn question(&self) -> String {
        if !self.query.trim().is_empty() {
            return self.query.clone();
        }
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::User)
            .map(Message::text)
            .unwrap_or_default()
    }

    pub fn todo_texts(&self) -> Vec<String> {
        self.todos.iter().map(|t| t.content.clone()).collect()
    }
}

pub fn research_schema() -> StateSchema {
    StateSchema::new()
        .with_default("todos", json!([]))
        .with_default("sources", json!([]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prefers_recorded_query() {
        let state = ResearchState::from_value(&json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "ok"},
                {"role": "user", "content": "state of solid-state batteries"}
            ]
        }))
        .unwrap();
        assert_eq!(state.question(), "state of solid-state batteries");

        let state = ResearchState {
            query: "recorded".into(),
            ..state
        };
        assert_eq!(state.question(), "recorded");
    }

    #[test]
    fn test_todo_wire_format() {
        let todo: ResearchTodo = serde_json::from_value(json!({"content": "search"})).unwrap();
        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(
            serde_json::to_value(ResearchTodo {
                content: "read".into(),
                status: TodoStatus::Completed
            })
            .unwrap(),
            json!({"content": "read", "status": "completed"})
        );
    }
}
