//! Investigator graph state
//!
//! `topic` and `research_plan` are identity fields: they use the keep-non-empty
//! reducer, so a resume update that does not re-supply them (or supplies an
//! empty value) never wipes them. `gathered_data` and `revisions` only grow.

use langgraph_core::{AppendReducer, KeepNonEmptyReducer, StateSchema};
use llm::ModelOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn empty_args() -> Value {
    json!({})
}

/// One executable research step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchTask {
    pub name: String,
    pub goal: String,
    /// Tool the task is meant to use
    #[serde(default)]
    pub tool_hint: String,
    /// Concrete arguments for `tool_hint`, e.g. a URL found while scouting
    #[serde(default = "empty_args")]
    pub tool_args: Value,
}

impl ResearchTask {
    pub fn new(name: impl Into<String>, goal: impl Into<String>, tool_hint: impl Into<String>, tool_args: Value) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            tool_hint: tool_hint.into(),
            tool_args,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    #[serde(default)]
    pub tasks: Vec<ResearchTask>,
}

impl ResearchPlan {
    pub fn new(tasks: Vec<ResearchTask>) -> Self {
        Self { tasks }
    }

    /// Single search over the whole topic
    pub fn fallback(topic: &str) -> Self {
        Self::new(vec![ResearchTask::new(
            "General Search",
            format!("Research {topic}"),
            "tavily_search",
            json!({ "query": topic }),
        )])
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "goal": {"type": "string"},
                            "tool_hint": {
                                "type": "string",
                                "enum": ["tavily_search", "scrape_competitor_page", "get_autocomplete_suggestions"]
                            },
                            "tool_args": {"type": "object"}
                        },
                        "required": ["name", "goal", "tool_hint", "tool_args"]
                    }
                }
            },
            "required": ["tasks"]
        })
    }
}

/// What the caller's feedback asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    /// Run the current plan
    Approve,
    /// Plan again with the feedback
    Update,
}

/// Typed view of the investigator state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigatorState {
    pub topic: String,
    pub research_plan: Option<ResearchPlan>,
    /// Feedback of the current review turn; cleared by the executor
    pub user_feedback: String,
    /// Resolved intent of `user_feedback`, when known
    pub feedback_action: Option<FeedbackAction>,
    /// Every feedback the plan was revised for
    pub revisions: Vec<String>,
    pub gathered_data: Vec<String>,
    pub final_report: String,
    pub model_options: ModelOptions,
}

impl InvestigatorState {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

pub fn investigator_schema() -> StateSchema {
    StateSchema::new()
        .with_field("topic", Box::new(KeepNonEmptyReducer))
        .with_field("research_plan", Box::new(KeepNonEmptyReducer))
        .with_field("gathered_data", Box::new(AppendReducer))
        .with_field("revisions", Box::new(AppendReducer))
        .with_default("gathered_data", json!([]))
        .with_default("revisions", json!([]))
}
