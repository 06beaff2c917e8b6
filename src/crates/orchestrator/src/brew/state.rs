//! Brew graph state
//!
//! The executor stores state as a JSON object; nodes read it through the typed
//! [`BrewState`] view and write partial JSON updates back. `worker_reports` is
//! the only field several nodes write in one superstep, so it is the only
//! field with an append reducer.

use langgraph_core::{AppendReducer, StateSchema};
use llm::{Message, MessageRole, ModelOptions};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Kind of worker an assignment is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Research,
    Content,
    Analytics,
    Social,
    General,
    Reviewer,
    Strategist,
}

impl WorkerKind {
    /// Workers the planner may assign directly
    pub const PLANNABLE: [WorkerKind; 5] = [
        WorkerKind::Research,
        WorkerKind::Content,
        WorkerKind::Analytics,
        WorkerKind::Social,
        WorkerKind::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Research => "research",
            WorkerKind::Content => "content",
            WorkerKind::Analytics => "analytics",
            WorkerKind::Social => "social",
            WorkerKind::General => "general",
            WorkerKind::Reviewer => "reviewer",
            WorkerKind::Strategist => "strategist",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WorkerKind::Research => "Research Specialist",
            WorkerKind::Content => "Content Strategist",
            WorkerKind::Analytics => "Analytics Specialist",
            WorkerKind::Social => "Social Media Strategist",
            WorkerKind::General => "General Assistant",
            WorkerKind::Reviewer => "Research Reviewer",
            WorkerKind::Strategist => "Strategist",
        }
    }

    /// Whether the worker gets the tool registry
    pub fn uses_tools(&self) -> bool {
        matches!(
            self,
            WorkerKind::Research | WorkerKind::Content | WorkerKind::Analytics | WorkerKind::Social
        )
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_PRIORITY: u8 = 2;

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Accept any integer (or null) and clamp it into 1..=3
fn clamped_priority<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.map_or(DEFAULT_PRIORITY, |p| p.clamp(1, 3) as u8))
}

/// One unit of work for one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub worker: WorkerKind,
    pub task: String,
    /// 1 is the highest priority
    #[serde(default = "default_priority", deserialize_with = "clamped_priority")]
    pub priority: u8,
}

impl TaskAssignment {
    pub fn new(worker: WorkerKind, task: impl Into<String>, priority: u8) -> Self {
        Self {
            worker,
            task: task.into(),
            priority: priority.clamp(1, 3),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tasks: Vec<TaskAssignment>,
}

impl TaskPlan {
    pub fn new(reasoning: impl Into<String>, tasks: Vec<TaskAssignment>) -> Self {
        Self {
            reasoning: reasoning.into(),
            tasks,
        }
    }

    /// A plan with no tasks; the planner answers directly
    pub fn direct() -> Self {
        Self::new("Direct response", Vec::new())
    }

    /// A single general task carrying the raw request
    pub fn general(reasoning: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(reasoning, vec![TaskAssignment::new(WorkerKind::General, text, 1)])
    }

    /// Stable sort by ascending priority; ties keep plan order
    pub fn sorted(mut self) -> Self {
        self.tasks.sort_by_key(|task| task.priority);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Schema the planner's structured output must satisfy
    pub fn json_schema() -> Value {
        let workers: Vec<&str> = WorkerKind::PLANNABLE.iter().map(WorkerKind::as_str).collect();
        json!({
            "type": "object",
            "properties": {
                "reasoning": {"type": "string"},
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "worker": {"type": "string", "enum": workers},
                            "task": {"type": "string"},
                            "priority": {"type": "integer", "minimum": 1, "maximum": 3}
                        },
                        "required": ["worker", "task", "priority"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["reasoning", "tasks"],
            "additionalProperties": false
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Success,
    Partial,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Success => "success",
            ReportStatus::Partial => "partial",
            ReportStatus::Failed => "failed",
        }
    }
}

/// Outcome of one worker invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker: WorkerKind,
    pub task: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl WorkerReport {
    pub fn success(worker: WorkerKind, task: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            worker,
            task: task.into(),
            status: ReportStatus::Success,
            result: result.into(),
            sources: Vec::new(),
        }
    }

    pub fn failed(worker: WorkerKind, task: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Failed,
            ..Self::success(worker, task, result)
        }
    }
}

/// Typed view of the brew graph state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrewState {
    pub messages: Vec<Message>,
    pub task_plan: Option<TaskPlan>,
    pub worker_reports: Vec<WorkerReport>,
    /// Index of the assignment in flight (sequential dispatch)
    pub next_task_index: usize,
    /// Assignment handed to the worker about to run
    pub assignment: Option<TaskAssignment>,
    /// Findings accumulated across research rounds of one assignment
    pub research_data: String,
    /// Research attempts made for the current assignment
    pub iteration_count: u32,
    /// Latest reviewer verdict
    pub critique: String,
    pub final_response: String,
    pub status: String,
    pub model_options: ModelOptions,
}

impl BrewState {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Text of the most recent user message
    pub fn last_user_text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::User)
            .map(Message::text)
            .unwrap_or_default()
    }

    /// Assignment at the cursor, if the plan has one
    pub fn current_assignment(&self) -> Option<&TaskAssignment> {
        self.task_plan
            .as_ref()
            .and_then(|plan| plan.tasks.get(self.next_task_index))
    }
}

/// Reducers of the brew graph
pub fn brew_schema() -> StateSchema {
    StateSchema::new()
        .with_field("worker_reports", Box::new(AppendReducer))
        .with_default("worker_reports", json!([]))
        .with_default("next_task_index", json!(0))
}
