//! Brew graph nodes
//!
//! Every worker runs behind [`Workers::run`], which turns any outcome into
//! exactly one [`WorkerReport`]: a missing assignment, a failing model call or
//! a failing tool call becomes a `failed` report instead of an error, so one
//! broken worker never aborts the graph. Whatever the model still answered
//! after a tool failure is kept in the report.
//!
//! Sequential dispatch adds the research debate loop:
//!
//! ```text
//!  task_router ──→ research ──→ reviewer ──REJECT and rounds left──→ research
//!       ▲                          └──────otherwise──────→ strategist ──┐
//!       └───────────────────────── cursor + 1 ─────────────────────────┘
//! ```
//!
//! Research and reviewer never move the cursor; the strategist advances it
//! and clears the loop fields for the next assignment.

use super::planner::{classify, structured_plan, RequestClass};
use super::prompts;
use super::state::{BrewState, TaskAssignment, TaskPlan, WorkerKind, WorkerReport};
use crate::agent::{stream_text, AgentTask, ToolAgent};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use langgraph_core::{Node, NodeContext, NodeError};
use llm::{ChatModel, ChatRequest, Message, ModelOptions};
use serde_json::{json, Value};
use std::sync::Arc;

const DIRECT_FALLBACK: &str = "Hello! I coordinate research, content, analytics and social media \
specialists. What would you like to work on?";

/// Today's date as used in prompts
pub fn prompt_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

/// Shared dependencies of the worker nodes
pub struct Workers {
    tooled: ToolAgent,
    bare: ToolAgent,
}

impl Workers {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, max_turns: usize) -> Self {
        Self {
            tooled: ToolAgent::new(model.clone(), tools, max_turns),
            bare: ToolAgent::new(model, ToolRegistry::new(), 1),
        }
    }

    fn agent(&self, kind: WorkerKind) -> &ToolAgent {
        if kind.uses_tools() {
            &self.tooled
        } else {
            &self.bare
        }
    }

    /// Run `kind` on `assignment` (or on `prompt` when given) and report.
    ///
    /// The report always names the assignment's task, even when a rewritten
    /// prompt was sent to the model.
    pub async fn run(
        &self,
        kind: WorkerKind,
        assignment: Option<&TaskAssignment>,
        prompt: Option<String>,
        options: &ModelOptions,
        ctx: &NodeContext,
    ) -> WorkerReport {
        let task = assignment.map(|a| a.task.clone()).unwrap_or_default();
        let prompt = prompt.unwrap_or_else(|| task.clone());
        if task.trim().is_empty() || prompt.trim().is_empty() {
            tracing::warn!(worker = %kind, "Worker invoked without an assignment");
            return WorkerReport::failed(kind, "", "Missing assignment.");
        }

        tracing::info!(worker = %kind, thread_id = ctx.thread_id(), "Worker started");
        let system = prompts::worker_system(kind, &prompt_date());
        match self
            .agent(kind)
            .run(AgentTask::new(system, prompt, options.clone()), ctx)
            .await
        {
            Ok(outcome) if outcome.has_tool_errors() => {
                tracing::warn!(worker = %kind, errors = outcome.tool_errors.len(), "Worker tool calls failed");
                let mut result = format!("Worker failed: {}", outcome.tool_errors.join("; "));
                if !outcome.answer.trim().is_empty() {
                    result.push_str("\n\n");
                    result.push_str(outcome.answer.trim());
                }
                let mut report = WorkerReport::failed(kind, task, result);
                report.sources = outcome.sources();
                report
            }
            Ok(outcome) => {
                let mut report = WorkerReport::success(kind, task, outcome.answer.clone());
                report.sources = outcome.sources();
                if report.result.trim().is_empty() {
                    report.status = super::state::ReportStatus::Partial;
                    report.result = "Worker returned no output.".to_string();
                }
                report
            }
            Err(e) => {
                tracing::warn!(worker = %kind, error = %e, "Worker failed");
                WorkerReport::failed(kind, task, format!("Worker failed: {e}"))
            }
        }
    }
}

/// Classifies the request and writes `task_plan`
pub struct PlannerNode {
    model: Arc<dyn ChatModel>,
}

impl PlannerNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    async fn direct_reply(&self, text: &str, options: ModelOptions) -> String {
        let request = ChatRequest::new(vec![
            Message::system(prompts::DIRECT_SYSTEM),
            Message::user(text),
        ])
        .with_options(options);

        match self.model.chat(request).await {
            Ok(response) if !response.text().trim().is_empty() => response.text(),
            Ok(_) => DIRECT_FALLBACK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Direct reply failed, using canned greeting");
                DIRECT_FALLBACK.to_string()
            }
        }
    }
}

#[async_trait]
impl Node for PlannerNode {
    async fn run(&self, input: Value, _ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let text = state.last_user_text();
        let class = classify(&text);
        tracing::info!(?class, "Request classified");

        let update = match class {
            RequestClass::Direct => {
                let reply = self.direct_reply(&text, state.model_options.clone()).await;
                json!({
                    "task_plan": TaskPlan::direct(),
                    "final_response": reply,
                    "status": "Direct response",
                    "next_task_index": 0,
                })
            }
            RequestClass::General => json!({
                "task_plan": TaskPlan::general("General question - no internet needed", text),
                "status": "Planning complete: 1 tasks assigned",
                "next_task_index": 0,
            }),
            RequestClass::Structured => {
                let plan = structured_plan(self.model.as_ref(), &text, state.model_options.clone()).await;
                json!({
                    "status": format!("Planning complete: {} tasks assigned", plan.tasks.len()),
                    "task_plan": plan,
                    "next_task_index": 0,
                })
            }
        };
        Ok(update)
    }
}

/// Publishes the assignment at the cursor for the next worker
pub struct TaskRouterNode;

#[async_trait]
impl Node for TaskRouterNode {
    async fn run(&self, input: Value, _ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let assignment = state.current_assignment().cloned();
        tracing::debug!(
            cursor = state.next_task_index,
            worker = assignment.as_ref().map(|a| a.worker.as_str()),
            "Routing next assignment"
        );
        Ok(json!({ "assignment": assignment }))
    }
}

/// A single-shot worker: content, analytics, social, general.
///
/// With `advance_cursor` the node moves the sequential cursor past its
/// assignment; fan-out copies leave the cursor alone.
pub struct WorkerNode {
    kind: WorkerKind,
    workers: Arc<Workers>,
    advance_cursor: bool,
}

impl WorkerNode {
    pub fn sequential(kind: WorkerKind, workers: Arc<Workers>) -> Self {
        Self {
            kind,
            workers,
            advance_cursor: true,
        }
    }

    pub fn parallel(kind: WorkerKind, workers: Arc<Workers>) -> Self {
        Self {
            kind,
            workers,
            advance_cursor: false,
        }
    }
}

#[async_trait]
impl Node for WorkerNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let report = self
            .workers
            .run(self.kind, state.assignment.as_ref(), None, &state.model_options, &ctx)
            .await;

        let mut update = json!({ "worker_reports": [report] });
        if self.advance_cursor {
            update["next_task_index"] = json!(state.next_task_index + 1);
        }
        Ok(update)
    }
}

/// Research step of the debate loop; accumulates findings across rounds
pub struct ResearchNode {
    workers: Arc<Workers>,
}

impl ResearchNode {
    pub fn new(workers: Arc<Workers>) -> Self {
        Self { workers }
    }
}

#[async_trait]
impl Node for ResearchNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let prompt = match &state.assignment {
            Some(assignment) if !state.critique.is_empty() && !state.research_data.is_empty() => {
                Some(prompts::research_delta(
                    &assignment.task,
                    &state.research_data,
                    &state.critique,
                ))
            }
            _ => None,
        };

        let report = self
            .workers
            .run(
                WorkerKind::Research,
                state.assignment.as_ref(),
                prompt,
                &state.model_options,
                &ctx,
            )
            .await;

        let research_data = if state.research_data.is_empty() {
            report.result.clone()
        } else {
            format!("{}\n\n{}", state.research_data, report.result)
        };
        let iteration = state.iteration_count + 1;
        tracing::info!(iteration, "Research round complete");

        Ok(json!({
            "worker_reports": [report],
            "research_data": research_data,
            "iteration_count": iteration,
        }))
    }
}

/// Critiques the accumulated research with an APPROVE/REJECT verdict
pub struct ReviewerNode {
    workers: Arc<Workers>,
}

impl ReviewerNode {
    pub fn new(workers: Arc<Workers>) -> Self {
        Self { workers }
    }
}

#[async_trait]
impl Node for ReviewerNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let prompt = state
            .assignment
            .as_ref()
            .map(|a| prompts::review_request(&a.task, &state.research_data));

        let report = self
            .workers
            .run(
                WorkerKind::Reviewer,
                state.assignment.as_ref(),
                prompt,
                &state.model_options,
                &ctx,
            )
            .await;
        let critique = report.result.clone();
        tracing::info!(
            verdict = critique.split_whitespace().next().unwrap_or(""),
            round = state.iteration_count,
            "Research reviewed"
        );

        Ok(json!({
            "worker_reports": [report],
            "critique": critique,
        }))
    }
}

/// Closes the debate loop: turns the research into a brief and advances the cursor
pub struct StrategistNode {
    workers: Arc<Workers>,
}

impl StrategistNode {
    pub fn new(workers: Arc<Workers>) -> Self {
        Self { workers }
    }
}

#[async_trait]
impl Node for StrategistNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let prompt = state
            .assignment
            .as_ref()
            .map(|a| prompts::strategy_request(&a.task, &state.research_data, &state.critique));

        let report = self
            .workers
            .run(
                WorkerKind::Strategist,
                state.assignment.as_ref(),
                prompt,
                &state.model_options,
                &ctx,
            )
            .await;

        Ok(json!({
            "worker_reports": [report],
            "next_task_index": state.next_task_index + 1,
            "iteration_count": 0,
            "research_data": "",
            "critique": "",
        }))
    }
}

/// Render reports for the synthesis prompt
pub fn format_reports(reports: &[WorkerReport]) -> String {
    reports
        .iter()
        .map(|r| {
            format!(
                "## {} ({})\nTask: {}\n\n{}",
                r.worker,
                r.status.as_str(),
                r.task,
                r.result
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Merges worker reports into the final answer, streaming tokens
pub struct SynthesizerNode {
    model: Arc<dyn ChatModel>,
}

impl SynthesizerNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for SynthesizerNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = BrewState::from_value(&input)?;
        let user_text = state.last_user_text();
        let reports = format_reports(&state.worker_reports);

        let messages = if state.worker_reports.is_empty() {
            vec![Message::system(prompts::DIRECT_SYSTEM), Message::user(user_text)]
        } else {
            vec![
                Message::system(prompts::SYNTHESIZER_SYSTEM),
                Message::user(prompts::synthesis_request(&user_text, &reports)),
            ]
        };
        let request = ChatRequest::new(messages).with_options(state.model_options.clone());

        let mut text = stream_text(self.model.as_ref(), request, &ctx).await;
        if text.trim().is_empty() {
            text = if reports.is_empty() {
                DIRECT_FALLBACK.to_string()
            } else {
                reports
            };
        }

        Ok(json!({
            "final_response": text,
            "status": "Synthesis complete",
        }))
    }
}
