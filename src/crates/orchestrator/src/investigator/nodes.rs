//! Investigator nodes: planner, executor and reporter

use super::feedback::{merge_plans, resolve_feedback};
use super::prompts;
use super::state::{FeedbackAction, InvestigatorState, ResearchPlan, ResearchTask};
use crate::agent::{stream_text, AgentOutcome, AgentTask, PinnedArgs, ToolAgent};
use crate::brew::workers::prompt_date;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use langgraph_core::{Node, NodeContext, NodeError};
use llm::{chat_structured, ChatModel, ChatRequest, Message, ModelOptions, ResponseFormat};
use serde_json::{json, Value};
use std::sync::Arc;

const SCOUT_TOOL: &str = "tavily_search";

/// Limits applied by the executor
#[derive(Debug, Clone, Copy)]
pub struct InvestigatorSettings {
    pub max_turns: usize,
    /// Characters of earlier findings shown to each task
    pub context_window_chars: usize,
    /// Characters of a task result carried forward as context
    pub task_summary_chars: usize,
}

impl Default for InvestigatorSettings {
    fn default() -> Self {
        Self {
            max_turns: 3,
            context_window_chars: 6000,
            task_summary_chars: 800,
        }
    }
}

/// Last `n` characters of `text`
pub(crate) fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// First `n` characters of `text`
pub(crate) fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn plan_format() -> ResponseFormat {
    ResponseFormat::json_schema("research_plan", ResearchPlan::json_schema())
}

/// Drafts the research plan, or revises it from review feedback
pub struct InvestigatorPlanner {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
}

impl InvestigatorPlanner {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self { model, tools }
    }

    async fn scout(&self, topic: &str, ctx: &NodeContext) -> String {
        let args = json!({
            "query": format!("top 5 companies for {topic} and their official website urls")
        });
        tracing::info!(topic, "Scouting before planning");
        ctx.tool_start(SCOUT_TOOL, args.clone());
        let found = self.tools.invoke(SCOUT_TOOL, args).await;
        ctx.tool_end(SCOUT_TOOL, found.clone());
        found
    }

    async fn initial_plan(&self, topic: &str, options: ModelOptions, ctx: &NodeContext) -> ResearchPlan {
        let scout = self.scout(topic, ctx).await;
        let messages = vec![
            Message::system(prompts::with_date(prompts::PLANNER_SYSTEM, &prompt_date())),
            Message::user(prompts::plan_request(topic, &scout)),
        ];

        match chat_structured::<ResearchPlan>(self.model.as_ref(), messages, plan_format(), options).await {
            Ok(plan) if !plan.is_empty() => plan,
            Ok(_) => {
                tracing::warn!(topic, "Planner returned no tasks, using fallback plan");
                ResearchPlan::fallback(topic)
            }
            Err(e) => {
                tracing::warn!(topic, error = %e, "Plan generation failed, using fallback plan");
                ResearchPlan::fallback(topic)
            }
        }
    }

    async fn revise(
        &self,
        topic: &str,
        previous: &ResearchPlan,
        feedback: &str,
        options: ModelOptions,
    ) -> ResearchPlan {
        let current = serde_json::to_string_pretty(previous).unwrap_or_default();
        let messages = vec![
            Message::system(prompts::with_date(prompts::REVISION_SYSTEM, &prompt_date())),
            Message::user(prompts::revision_request(topic, &current, feedback)),
        ];

        let revised = match chat_structured::<ResearchPlan>(self.model.as_ref(), messages, plan_format(), options).await
        {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Plan revision failed, keeping current plan");
                ResearchPlan::default()
            }
        };

        let merged = merge_plans(previous, &revised, feedback);
        if merged.is_empty() {
            ResearchPlan::fallback(topic)
        } else {
            merged
        }
    }
}

#[async_trait]
impl Node for InvestigatorPlanner {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = InvestigatorState::from_value(&input)?;
        let options = state.model_options.clone();

        let Some(previous) = state.research_plan.clone().filter(|plan| !plan.is_empty()) else {
            let plan = self.initial_plan(&state.topic, options, &ctx).await;
            tracing::info!(thread_id = ctx.thread_id(), tasks = plan.tasks.len(), "Research plan drafted");
            return Ok(json!({
                "research_plan": plan,
                "user_feedback": "",
                "feedback_action": null,
                "status": "Research plan ready for review",
            }));
        };

        let (action, feedback) = match state.feedback_action {
            Some(action) => (action, state.user_feedback.clone()),
            None if state.user_feedback.trim().is_empty() => (FeedbackAction::Approve, String::new()),
            None => {
                resolve_feedback(self.model.as_ref(), &state.user_feedback, Some(&previous), options.clone())
                    .await
            }
        };

        match action {
            FeedbackAction::Approve => Ok(json!({
                "feedback_action": "approve",
                "status": "Research plan approved",
            })),
            FeedbackAction::Update => {
                let plan = self.revise(&state.topic, &previous, &feedback, options).await;
                tracing::info!(
                    thread_id = ctx.thread_id(),
                    before = previous.tasks.len(),
                    after = plan.tasks.len(),
                    "Research plan revised"
                );
                // the revised plan goes back to review; unless rejected again it runs as is
                Ok(json!({
                    "research_plan": plan,
                    "revisions": [feedback],
                    "feedback_action": "approve",
                    "status": "Research plan revised",
                }))
            }
        }
    }
}

/// Text recorded for one executed task
fn task_result(outcome: &AgentOutcome) -> String {
    let mut result: String = outcome
        .observations
        .iter()
        .map(|obs| format!("\n[Tool Output from {}]:\n{}\n", obs.tool, obs.output))
        .collect();
    if !outcome.answer.trim().is_empty() || result.is_empty() {
        result.push_str(&format!("\nAnalysis: {}\n", outcome.answer.trim()));
    }
    result
}

/// Runs every plan task in order with the tool agent
pub struct ExecutorNode {
    agent: ToolAgent,
    settings: InvestigatorSettings,
}

impl ExecutorNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, settings: InvestigatorSettings) -> Self {
        Self {
            agent: ToolAgent::new(model, tools, settings.max_turns),
            settings,
        }
    }

    async fn execute(&self, task: &ResearchTask, findings: &str, options: &ModelOptions, ctx: &NodeContext) -> String {
        let system = prompts::with_date(prompts::EXECUTOR_SYSTEM, &prompt_date());
        let prompt = prompts::task_request(&task.name, &task.goal, findings);
        let pinned = (!task.tool_hint.is_empty()).then_some(PinnedArgs {
            tool: &task.tool_hint,
            args: &task.tool_args,
        });

        match self
            .agent
            .run(AgentTask::new(system, prompt, options.clone()).with_pinned(pinned), ctx)
            .await
        {
            Ok(outcome) => task_result(&outcome),
            Err(e) => {
                tracing::warn!(task = %task.name, error = %e, "Research task failed");
                format!("\nError: {e}\n")
            }
        }
    }
}

#[async_trait]
impl Node for ExecutorNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = InvestigatorState::from_value(&input)?;
        let plan = state
            .research_plan
            .clone()
            .filter(|plan| !plan.is_empty())
            .unwrap_or_else(|| ResearchPlan::fallback(&state.topic));

        let mut context = format!("Topic: {}\n", state.topic);
        if !state.user_feedback.trim().is_empty() {
            context.push_str(&format!("User Guidance: {}\n", state.user_feedback.trim()));
        }

        let total = plan.tasks.len();
        let mut entries = Vec::with_capacity(total);
        for (i, task) in plan.tasks.iter().enumerate() {
            tracing::info!(thread_id = ctx.thread_id(), task = %task.name, "Executing task {}/{}", i + 1, total);
            ctx.custom(json!({
                "status": format!("Executing task {}/{}: {}", i + 1, total, task.name)
            }));

            let findings = tail_chars(&context, self.settings.context_window_chars).to_string();
            let result = self.execute(task, &findings, &state.model_options, &ctx).await;

            context.push_str(&format!(
                "\nTask '{}' Result: {}...\n",
                task.name,
                head_chars(&result, self.settings.task_summary_chars)
            ));
            entries.push(format!("### Task: {}\n**Goal:** {}\n\n{}", task.name, task.goal, result));
        }

        Ok(json!({
            "gathered_data": entries,
            "user_feedback": "",
            "feedback_action": null,
            "status": "Research complete",
        }))
    }
}

/// Writes the final report from everything gathered, streaming tokens
pub struct ReporterNode {
    model: Arc<dyn ChatModel>,
}

impl ReporterNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for ReporterNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = InvestigatorState::from_value(&input)?;
        let data = state.gathered_data.join("\n\n");

        let request = ChatRequest::new(vec![
            Message::system(prompts::with_date(prompts::REPORTER_SYSTEM, &prompt_date())),
            Message::user(prompts::report_request(&state.topic, &data, &state.revisions)),
        ])
        .with_options(state.model_options.clone());

        let mut report = stream_text(self.model.as_ref(), request, &ctx).await;
        if report.trim().is_empty() {
            report = if data.is_empty() {
                format!("No research data was gathered for {}.", state.topic)
            } else {
                data
            };
        }

        Ok(json!({
            "final_report": report,
            "status": "Report complete",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, structured, system_text, user_text, ScriptedModel, ScriptedTool};
    use langgraph_core::{EventSink, ExecutionEvent};
    use llm::{ChatResponse, ToolCall};

    fn plan_json(names: &[&str]) -> Value {
        let tasks: Vec<Value> = names
            .iter()
            .map(|n| json!({"name": n, "goal": format!("goal {n}"), "tool_hint": "tavily_search", "tool_args": {}}))
            .collect();
        json!({ "tasks": tasks })
    }

    #[test]
    fn test_char_windows_respect_boundaries() {
        assert_eq!(tail_chars("héllo wörld", 5), "wörld");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(head_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_first_entry_scouts_then_plans() {
        let model = ScriptedModel::new(|_| Ok(structured(plan_json(&["Find Competitors"]))));
        let scout = ScriptedTool::new("tavily_search", |_| Ok("Acme - https://acme.io".to_string()));
        let planner = InvestigatorPlanner::new(model.clone(), ToolRegistry::new().with_tool(scout.clone()));

        let update = planner
            .run(json!({"topic": "coffee subscriptions"}), NodeContext::detached("planner"))
            .await
            .unwrap();

        assert_eq!(update["research_plan"]["tasks"][0]["name"], "Find Competitors");
        assert_eq!(
            scout.calls()[0]["query"],
            "top 5 companies for coffee subscriptions and their official website urls"
        );
        assert!(user_text(&model.requests()[0]).contains("https://acme.io"));
    }

    #[tokio::test]
    async fn test_unparseable_plan_falls_back() {
        let planner = InvestigatorPlanner::new(ScriptedModel::constant("no json here"), ToolRegistry::new());
        let update = planner
            .run(json!({"topic": "tea"}), NodeContext::detached("planner"))
            .await
            .unwrap();
        assert_eq!(update["research_plan"]["tasks"][0]["name"], "General Search");
        assert_eq!(update["research_plan"]["tasks"][0]["tool_args"]["query"], "tea");
    }

    #[tokio::test]
    async fn test_approval_passes_plan_through() {
        let model = ScriptedModel::constant("unused");
        let planner = InvestigatorPlanner::new(model.clone(), ToolRegistry::new());
        let update = planner
            .run(
                json!({"topic": "tea", "research_plan": plan_json(&["A"]), "user_feedback": "ok"}),
                NodeContext::detached("planner"),
            )
            .await
            .unwrap();

        assert!(update.get("research_plan").is_none());
        assert_eq!(update["feedback_action"], "approve");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_revision_keeps_previous_tasks() {
        let model = ScriptedModel::new(|_| Ok(structured(plan_json(&["Scrape Competitor Y"]))));
        let planner = InvestigatorPlanner::new(model.clone(), ToolRegistry::new());
        let update = planner
            .run(
                json!({
                    "topic": "tea",
                    "research_plan": plan_json(&["Find Competitors", "Trends"]),
                    "user_feedback": "add competitor Y",
                    "feedback_action": "update",
                }),
                NodeContext::detached("planner"),
            )
            .await
            .unwrap();

        let plan: ResearchPlan = serde_json::from_value(update["research_plan"].clone()).unwrap();
        assert_eq!(plan.task_names(), vec!["Find Competitors", "Trends", "Scrape Competitor Y"]);
        assert_eq!(update["revisions"], json!(["add competitor Y"]));
        assert!(system_text(&model.requests()[0]).contains("revising"));
    }

    #[tokio::test]
    async fn test_executor_pins_plan_args_and_logs_tasks() {
        let model = ScriptedModel::new(|request| {
            if request.tools.is_empty() || request.messages.len() > 2 {
                return Ok(reply("Pricing starts at $10"));
            }
            Ok(ChatResponse::new(Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "c1",
                "scrape_competitor_page",
                json!({"url": "https://guess.example"}),
            )])))
        });
        let scrape = ScriptedTool::new("scrape_competitor_page", |args| Ok(format!("page at {}", args["url"])));
        let executor = ExecutorNode::new(
            model.clone(),
            ToolRegistry::new().with_tool(scrape.clone()),
            InvestigatorSettings::default(),
        );

        let (sink, mut rx) = EventSink::channel();
        let update = executor
            .run(
                json!({
                    "topic": "tea",
                    "user_feedback": "focus on pricing",
                    "research_plan": {"tasks": [{
                        "name": "Scrape Acme",
                        "goal": "pricing",
                        "tool_hint": "scrape_competitor_page",
                        "tool_args": {"url": "https://acme.io/pricing"}
                    }]}
                }),
                NodeContext::new("executor", "t1", 3, sink),
            )
            .await
            .unwrap();

        assert_eq!(scrape.calls()[0]["url"], "https://acme.io/pricing");
        let entry = update["gathered_data"][0].as_str().unwrap();
        assert!(entry.starts_with("### Task: Scrape Acme\n**Goal:** pricing\n\n"));
        assert!(entry.contains("[Tool Output from scrape_competitor_page]:\npage at \"https://acme.io/pricing\""));
        assert!(entry.contains("Analysis: Pricing starts at $10"));
        assert_eq!(update["user_feedback"], "");
        assert!(user_text(&model.requests()[0]).contains("User Guidance: focus on pricing"));

        match rx.recv().await {
            Some(ExecutionEvent::Custom { payload, .. }) => {
                assert_eq!(payload["status"], "Executing task 1/1: Scrape Acme")
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_executor_carries_bounded_context_forward() {
        let model = ScriptedModel::new(|_| Ok(reply(&"x".repeat(2000))));
        let executor = ExecutorNode::new(
            model.clone(),
            ToolRegistry::new(),
            InvestigatorSettings {
                max_turns: 1,
                context_window_chars: 300,
                task_summary_chars: 50,
            },
        );

        executor
            .run(
                json!({"topic": "tea", "research_plan": plan_json(&["One", "Two"])}),
                NodeContext::detached("executor"),
            )
            .await
            .unwrap();

        let second = user_text(&model.requests()[1]);
        assert!(second.contains("Task 'One' Result:"));
        assert!(!second.contains(&"x".repeat(60)));
    }

    #[tokio::test]
    async fn test_reporter_streams_report() {
        let model = ScriptedModel::constant("### Executive Summary");
        let (sink, mut rx) = EventSink::channel();
        let update = ReporterNode::new(model.clone())
            .run(
                json!({"topic": "tea", "gathered_data": ["### Task: A"], "revisions": ["add Y"]}),
                NodeContext::new("reporter", "t1", 4, sink),
            )
            .await
            .unwrap();

        assert_eq!(update["final_report"], "### Executive Summary");
        assert!(matches!(rx.recv().await, Some(ExecutionEvent::ModelToken { .. })));
        let prompt = user_text(&model.requests()[0]);
        assert!(prompt.contains("### Task: A"));
        assert!(prompt.contains("- add Y"));
    }
}
