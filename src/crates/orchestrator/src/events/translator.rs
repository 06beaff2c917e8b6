//! Execution telemetry to client events
//!
//! The translator is a pure state machine: it sees every event of one run in
//! order and decides what, if anything, the client gets to see.
//!
//! - `status` is emitted on node entry and whenever a node reports a status,
//!   never twice in a row with the same text.
//! - `content` only comes from the answering node of the graph: the
//!   synthesizer (brew), the search agent, the research synthesis or the
//!   reporter (investigator). If that node streamed no tokens its final text
//!   is sent in fixed-size chunks instead. A direct planner answer is sent
//!   whole.
//! - `plan` carries the investigator's research plan, or the research todo
//!   list each time its statuses change.
//! - `worker_complete` is sent once per worker and task prefix.
//! - Bookkeeping tools are hidden.

use crate::brew::{BrewNode, TaskPlan, WorkerReport};
use crate::investigator::{InvestigatorNode, ResearchPlan};
use crate::research::{ResearchNode, ResearchTodo};
use crate::search::SearchNode;
use langgraph_core::{ExecutionEvent, NodeKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

const CONTENT_CHUNK_CHARS: usize = 32;
const TOOL_INPUT_CHARS: usize = 80;
const WORKER_TASK_KEY_CHARS: usize = 50;
const HIDDEN_TOOLS: &[&str] = &["write_todos", "update_todos", "task"];

/// One message of the client stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Status {
        content: String,
    },
    PlanDelta {
        worker: String,
        task: String,
        priority: u8,
        reasoning: String,
    },
    WorkerStart {
        worker: String,
        task: String,
    },
    WorkerComplete {
        worker: String,
        task: String,
        status: String,
    },
    Content {
        content: String,
    },
    ToolStart {
        tool: String,
        input: String,
        content: String,
    },
    ToolResult {
        tool: String,
        content: String,
    },
    /// Research plan handed to the caller for review, or a research todo list
    Plan {
        content: Value,
    },
    Report {
        content: String,
    },
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Error {
        content: String,
    },
}

impl ClientEvent {
    pub fn status(content: impl Into<String>) -> Self {
        ClientEvent::Status {
            content: content.into(),
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        ClientEvent::Content {
            content: content.into(),
        }
    }

    pub fn complete() -> Self {
        ClientEvent::Complete { content: None }
    }

    pub fn error(content: impl Into<String>) -> Self {
        ClientEvent::Error {
            content: content.into(),
        }
    }

    /// Wire name of the event, also used as the SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Status { .. } => "status",
            ClientEvent::PlanDelta { .. } => "plan_delta",
            ClientEvent::WorkerStart { .. } => "worker_start",
            ClientEvent::WorkerComplete { .. } => "worker_complete",
            ClientEvent::Content { .. } => "content",
            ClientEvent::ToolStart { .. } => "tool_start",
            ClientEvent::ToolResult { .. } => "tool_result",
            ClientEvent::Plan { .. } => "plan",
            ClientEvent::Report { .. } => "report",
            ClientEvent::Complete { .. } => "complete",
            ClientEvent::Error { .. } => "error",
        }
    }

    /// Whether a consumer should stop reading after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientEvent::Complete { .. } | ClientEvent::Error { .. })
    }
}

/// Which graph the events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Brew,
    Search,
    Research,
    Investigator,
}

fn brew_status(node: BrewNode) -> Option<String> {
    let label = match node {
        BrewNode::Planner => "Master Orchestrator planning tasks...".to_string(),
        BrewNode::TaskRouter => return None,
        BrewNode::ReviewerWorker => "Reviewer critiquing research...".to_string(),
        BrewNode::StrategistWorker => "Strategist drafting deliverable...".to_string(),
        BrewNode::Synthesizer => "Synthesizing final response...".to_string(),
        worker => format!("{} working...", worker.worker()?.display_name()),
    };
    Some(label)
}

fn investigator_status(node: InvestigatorNode) -> &'static str {
    match node {
        InvestigatorNode::Planner => "Planning research...",
        InvestigatorNode::Executor => "Executing research plan...",
        InvestigatorNode::Reporter => "Writing final report...",
    }
}

fn research_status(node: ResearchNode) -> &'static str {
    match node {
        ResearchNode::Planner => "Planning research...",
        ResearchNode::Discovery => "Discovering sources...",
        ResearchNode::Extraction => "Extracting full content...",
        ResearchNode::Synthesis => "Writing research report...",
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Short human-readable rendering of tool arguments
pub fn render_tool_input(input: &Value) -> String {
    let rendered = match input {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let pick = |key: &str| map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
            match pick("query").or_else(|| pick("url")) {
                Some(s) => s.to_string(),
                None => input.to_string(),
            }
        }
        other => other.to_string(),
    };
    truncate_chars(&rendered, TOOL_INPUT_CHARS)
}

/// Tool output for display; JSON is pretty-printed in a code fence
pub fn render_tool_output(output: &str) -> String {
    let trimmed = output.trim();
    let looks_json = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if looks_json {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            if let Ok(pretty) = serde_json::to_string_pretty(&parsed) {
                return format!("```json\n{pretty}\n```");
            }
        }
    }
    output.to_string()
}

fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Per-run translation state
#[derive(Debug)]
pub struct Translator {
    profile: Profile,
    last_status: Option<String>,
    plan_emitted: bool,
    workers_reported: HashSet<String>,
    content_streamed: bool,
    final_emitted: bool,
}

impl Translator {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            last_status: None,
            plan_emitted: false,
            workers_reported: HashSet::new(),
            content_streamed: false,
            final_emitted: false,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    fn push_status(&mut self, out: &mut Vec<ClientEvent>, status: &str) {
        if status.trim().is_empty() || self.last_status.as_deref() == Some(status) {
            return;
        }
        self.last_status = Some(status.to_string());
        out.push(ClientEvent::status(status));
    }

    fn is_content_node(&self, node: &str) -> bool {
        match self.profile {
            Profile::Brew => BrewNode::parse(node) == Some(BrewNode::Synthesizer),
            Profile::Search => SearchNode::parse(node) == Some(SearchNode::Agent),
            Profile::Research => ResearchNode::parse(node) == Some(ResearchNode::Synthesis),
            Profile::Investigator => InvestigatorNode::parse(node) == Some(InvestigatorNode::Reporter),
        }
    }

    fn push_final_text(&mut self, out: &mut Vec<ClientEvent>, text: &str) {
        if self.final_emitted {
            return;
        }
        self.final_emitted = true;
        if self.content_streamed {
            return;
        }
        out.extend(chunk_chars(text, CONTENT_CHUNK_CHARS).into_iter().map(ClientEvent::content));
    }

    /// Client events for one execution event
    pub fn translate(&mut self, event: &ExecutionEvent) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        match event {
            ExecutionEvent::NodeStart { node, input, .. } => self.on_node_start(&mut out, node, input),
            ExecutionEvent::NodeEnd { node, output, .. } => self.on_node_end(&mut out, node, output),
            ExecutionEvent::NodeError { node, error, .. } => {
                tracing::debug!(node = %node, error = %error, "Node failed");
            }
            ExecutionEvent::ModelToken { node, token } => {
                if self.is_content_node(node) && !self.final_emitted && !token.is_empty() {
                    self.content_streamed = true;
                    out.push(ClientEvent::content(token.clone()));
                }
            }
            ExecutionEvent::ToolStart { tool, input, .. } => {
                if !HIDDEN_TOOLS.contains(&tool.as_str()) {
                    out.push(ClientEvent::ToolStart {
                        tool: tool.clone(),
                        input: render_tool_input(input),
                        content: format!("Running {tool}..."),
                    });
                }
            }
            ExecutionEvent::ToolEnd { tool, output, .. } => {
                if !HIDDEN_TOOLS.contains(&tool.as_str()) && !output.is_empty() {
                    out.push(ClientEvent::ToolResult {
                        tool: tool.clone(),
                        content: render_tool_output(output),
                    });
                }
            }
            ExecutionEvent::Custom { payload, .. } => {
                if let Some(status) = non_empty_str(payload, "status") {
                    self.push_status(&mut out, status);
                }
            }
        }
        out
    }

    fn on_node_start(&mut self, out: &mut Vec<ClientEvent>, node: &str, input: &Value) {
        match self.profile {
            Profile::Brew => {
                let Some(key) = BrewNode::parse(node) else {
                    return;
                };
                if let Some(label) = brew_status(key) {
                    self.push_status(out, &label);
                }
                if let Some(worker) = key.worker() {
                    let task = input
                        .get("assignment")
                        .and_then(|a| a.get("task"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    out.push(ClientEvent::WorkerStart {
                        worker: worker.as_str().to_string(),
                        task: task.to_string(),
                    });
                }
            }
            Profile::Search => {
                if SearchNode::parse(node).is_some() {
                    self.push_status(out, "Searching the web...");
                }
            }
            Profile::Research => {
                if let Some(key) = ResearchNode::parse(node) {
                    self.push_status(out, research_status(key));
                }
            }
            Profile::Investigator => {
                if let Some(key) = InvestigatorNode::parse(node) {
                    self.push_status(out, investigator_status(key));
                }
            }
        }
    }

    fn on_node_end(&mut self, out: &mut Vec<ClientEvent>, node: &str, output: &Value) {
        match self.profile {
            Profile::Brew => self.on_brew_end(out, node, output),
            Profile::Search => {
                if SearchNode::parse(node).is_some() {
                    if let Some(text) = non_empty_str(output, "final_response") {
                        self.push_final_text(out, text);
                    }
                }
            }
            Profile::Research => self.on_research_end(out, node, output),
            Profile::Investigator => self.on_investigator_end(out, node, output),
        }
        if let Some(status) = non_empty_str(output, "status") {
            self.push_status(out, status);
        }
    }

    fn on_brew_end(&mut self, out: &mut Vec<ClientEvent>, node: &str, output: &Value) {
        let Some(key) = BrewNode::parse(node) else {
            return;
        };
        match key {
            BrewNode::Planner => {
                let plan = output
                    .get("task_plan")
                    .and_then(|p| serde_json::from_value::<TaskPlan>(p.clone()).ok());
                if let Some(plan) = plan {
                    if plan.is_empty() {
                        if let Some(reply) = non_empty_str(output, "final_response") {
                            if !self.final_emitted {
                                self.final_emitted = true;
                                out.push(ClientEvent::content(reply));
                            }
                        }
                    } else if !self.plan_emitted {
                        self.plan_emitted = true;
                        for (i, task) in plan.tasks.iter().enumerate() {
                            out.push(ClientEvent::PlanDelta {
                                worker: task.worker.as_str().to_string(),
                                task: task.task.clone(),
                                priority: task.priority,
                                reasoning: if i == 0 { plan.reasoning.clone() } else { String::new() },
                            });
                        }
                    }
                }
            }
            BrewNode::Synthesizer => {
                if let Some(text) = non_empty_str(output, "final_response") {
                    self.push_final_text(out, text);
                }
            }
            BrewNode::TaskRouter => {}
            _ => {
                let reports: Vec<WorkerReport> = output
                    .get("worker_reports")
                    .and_then(|r| serde_json::from_value(r.clone()).ok())
                    .unwrap_or_default();
                for report in reports {
                    let prefix: String = report.task.chars().take(WORKER_TASK_KEY_CHARS).collect();
                    let key = format!("{}:{}", report.worker, prefix);
                    if self.workers_reported.insert(key) {
                        out.push(ClientEvent::WorkerComplete {
                            worker: report.worker.as_str().to_string(),
                            task: report.task,
                            status: report.status.as_str().to_string(),
                        });
                    }
                }
            }
        }
    }

    fn on_research_end(&mut self, out: &mut Vec<ClientEvent>, node: &str, output: &Value) {
        let Some(key) = ResearchNode::parse(node) else {
            return;
        };
        let todos: Option<Vec<ResearchTodo>> = output
            .get("todos")
            .and_then(|t| serde_json::from_value(t.clone()).ok())
            .filter(|t: &Vec<ResearchTodo>| !t.is_empty());
        if let Some(todos) = todos {
            out.push(ClientEvent::Plan {
                content: serde_json::to_value(&todos).unwrap_or(Value::Null),
            });
        }
        if key == ResearchNode::Synthesis {
            if let Some(text) = non_empty_str(output, "final_response") {
                self.push_final_text(out, text);
            }
        }
    }

    fn on_investigator_end(&mut self, out: &mut Vec<ClientEvent>, node: &str, output: &Value) {
        match InvestigatorNode::parse(node) {
            Some(InvestigatorNode::Planner) => {
                if let Some(plan) = output
                    .get("research_plan")
                    .and_then(|p| serde_json::from_value::<ResearchPlan>(p.clone()).ok())
                {
                    out.push(ClientEvent::Plan {
                        content: serde_json::to_value(&plan.tasks).unwrap_or(Value::Null),
                    });
                }
            }
            Some(InvestigatorNode::Reporter) => {
                if let Some(report) = non_empty_str(output, "final_report") {
                    let report = report.to_string();
                    self.push_final_text(out, &report);
                    out.push(ClientEvent::Report { content: report });
                }
            }
            Some(InvestigatorNode::Executor) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start(node: &str, input: Value) -> ExecutionEvent {
        ExecutionEvent::NodeStart {
            node: node.to_string(),
            step: 0,
            input,
        }
    }

    fn end(node: &str, output: Value) -> ExecutionEvent {
        ExecutionEvent::NodeEnd {
            node: node.to_string(),
            step: 0,
            output,
        }
    }

    fn token(node: &str, token: &str) -> ExecutionEvent {
        ExecutionEvent::ModelToken {
            node: node.to_string(),
            token: token.to_string(),
        }
    }

    fn run(translator: &mut Translator, events: &[ExecutionEvent]) -> Vec<ClientEvent> {
        events.iter().flat_map(|e| translator.translate(e)).collect()
    }

    #[test]
    fn test_wire_format() {
        let event = ClientEvent::WorkerComplete {
            worker: "research".into(),
            task: "t".into(),
            status: "success".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "worker_complete", "worker": "research", "task": "t", "status": "success"})
        );
        assert_eq!(
            serde_json::to_value(ClientEvent::complete()).unwrap(),
            json!({"type": "complete"})
        );
        assert!(ClientEvent::error("boom").is_terminal());
        assert_eq!(ClientEvent::status("x").kind(), "status");
    }

    #[test]
    fn test_status_is_deduplicated() {
        let mut translator = Translator::new(Profile::Brew);
        let events = run(
            &mut translator,
            &[
                start("planner", json!({})),
                ExecutionEvent::Custom {
                    node: "planner".into(),
                    payload: json!({"status": "Master Orchestrator planning tasks..."}),
                },
                end("planner", json!({"status": "Planning complete: 1 tasks assigned"})),
                end("task_router", json!({"status": "Planning complete: 1 tasks assigned"})),
            ],
        );
        let statuses: Vec<_> = events.iter().filter(|e| e.kind() == "status").collect();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0], &ClientEvent::status("Master Orchestrator planning tasks..."));
    }

    #[test]
    fn test_plan_delta_carries_reasoning_once() {
        let mut translator = Translator::new(Profile::Brew);
        let plan = json!({"reasoning": "two angles", "tasks": [
            {"worker": "research", "task": "market", "priority": 1},
            {"worker": "content", "task": "blog", "priority": 2}
        ]});
        let events = run(&mut translator, &[end("planner", json!({"task_plan": plan.clone()}))]);

        assert_eq!(
            events[0],
            ClientEvent::PlanDelta {
                worker: "research".into(),
                task: "market".into(),
                priority: 1,
                reasoning: "two angles".into()
            }
        );
        assert!(matches!(&events[1], ClientEvent::PlanDelta { reasoning, .. } if reasoning.is_empty()));

        let again = run(&mut translator, &[end("planner", json!({"task_plan": plan}))]);
        assert!(again.iter().all(|e| e.kind() != "plan_delta"));
    }

    #[test]
    fn test_worker_start_and_deduplicated_completion() {
        let mut translator = Translator::new(Profile::Brew);
        let report = json!({"worker": "research", "task": "x".repeat(60), "status": "success", "result": "r"});
        let mut other = report.clone();
        other["task"] = json!(format!("{}tail", "x".repeat(50)));

        let events = run(
            &mut translator,
            &[
                start("research_worker", json!({"assignment": {"worker": "research", "task": "size it", "priority": 1}})),
                end("research_worker", json!({"worker_reports": [report]})),
                start("research_worker", json!({"assignment": {"worker": "research", "task": "size it", "priority": 1}})),
                end("research_worker", json!({"worker_reports": [other]})),
            ],
        );

        let starts = events.iter().filter(|e| e.kind() == "worker_start").count();
        let completes = events.iter().filter(|e| e.kind() == "worker_complete").count();
        assert_eq!(starts, 2);
        assert_eq!(completes, 1);
        assert!(events.contains(&ClientEvent::WorkerStart {
            worker: "research".into(),
            task: "size it".into()
        }));
    }

    #[test]
    fn test_content_only_from_synthesizer() {
        let mut translator = Translator::new(Profile::Brew);
        let events = run(
            &mut translator,
            &[
                token("planner", "{\"tasks\""),
                token("research_worker", "internal"),
                token("synthesizer", "Hello "),
                token("synthesizer", "world"),
                end("synthesizer", json!({"final_response": "Hello world"})),
            ],
        );
        let content: Vec<_> = events.iter().filter(|e| e.kind() == "content").collect();
        assert_eq!(content, vec![&ClientEvent::content("Hello "), &ClientEvent::content("world")]);
    }

    #[test]
    fn test_unstreamed_final_response_is_chunked() {
        let mut translator = Translator::new(Profile::Brew);
        let text = "a".repeat(70);
        let events = run(&mut translator, &[end("synthesizer", json!({"final_response": text}))]);
        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Content { content } => Some(content.chars().count()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![32, 32, 6]);
    }

    #[test]
    fn test_direct_reply_is_single_content_event() {
        let mut translator = Translator::new(Profile::Brew);
        let events = run(
            &mut translator,
            &[
                start("planner", json!({})),
                end(
                    "planner",
                    json!({"task_plan": {"reasoning": "Direct response", "tasks": []}, "final_response": "Hi there!", "status": "Direct response"}),
                ),
            ],
        );
        let content: Vec<_> = events.iter().filter(|e| e.kind() == "content").collect();
        assert_eq!(content, vec![&ClientEvent::content("Hi there!")]);
        assert!(events.iter().all(|e| e.kind() != "plan_delta"));
    }

    #[test]
    fn test_tool_rendering_and_filtering() {
        assert_eq!(render_tool_input(&json!({"query": "cold brew"})), "cold brew");
        assert_eq!(render_tool_input(&json!({"url": "https://a.io"})), "https://a.io");
        assert_eq!(render_tool_input(&json!({"keywords": ["a"]})), r#"{"keywords":["a"]}"#);
        let long = render_tool_input(&json!({"query": "q".repeat(100)}));
        assert_eq!(long.chars().count(), 80);
        assert!(long.ends_with("..."));

        assert_eq!(render_tool_output("[1, 2]"), "```json\n[\n  1,\n  2\n]\n```");
        assert_eq!(render_tool_output("plain {text"), "plain {text");

        let mut translator = Translator::new(Profile::Brew);
        let hidden = translator.translate(&ExecutionEvent::ToolStart {
            node: "general_worker".into(),
            tool: "write_todos".into(),
            input: json!({}),
        });
        assert!(hidden.is_empty());
    }

    #[test]
    fn test_investigator_plan_and_report() {
        let mut translator = Translator::new(Profile::Investigator);
        let events = run(
            &mut translator,
            &[
                start("planner", json!({})),
                end("planner", json!({"research_plan": {"tasks": [{"name": "A", "goal": "g", "tool_hint": "tavily_search", "tool_args": {}}]}})),
                token("reporter", "## Report"),
                end("reporter", json!({"final_report": "## Report", "status": "Report complete"})),
            ],
        );

        assert!(matches!(&events[1], ClientEvent::Plan { content } if content[0]["name"] == "A"));
        assert!(events.contains(&ClientEvent::content("## Report")));
        assert!(events.contains(&ClientEvent::Report {
            content: "## Report".into()
        }));
        assert_eq!(events.iter().filter(|e| e.kind() == "content").count(), 1);
    }

    #[test]
    fn test_search_streams_answer_and_tools() {
        let mut translator = Translator::new(Profile::Search);
        let events = run(
            &mut translator,
            &[
                start("search_agent", json!({})),
                ExecutionEvent::ToolStart {
                    node: "search_agent".into(),
                    tool: "tavily_search".into(),
                    input: json!({"query": "tallest tower"}),
                },
                end("search_agent", json!({"final_response": "**Answer:** Burj Khalifa", "status": "Search complete"})),
            ],
        );

        assert_eq!(events[0], ClientEvent::status("Searching the web..."));
        assert!(matches!(&events[1], ClientEvent::ToolStart { input, .. } if input == "tallest tower"));
        assert!(events.contains(&ClientEvent::content("**Answer:** Burj Khalifa")));
        assert_eq!(events.last(), Some(&ClientEvent::status("Search complete")));
    }

    #[test]
    fn test_research_todos_become_plan_events() {
        let mut translator = Translator::new(Profile::Research);
        let events = run(
            &mut translator,
            &[
                start("research_planner", json!({})),
                end("research_planner", json!({"todos": [{"content": "search", "status": "pending"}]})),
                start("discovery", json!({})),
                token("discovery", "not shown"),
                end("discovery", json!({"sources": []})),
                token("synthesis", "## Report"),
                end("synthesis", json!({"final_response": "## Report", "todos": [{"content": "search", "status": "completed"}]})),
            ],
        );

        let plans: Vec<&Value> = events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Plan { content } => Some(content),
                _ => None,
            })
            .collect();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0][0]["status"], "pending");
        assert_eq!(plans[1][0]["status"], "completed");
        assert!(events.contains(&ClientEvent::status("Discovering sources...")));
        let content: Vec<_> = events.iter().filter(|e| e.kind() == "content").collect();
        assert_eq!(content, vec![&ClientEvent::content("## Report")]);
    }
}
