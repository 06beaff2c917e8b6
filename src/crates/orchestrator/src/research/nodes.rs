//! Research nodes: planner, discovery, extraction and synthesis

use super::prompts;
use super::state::{ResearchState, ResearchTodo, TodoList, TodoStatus};
use crate::agent::{stream_text, AgentOutcome, AgentTask, ToolAgent};
use crate::brew::workers::prompt_date;
use crate::investigator::prompts::with_date;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use langgraph_core::{Node, NodeContext, NodeError};
use llm::{chat_structured, ChatModel, ChatRequest, Message, ResponseFormat};
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TODOS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ResearchSettings {
    /// Model turns of the discovery and extraction agents
    pub max_turns: usize,
    /// Discovered URLs read in full
    pub max_extract: usize,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_turns: 5,
            max_extract: 5,
        }
    }
}

fn default_todos(query: &str) -> Vec<ResearchTodo> {
    vec![
        ResearchTodo::pending(format!("Search for sources on {query}")),
        ResearchTodo::pending("Read the most relevant sources in full"),
        ResearchTodo::pending("Write the research report"),
    ]
}

/// Answer text of an agent run, or its raw tool output when it gave none
fn findings(outcome: &AgentOutcome) -> String {
    if !outcome.answer.trim().is_empty() {
        return outcome.answer.trim().to_string();
    }
    outcome
        .observations
        .iter()
        .map(|obs| format!("[{}]\n{}", obs.tool, obs.output))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Writes the todo list the other stages work through
pub struct ResearchPlanner {
    model: Arc<dyn ChatModel>,
}

impl ResearchPlanner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for ResearchPlanner {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = ResearchState::from_value(&input)?;
        let query = state.question();
        let messages = vec![
            Message::system(with_date(prompts::PLANNER_SYSTEM, &prompt_date())),
            Message::user(prompts::plan_request(&query)),
        ];
        let format = ResponseFormat::json_schema("todo_list", TodoList::json_schema());

        let todos = match chat_structured::<TodoList>(self.model.as_ref(), messages, format, state.model_options).await {
            Ok(list) => list
                .todos
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .take(MAX_TODOS)
                .map(ResearchTodo::pending)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Research planning failed, using default todos");
                Vec::new()
            }
        };
        let todos = if todos.is_empty() { default_todos(&query) } else { todos };
        tracing::info!(thread_id = ctx.thread_id(), todos = todos.len(), "Research todos written");

        Ok(json!({
            "query": query,
            "todos": todos,
            "status": "Research plan ready",
        }))
    }
}

/// Searches widely and collects candidate sources
pub struct DiscoveryNode {
    agent: ToolAgent,
}

impl DiscoveryNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, settings: ResearchSettings) -> Self {
        Self {
            agent: ToolAgent::new(model, tools, settings.max_turns),
        }
    }
}

#[async_trait]
impl Node for DiscoveryNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = ResearchState::from_value(&input)?;
        let task = AgentTask::new(
            with_date(prompts::DISCOVERY_SYSTEM, &prompt_date()),
            prompts::discovery_request(&state.question(), &state.todo_texts()),
            state.model_options.clone(),
        );

        let (discovery, sources) = match self.agent.run(task, &ctx).await {
            Ok(outcome) => {
                if outcome.has_tool_errors() {
                    tracing::warn!(errors = ?outcome.tool_errors, "Discovery searches failed");
                }
                (findings(&outcome), outcome.sources())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discovery failed");
                (format!("Discovery failed: {e}"), Vec::new())
            }
        };
        tracing::info!(thread_id = ctx.thread_id(), sources = sources.len(), "Discovery finished");

        Ok(json!({
            "discovery": discovery,
            "sources": sources,
            "status": format!("Found {} sources", sources.len()),
        }))
    }
}

/// Reads the top discovered sources in full
pub struct ExtractionNode {
    agent: ToolAgent,
    max_extract: usize,
}

impl ExtractionNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, settings: ResearchSettings) -> Self {
        Self {
            agent: ToolAgent::new(model, tools, settings.max_turns),
            max_extract: settings.max_extract,
        }
    }
}

#[async_trait]
impl Node for ExtractionNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = ResearchState::from_value(&input)?;
        let urls: Vec<String> = state.sources.iter().take(self.max_extract).cloned().collect();
        if urls.is_empty() {
            tracing::info!(thread_id = ctx.thread_id(), "No sources to extract");
            return Ok(json!({
                "extracted": "",
                "status": "No sources to extract",
            }));
        }

        let task = AgentTask::new(
            with_date(prompts::EXTRACTION_SYSTEM, &prompt_date()),
            prompts::extraction_request(&state.question(), &urls),
            state.model_options.clone(),
        );
        let extracted = match self.agent.run(task, &ctx).await {
            Ok(outcome) => {
                if outcome.has_tool_errors() {
                    tracing::warn!(errors = ?outcome.tool_errors, "Some sources could not be read");
                }
                findings(&outcome)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed");
                format!("Extraction failed: {e}")
            }
        };

        Ok(json!({
            "extracted": extracted,
            "status": format!("Read {} sources", urls.len()),
        }))
    }
}

/// Streams the final report and closes the todo list
pub struct SynthesisNode {
    model: Arc<dyn ChatModel>,
}

impl SynthesisNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for SynthesisNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = ResearchState::from_value(&input)?;
        let query = state.question();
        let request = ChatRequest::new(vec![
            Message::system(with_date(prompts::SYNTHESIS_SYSTEM, &prompt_date())),
            Message::user(prompts::synthesis_request(
                &query,
                &state.discovery,
                &state.extracted,
                &state.sources,
            )),
        ])
        .with_options(state.model_options.clone());

        let mut report = stream_text(self.model.as_ref(), request, &ctx).await;
        if report.trim().is_empty() {
            let gathered = [state.discovery.trim(), state.extracted.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            report = if gathered.is_empty() {
                format!("No research findings were gathered for {query}.")
            } else {
                gathered
            };
        }

        let todos: Vec<ResearchTodo> = state
            .todos
            .into_iter()
            .map(|todo| ResearchTodo {
                status: TodoStatus::Completed,
                ..todo
            })
            .collect();

        Ok(json!({
            "final_response": report,
            "todos": todos,
            "status": "Research complete",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, structured, ScriptedModel, ScriptedTool};
    use crate::tools::ToolError;
    use llm::{ChatResponse, ToolCall};

    #[tokio::test]
    async fn test_planner_falls_back_to_default_todos() {
        let node = ResearchPlanner::new(ScriptedModel::new(|_| Ok(structured(json!({"todos": []})))));
        let output = node
            .run(
                json!({"messages": [{"role": "user", "content": "heat pumps"}]}),
                NodeContext::detached("research_planner"),
            )
            .await
            .unwrap();

        assert_eq!(output["query"], "heat pumps");
        let todos: Vec<ResearchTodo> = serde_json::from_value(output["todos"].clone()).unwrap();
        assert_eq!(todos, default_todos("heat pumps"));
    }

    #[tokio::test]
    async fn test_planner_caps_todo_list() {
        let many: Vec<String> = (0..12).map(|i| format!("step {i}")).collect();
        let node = ResearchPlanner::new(ScriptedModel::new(move |_| Ok(structured(json!({"todos": many.clone()})))));
        let output = node
            .run(json!({"query": "q"}), NodeContext::detached("research_planner"))
            .await
            .unwrap();
        assert_eq!(output["todos"].as_array().unwrap().len(), MAX_TODOS);
        assert_eq!(output["todos"][0], json!({"content": "step 0", "status": "pending"}));
    }

    #[tokio::test]
    async fn test_discovery_keeps_urls_when_search_fails_partway() {
        let search = ScriptedTool::new("tavily_search", |args| {
            if args["query"] == "second" {
                Err(ToolError::Failed("rate limited".into()))
            } else {
                Ok("Heat pump report https://iea.org/heat-pumps".to_string())
            }
        });
        let model = ScriptedModel::new(|request| {
            let tool_turns = request.messages.iter().filter(|m| m.tool_call_id.is_some()).count();
            let query = match tool_turns {
                0 => "first",
                1 => "second",
                _ => return Ok(reply("")),
            };
            Ok(ChatResponse::new(Message::assistant("").with_tool_calls(vec![ToolCall::new(
                format!("c{tool_turns}"),
                "tavily_search",
                json!({"query": query}),
            )])))
        });
        let node = DiscoveryNode::new(
            model,
            ToolRegistry::new().with_tool(search),
            ResearchSettings::default(),
        );

        let output = node
            .run(json!({"query": "heat pumps"}), NodeContext::detached("discovery"))
            .await
            .unwrap();
        assert_eq!(output["sources"], json!(["https://iea.org/heat-pumps"]));
        assert!(output["discovery"].as_str().unwrap().contains("Error executing tavily_search"));
    }

    #[tokio::test]
    async fn test_extraction_skips_without_sources() {
        let model = ScriptedModel::constant("unused");
        let node = ExtractionNode::new(model.clone(), ToolRegistry::new(), ResearchSettings::default());
        let output = node
            .run(json!({"query": "q", "sources": []}), NodeContext::detached("extraction"))
            .await
            .unwrap();
        assert_eq!(output["extracted"], "");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_completes_todos_and_falls_back_to_findings() {
        let node = SynthesisNode::new(ScriptedModel::failing("down"));
        let output = node
            .run(
                json!({
                    "query": "q",
                    "todos": [{"content": "search", "status": "pending"}],
                    "discovery": "found https://a.io",
                    "extracted": ""
                }),
                NodeContext::detached("synthesis"),
            )
            .await
            .unwrap();
        assert_eq!(output["final_response"], "found https://a.io");
        assert_eq!(output["todos"][0]["status"], "completed");
    }
}
