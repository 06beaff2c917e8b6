//! Search graph
//!
//! ```text
//!  START → search_agent → END
//! ```

use super::prompts;
use crate::agent::{AgentTask, ToolAgent};
use crate::brew::workers::prompt_date;
use crate::investigator::prompts::with_date;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use langgraph_core::checkpoint::CheckpointSaver;
use langgraph_core::{
    node_key, CompiledGraph, InterruptConfig, Node, NodeContext, NodeError, StateGraph, StateSchema, Target,
};
use llm::{ChatModel, Message, MessageRole, ModelOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const NO_ANSWER: &str = "I could not find an answer to that. Try rephrasing the question.";

node_key! {
    pub enum SearchNode {
        Agent => "search_agent",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchState {
    pub messages: Vec<Message>,
    pub final_response: String,
    /// URLs the answer drew on
    pub sources: Vec<String>,
    pub status: String,
    pub model_options: ModelOptions,
}

impl SearchState {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Earlier user and assistant turns as plain text, and the latest user message
    pub fn split_turns(&self) -> (Vec<Message>, String) {
        let Some(last) = self.messages.iter().rposition(|msg| msg.role == MessageRole::User) else {
            return (Vec::new(), String::new());
        };
        let history = self.messages[..last]
            .iter()
            .filter(|msg| matches!(msg.role, MessageRole::User | MessageRole::Assistant))
            .map(|msg| Message::new(msg.role, msg.text()))
            .filter(|msg| !msg.text().trim().is_empty())
            .collect();
        (history, self.messages[last].text())
    }
}

/// Tool loop over the whole conversation
pub struct SearchAgentNode {
    agent: ToolAgent,
}

impl SearchAgentNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, max_turns: usize) -> Self {
        Self {
            agent: ToolAgent::new(model, tools, max_turns),
        }
    }
}

#[async_trait]
impl Node for SearchAgentNode {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        let state = SearchState::from_value(&input)?;
        let (history, question) = state.split_turns();
        let task = AgentTask::new(
            with_date(prompts::SEARCH_SYSTEM, &prompt_date()),
            question,
            state.model_options.clone(),
        )
        .with_history(history);

        let outcome = self.agent.run(task, &ctx).await?;
        let sources = outcome.sources();
        tracing::info!(
            thread_id = ctx.thread_id(),
            tool_calls = outcome.observations.len(),
            sources = sources.len(),
            "Search answered"
        );

        let answer = if outcome.answer.trim().is_empty() {
            NO_ANSWER.to_string()
        } else {
            outcome.answer
        };
        Ok(json!({
            "final_response": answer,
            "sources": sources,
            "status": "Search complete",
        }))
    }
}

pub fn build_search(model: Arc<dyn ChatModel>, tools: ToolRegistry, max_turns: usize) -> StateGraph<SearchNode> {
    let mut graph = StateGraph::new(StateSchema::new());
    graph
        .add_node(SearchNode::Agent, SearchAgentNode::new(model, tools, max_turns))
        .set_entry_point(SearchNode::Agent)
        .add_edge(SearchNode::Agent, Target::End);
    graph
}

/// Compile with checkpointing and no interrupts
pub fn compile(
    graph: StateGraph<SearchNode>,
    checkpointer: Arc<dyn CheckpointSaver>,
) -> langgraph_core::Result<CompiledGraph<SearchNode>> {
    graph.compile_with(checkpointer, InterruptConfig::new())
}
