//! Research graph assembly
//!
//! ```text
//!  START → research_planner → discovery → extraction → synthesis → END
//! ```

use super::nodes::{DiscoveryNode, ExtractionNode, ResearchPlanner, ResearchSettings, SynthesisNode};
use super::state::research_schema;
use crate::tools::ToolRegistry;
use langgraph_core::checkpoint::CheckpointSaver;
use langgraph_core::{node_key, CompiledGraph, InterruptConfig, Result, StateGraph, Target};
use llm::ChatModel;
use std::sync::Arc;

node_key! {
    pub enum ResearchNode {
        Planner => "research_planner",
        Discovery => "discovery",
        Extraction => "extraction",
        Synthesis => "synthesis",
    }
}

pub fn build_research(
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    settings: ResearchSettings,
) -> StateGraph<ResearchNode> {
    let mut graph = StateGraph::new(research_schema());
    graph
        .add_node(ResearchNode::Planner, ResearchPlanner::new(model.clone()))
        .add_node(
            ResearchNode::Discovery,
            DiscoveryNode::new(model.clone(), tools.clone(), settings),
        )
        .add_node(
            ResearchNode::Extraction,
            ExtractionNode::new(model.clone(), tools, settings),
        )
        .add_node(ResearchNode::Synthesis, SynthesisNode::new(model))
        .set_entry_point(ResearchNode::Planner)
        .add_edge(ResearchNode::Planner, ResearchNode::Discovery)
        .add_edge(ResearchNode::Discovery, ResearchNode::Extraction)
        .add_edge(ResearchNode::Extraction, ResearchNode::Synthesis)
        .add_edge(ResearchNode::Synthesis, Target::End);
    graph
}

/// Compile with checkpointing and no interrupts
pub fn compile(
    graph: StateGraph<ResearchNode>,
    checkpointer: Arc<dyn CheckpointSaver>,
) -> Result<CompiledGraph<ResearchNode>> {
    graph.compile_with(checkpointer, InterruptConfig::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{ResearchState, TodoStatus};
    use crate::testing::{reply, structured, system_text, ScriptedModel, ScriptedTool};
    use llm::{ChatResponse, Message, ToolCall};
    use serde_json::json;

    #[tokio::test]
    async fn test_stages_run_in_order_and_feed_each_other() {
        let search = ScriptedTool::new("tavily_search", |_| Ok("Survey https://iea.org/heat-pumps".to_string()));
        let scrape = ScriptedTool::new("scrape_competitor_page", |args| {
            Ok(format!("Full text of {}: 3x efficiency", args["url"]))
        });
        let model = ScriptedModel::new(|request| {
            let system = system_text(request);
            let used_tools = request.messages.iter().any(|m| m.tool_call_id.is_some());
            if system.contains("research lead") {
                Ok(structured(json!({"todos": ["Search heat pump adoption", "Read the IEA survey"]})))
            } else if system.contains("discovery expert") && !used_tools {
                Ok(ChatResponse::new(Message::assistant("").with_tool_calls(vec![ToolCall::new(
                    "d1",
                    "tavily_search",
                    json!({"query": "heat pump adoption"}),
                )])))
            } else if system.contains("extraction specialist") && !used_tools {
                Ok(ChatResponse::new(Message::assistant("").with_tool_calls(vec![ToolCall::new(
                    "e1",
                    "scrape_competitor_page",
                    json!({"url": "https://iea.org/heat-pumps"}),
                )])))
            } else if system.contains("discovery expert") {
                Ok(reply("IEA survey is the key source"))
            } else if system.contains("extraction specialist") {
                Ok(reply("Heat pumps deliver 3x efficiency"))
            } else {
                Ok(reply("## Executive Summary\nAdoption is rising."))
            }
        });

        let graph = build_research(
            model.clone(),
            ToolRegistry::new().with_tool(search).with_tool(scrape.clone()),
            ResearchSettings::default(),
        )
        .compile()
        .unwrap();
        let outcome = graph
            .invoke(json!({"messages": [{"role": "user", "content": "heat pump adoption"}]}))
            .await
            .unwrap();

        let state = ResearchState::from_value(outcome.state()).unwrap();
        assert_eq!(state.query, "heat pump adoption");
        assert_eq!(state.sources, vec!["https://iea.org/heat-pumps".to_string()]);
        assert_eq!(state.extracted, "Heat pumps deliver 3x efficiency");
        assert_eq!(state.final_response, "## Executive Summary\nAdoption is rising.");
        assert_eq!(state.todos.len(), 2);
        assert!(state.todos.iter().all(|t| t.status == TodoStatus::Completed));
        assert_eq!(scrape.calls(), vec![json!({"url": "https://iea.org/heat-pumps"})]);

        let synthesis = model
            .requests()
            .into_iter()
            .find(|r| system_text(r).contains("senior research analyst"))
            .unwrap();
        let prompt = synthesis.messages.last().unwrap().text();
        assert!(prompt.contains("IEA survey is the key source"));
        assert!(prompt.contains("3x efficiency"));
    }
}
