//! Investigator graph assembly
//!
//! ```text
//!  START → planner ─(pause)─┬→ planner   (feedback asks for changes)
//!                           └→ executor → reporter → END
//! ```
//!
//! The run pauses after every planner step. A caller resumes it by writing
//! `user_feedback` and `feedback_action` as the planner, which recomputes the
//! planner's route from the new values, then resuming.

use super::feedback::{classify_feedback, FeedbackClass};
use super::nodes::{ExecutorNode, InvestigatorPlanner, InvestigatorSettings, ReporterNode};
use super::state::{investigator_schema, FeedbackAction, InvestigatorState};
use crate::tools::ToolRegistry;
use langgraph_core::checkpoint::CheckpointSaver;
use langgraph_core::{node_key, CompiledGraph, InterruptConfig, Result, Route, StateGraph, Target};
use llm::ChatModel;
use serde_json::Value;
use std::sync::Arc;

node_key! {
    pub enum InvestigatorNode {
        Planner => "planner",
        Executor => "executor",
        Reporter => "reporter",
    }
}

/// Approved or clearly approving feedback runs the plan; anything else plans again
pub fn route_after_planner(state: &Value) -> Route<InvestigatorNode> {
    let state = InvestigatorState::from_value(state).unwrap_or_default();
    let proceed = match state.feedback_action {
        Some(action) => action == FeedbackAction::Approve,
        None => classify_feedback(&state.user_feedback) == FeedbackClass::Approve,
    };
    if proceed {
        Route::Goto(InvestigatorNode::Executor)
    } else {
        Route::Goto(InvestigatorNode::Planner)
    }
}

pub fn build_investigator(
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    settings: InvestigatorSettings,
) -> StateGraph<InvestigatorNode> {
    let mut graph = StateGraph::new(investigator_schema());
    graph
        .add_node(
            InvestigatorNode::Planner,
            InvestigatorPlanner::new(model.clone(), tools.clone()),
        )
        .add_node(
            InvestigatorNode::Executor,
            ExecutorNode::new(model.clone(), tools, settings),
        )
        .add_node(InvestigatorNode::Reporter, ReporterNode::new(model))
        .set_entry_point(InvestigatorNode::Planner)
        .add_conditional_edge(InvestigatorNode::Planner, route_after_planner)
        .add_edge(InvestigatorNode::Executor, InvestigatorNode::Reporter)
        .add_edge(InvestigatorNode::Reporter, Target::End);
    graph
}

/// Compile with checkpointing and the review pause after the planner
pub fn compile(
    graph: StateGraph<InvestigatorNode>,
    checkpointer: Arc<dyn CheckpointSaver>,
) -> Result<CompiledGraph<InvestigatorNode>> {
    graph.compile_with(
        checkpointer,
        InterruptConfig::new().with_interrupt_after(vec![InvestigatorNode::Planner]),
    )
}
