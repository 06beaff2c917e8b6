//! Brew graph assembly
//!
//! Two graphs share the same nodes and differ only in scheduling:
//!
//! ```text
//!  sequential:
//!   START → planner ─┬─ direct ──────────────────────────────→ END
//!                    └→ task_router ─┬→ {content,analytics,social,general}_worker → task_router
//!                                    ├→ research_worker → reviewer_worker ─┬→ research_worker
//!                                    │                                      └→ strategist_worker → task_router
//!                                    └→ synthesizer → END   (cursor past the plan)
//!
//!  parallel:
//!   START → planner ─┬─ direct ───────────────────→ END
//!                    └─ Send per task → *_worker ──→ synthesizer → END
//! ```

use super::state::{brew_schema, BrewState, TaskAssignment, WorkerKind};
use super::workers::{
    PlannerNode, ResearchNode, ReviewerNode, StrategistNode, SynthesizerNode, TaskRouterNode,
    WorkerNode, Workers,
};
use crate::tools::ToolRegistry;
use langgraph_core::checkpoint::CheckpointSaver;
use langgraph_core::{
    node_key, CompiledGraph, InterruptConfig, Result, Route, Send, StateGraph, Target,
};
use llm::ChatModel;
use serde_json::{json, Value};
use std::sync::Arc;

node_key! {
    pub enum BrewNode {
        Planner => "planner",
        TaskRouter => "task_router",
        ResearchWorker => "research_worker",
        ReviewerWorker => "reviewer_worker",
        StrategistWorker => "strategist_worker",
        ContentWorker => "content_worker",
        AnalyticsWorker => "analytics_worker",
        SocialWorker => "social_worker",
        GeneralWorker => "general_worker",
        Synthesizer => "synthesizer",
    }
}

impl BrewNode {
    pub fn for_worker(worker: WorkerKind) -> Self {
        match worker {
            WorkerKind::Research => BrewNode::ResearchWorker,
            WorkerKind::Reviewer => BrewNode::ReviewerWorker,
            WorkerKind::Strategist => BrewNode::StrategistWorker,
            WorkerKind::Content => BrewNode::ContentWorker,
            WorkerKind::Analytics => BrewNode::AnalyticsWorker,
            WorkerKind::Social => BrewNode::SocialWorker,
            WorkerKind::General => BrewNode::GeneralWorker,
        }
    }

    /// Worker run by this node, if it is a worker node
    pub fn worker(&self) -> Option<WorkerKind> {
        match self {
            BrewNode::ResearchWorker => Some(WorkerKind::Research),
            BrewNode::ReviewerWorker => Some(WorkerKind::Reviewer),
            BrewNode::StrategistWorker => Some(WorkerKind::Strategist),
            BrewNode::ContentWorker => Some(WorkerKind::Content),
            BrewNode::AnalyticsWorker => Some(WorkerKind::Analytics),
            BrewNode::SocialWorker => Some(WorkerKind::Social),
            BrewNode::GeneralWorker => Some(WorkerKind::General),
            BrewNode::Planner | BrewNode::TaskRouter | BrewNode::Synthesizer => None,
        }
    }
}

/// Tuning knobs of the brew graphs
#[derive(Debug, Clone, Copy)]
pub struct BrewSettings {
    pub max_research_rounds: u32,
    pub max_turns: usize,
}

impl Default for BrewSettings {
    fn default() -> Self {
        Self {
            max_research_rounds: 3,
            max_turns: 3,
        }
    }
}

fn view(state: &Value) -> BrewState {
    BrewState::from_value(state).unwrap_or_default()
}

fn planned(state: &Value) -> bool {
    view(state)
        .task_plan
        .is_some_and(|plan| !plan.tasks.is_empty())
}

/// Sequential: continue to the router unless the planner answered directly
pub fn route_after_planner(state: &Value) -> Route<BrewNode> {
    if planned(state) {
        Route::Goto(BrewNode::TaskRouter)
    } else {
        Route::End
    }
}

/// Sequential: worker of the assignment at the cursor, or synthesis past the end
pub fn route_from_cursor(state: &Value) -> Route<BrewNode> {
    match view(state).current_assignment() {
        Some(assignment) => Route::Goto(BrewNode::for_worker(assignment.worker)),
        None => Route::Goto(BrewNode::Synthesizer),
    }
}

/// Debate gate: another research round while rejected and rounds remain
pub fn route_debate(state: &Value, max_rounds: u32) -> Route<BrewNode> {
    let state = view(state);
    if state.critique.contains("REJECT") && state.iteration_count < max_rounds {
        Route::Goto(BrewNode::ResearchWorker)
    } else {
        Route::Goto(BrewNode::StrategistWorker)
    }
}

/// Input of one fan-out task
pub fn worker_input(assignment: &TaskAssignment, state: &BrewState) -> Value {
    json!({
        "assignment": assignment,
        "messages": state.messages,
        "model_options": state.model_options,
    })
}

/// Parallel: one task per assignment, each with its own input
pub fn fan_out(state: &Value) -> Route<BrewNode> {
    let state = view(state);
    let sends: Vec<Send<BrewNode>> = state
        .task_plan
        .as_ref()
        .map(|plan| {
            plan.tasks
                .iter()
                .map(|assignment| {
                    Send::new(
                        BrewNode::for_worker(assignment.worker),
                        worker_input(assignment, &state),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    if sends.is_empty() {
        Route::End
    } else {
        Route::Sends(sends)
    }
}

const SINGLE_SHOT: [WorkerKind; 4] = [
    WorkerKind::Content,
    WorkerKind::Analytics,
    WorkerKind::Social,
    WorkerKind::General,
];

/// Priority-ordered dispatch with the research debate loop
pub fn build_sequential(
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    settings: BrewSettings,
) -> StateGraph<BrewNode> {
    let workers = Arc::new(Workers::new(model.clone(), tools, settings.max_turns));
    let max_rounds = settings.max_research_rounds;

    let mut graph = StateGraph::new(brew_schema());
    graph
        .add_node(BrewNode::Planner, PlannerNode::new(model.clone()))
        .add_node(BrewNode::TaskRouter, TaskRouterNode)
        .add_node(BrewNode::ResearchWorker, ResearchNode::new(workers.clone()))
        .add_node(BrewNode::ReviewerWorker, ReviewerNode::new(workers.clone()))
        .add_node(BrewNode::StrategistWorker, StrategistNode::new(workers.clone()))
        .add_node(BrewNode::Synthesizer, SynthesizerNode::new(model))
        .set_entry_point(BrewNode::Planner)
        .add_conditional_edge(BrewNode::Planner, route_after_planner)
        .add_conditional_edge(BrewNode::TaskRouter, route_from_cursor)
        .add_edge(BrewNode::ResearchWorker, BrewNode::ReviewerWorker)
        .add_conditional_edge(BrewNode::ReviewerWorker, move |state: &Value| {
            route_debate(state, max_rounds)
        })
        .add_edge(BrewNode::StrategistWorker, BrewNode::TaskRouter)
        .add_edge(BrewNode::Synthesizer, Target::End);

    for kind in SINGLE_SHOT {
        let node = BrewNode::for_worker(kind);
        graph
            .add_node(node, WorkerNode::sequential(kind, workers.clone()))
            .add_edge(node, BrewNode::TaskRouter);
    }
    graph
}

/// Concurrent dispatch of every assignment, converging on the synthesizer
pub fn build_parallel(
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    settings: BrewSettings,
) -> StateGraph<BrewNode> {
    let workers = Arc::new(Workers::new(model.clone(), tools, settings.max_turns));

    let mut graph = StateGraph::new(brew_schema());
    graph
        .add_node(BrewNode::Planner, PlannerNode::new(model.clone()))
        .add_node(BrewNode::Synthesizer, SynthesizerNode::new(model))
        .set_entry_point(BrewNode::Planner)
        .add_conditional_edge(BrewNode::Planner, fan_out)
        .add_edge(BrewNode::Synthesizer, Target::End);

    for kind in SINGLE_SHOT
        .into_iter()
        .chain([WorkerKind::Research, WorkerKind::Reviewer, WorkerKind::Strategist])
    {
        let node = BrewNode::for_worker(kind);
        graph
            .add_node(node, WorkerNode::parallel(kind, workers.clone()))
            .add_edge(node, BrewNode::Synthesizer);
    }
    graph
}

/// Compile a brew graph with checkpointing and no interrupts
pub fn compile(
    graph: StateGraph<BrewNode>,
    checkpointer: Arc<dyn CheckpointSaver>,
) -> Result<CompiledGraph<BrewNode>> {
    graph.compile_with(checkpointer, InterruptConfig::new())
}
