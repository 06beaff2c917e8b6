//! Brew: multi-worker chat orchestration
//!
//! - `state` - plan, assignment and report types plus the graph state view
//! - `planner` - direct / general / structured request classification
//! - `prompts` - worker system prompts
//! - `workers` - graph nodes, including the research debate loop
//! - `graph` - sequential and parallel graph assembly

pub mod graph;
pub mod planner;
pub mod prompts;
pub mod state;
pub mod workers;

pub use graph::{build_parallel, build_sequential, BrewNode, BrewSettings};
pub use planner::{classify, RequestClass};
pub use state::{BrewState, ReportStatus, TaskAssignment, TaskPlan, WorkerKind, WorkerReport};
