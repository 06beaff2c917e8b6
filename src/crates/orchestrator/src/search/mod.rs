//! Search mode: one agent answers a chat turn with the tools
//!
//! There is no planner and there are no workers. The agent sees the
//! conversation, searches as often as its turn budget allows and answers
//! directly with sources.

pub mod graph;
pub mod prompts;

pub use graph::{build_search, SearchAgentNode, SearchNode, SearchState};
