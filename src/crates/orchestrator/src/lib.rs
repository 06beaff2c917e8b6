//! Multi-worker LLM orchestration service
//!
//! Four graphs run on the `langgraph-core` executor:
//!
//! - **brew** - a planner splits a chat request into worker assignments,
//!   workers (research with a reviewer debate loop, content, analytics,
//!   social, general, strategist) execute them in parallel or in sequence,
//!   and a synthesizer streams the combined answer.
//! - **search** - a single tool agent answers the chat turn directly.
//! - **research** - todo list, source discovery, full-text extraction and a
//!   streamed report, all in one chat turn.
//! - **investigator** - plan, pause for human review, revise or approve,
//!   execute the tasks, write a report.
//!
//! The [`runtime::AgentRuntime`] owns the graphs and a checkpoint store, and
//! translates execution telemetry into [`events::ClientEvent`]s that the
//! [`api`] streams to clients.

pub mod agent;
pub mod api;
pub mod brew;
pub mod config;
pub mod db;
pub mod events;
pub mod investigator;
pub mod research;
pub mod runtime;
pub mod search;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod tools;

pub use config::{ChatMode, DispatchMode, ServerConfig};
pub use events::{ClientEvent, EventHub};
pub use runtime::{AgentRuntime, ChatInput, RuntimeError, RuntimeSettings};
