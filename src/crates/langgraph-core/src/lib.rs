//! # langgraph-core - Stateful graph execution
//!
//! A small executor for directed graphs of named nodes over a shared JSON
//! state, built for orchestrating LLM workers.
//!
//! ## Concepts
//!
//! - **Nodes** ([`Node`]) receive the state and return a partial update.
//! - **Reducers** ([`StateSchema`]) decide how updates combine: overwrite by
//!   default, append for collection fields written by many nodes.
//! - **Edges** are unconditional or guarded by a routing function returning a
//!   [`Route`]: one node, several nodes, a fan-out of [`Send`] tasks with
//!   derived inputs, or the end.
//! - **Supersteps** run all scheduled tasks concurrently and merge their
//!   updates in task order before routing continues.
//! - **Checkpoints** are written after every superstep through a
//!   [`CheckpointSaver`](langgraph_checkpoint::CheckpointSaver).
//! - **Interrupts** ([`InterruptConfig`]) pause a run after a named node;
//!   [`CompiledGraph::update_state`] plus [`CompiledGraph::resume`] continue it.
//! - **Telemetry** ([`ExecutionEvent`]) flows through an [`EventSink`] that
//!   nodes reach via their [`NodeContext`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use langgraph_core::{node_key, NodeContext, NodeError, StateGraph, StateSchema, Target};
//! use serde_json::{json, Value};
//!
//! node_key! {
//!     enum Step { Greet => "greet" }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = StateGraph::new(StateSchema::new());
//! graph
//!     .add_node(Step::Greet, |state: Value, _ctx: NodeContext| async move {
//!         let name = state["name"].as_str().unwrap_or("there").to_string();
//!         Ok::<_, NodeError>(json!({"greeting": format!("hello {name}")}))
//!     })
//!     .set_entry_point(Step::Greet)
//!     .add_edge(Step::Greet, Target::End);
//!
//! let outcome = graph.compile()?.invoke(json!({"name": "ada"})).await?;
//! assert_eq!(outcome.state()["greeting"], "hello ada");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod interrupt;
pub mod send;
pub mod state;
pub mod stream;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, RunOutcome, StateSnapshot};
pub use error::{GraphError, NodeError, Result};
pub use graph::{Node, NodeKey, Router, Target};
pub use interrupt::InterruptConfig;
pub use send::{Route, Send, Task};
pub use state::{AppendReducer, KeepNonEmptyReducer, OverwriteReducer, Reducer, StateSchema};
pub use stream::{EventSink, ExecutionEvent, NodeContext};

pub use langgraph_checkpoint as checkpoint;
