//! StateGraph builder
//!
//! [`StateGraph`] collects nodes and edges, validates the structure and
//! compiles into an executable [`CompiledGraph`].
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │  StateGraph<N> (builder)              │
//! │   nodes: N → Node                     │
//! │   edges: N → fixed targets + router   │
//! │   schema: field reducers              │
//! └───────────────────┬───────────────────┘
//!                     │ compile() / compile_with(..)
//!                     ▼
//! ┌───────────────────────────────────────┐
//! │  CompiledGraph<N>                     │
//! │   supersteps, fan-out, reducers,      │
//! │   checkpoints, interrupt-after        │
//! └───────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use langgraph_core::{node_key, NodeContext, NodeError, Route, StateGraph, StateSchema, Target};
//! use serde_json::{json, Value};
//!
//! node_key! {
//!     enum Step { Draft => "draft", Review => "review" }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = StateGraph::new(StateSchema::new());
//! graph
//!     .add_node(Step::Draft, |_state: Value, _ctx: NodeContext| async move {
//!         Ok::<_, NodeError>(json!({"draft": "v1"}))
//!     })
//!     .add_node(Step::Review, |_state: Value, _ctx: NodeContext| async move {
//!         Ok::<_, NodeError>(json!({"approved": true}))
//!     })
//!     .set_entry_point(Step::Draft)
//!     .add_edge(Step::Draft, Step::Review)
//!     .add_conditional_edge(Step::Review, |state: &Value| {
//!         if state["approved"].as_bool().unwrap_or(false) {
//!             Route::End
//!         } else {
//!             Route::Goto(Step::Draft)
//!         }
//!     });
//!
//! let compiled = graph.compile()?;
//! let outcome = compiled.invoke(json!({})).await?;
//! assert!(!outcome.is_interrupted());
//! # Ok(())
//! # }
//! ```

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{Edges, Node, NodeKey, Target};
use crate::interrupt::InterruptConfig;
use crate::send::Route;
use crate::state::StateSchema;
use langgraph_checkpoint::CheckpointSaver;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for a stateful graph over node keys `N`
pub struct StateGraph<N: NodeKey> {
    nodes: HashMap<N, Arc<dyn Node>>,
    edges: HashMap<N, Edges<N>>,
    entry: Edges<N>,
    schema: StateSchema,
}

impl<N: NodeKey> StateGraph<N> {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: Edges::default(),
            schema,
        }
    }

    /// Register a node. Registering the same key twice replaces the node.
    pub fn add_node(&mut self, key: N, node: impl Node + 'static) -> &mut Self {
        self.nodes.insert(key, Arc::new(node));
        self
    }

    /// Register an already shared node
    pub fn add_shared_node(&mut self, key: N, node: Arc<dyn Node>) -> &mut Self {
        self.nodes.insert(key, node);
        self
    }

    /// Start every run at `node`
    pub fn set_entry_point(&mut self, node: N) -> &mut Self {
        self.entry.fixed.push(Target::Node(node));
        self
    }

    /// Decide the first node(s) from the input state
    pub fn set_conditional_entry_point<F>(&mut self, router: F) -> &mut Self
    where
        F: Fn(&Value) -> Route<N> + Send + Sync + 'static,
    {
        self.entry.conditional = Some(Arc::new(router));
        self
    }

    /// Unconditional edge. `to` may be a node or [`Target::End`].
    pub fn add_edge(&mut self, from: N, to: impl Into<Target<N>>) -> &mut Self {
        self.edges.entry(from).or_default().fixed.push(to.into());
        self
    }

    /// Edge guarded by a routing function evaluated after `from` completes
    pub fn add_conditional_edge<F>(&mut self, from: N, router: F) -> &mut Self
    where
        F: Fn(&Value) -> Route<N> + Send + Sync + 'static,
    {
        self.edges.entry(from).or_default().conditional = Some(Arc::new(router));
        self
    }

    /// Check the structure without consuming the builder
    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() {
            return Err(GraphError::Validation(
                "graph has no entry point".to_string(),
            ));
        }

        let targets = self
            .entry
            .fixed
            .iter()
            .chain(self.edges.values().flat_map(|e| e.fixed.iter()));
        for target in targets {
            if let Target::Node(node) = target {
                if !self.nodes.contains_key(node) {
                    return Err(GraphError::Validation(format!(
                        "edge targets unregistered node '{}'",
                        node.as_str()
                    )));
                }
            }
        }

        for from in self.edges.keys() {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::Validation(format!(
                    "edge leaves unregistered node '{}'",
                    from.as_str()
                )));
            }
        }

        for node in self.nodes.keys() {
            if self.edges.get(node).map_or(true, Edges::is_empty) {
                return Err(GraphError::Validation(format!(
                    "node '{}' has no outgoing edge (use Target::End to finish)",
                    node.as_str()
                )));
            }
        }

        Ok(())
    }

    /// Compile without persistence or interrupts
    pub fn compile(self) -> Result<CompiledGraph<N>> {
        self.validate()?;
        Ok(CompiledGraph::new(self.nodes, self.edges, self.entry, self.schema))
    }

    /// Compile with a checkpointer and interrupt points
    pub fn compile_with(
        self,
        checkpointer: Arc<dyn CheckpointSaver>,
        interrupts: InterruptConfig<N>,
    ) -> Result<CompiledGraph<N>> {
        for node in &interrupts.interrupt_after {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::Validation(format!(
                    "interrupt configured for unregistered node '{}'",
                    node.as_str()
                )));
            }
        }
        Ok(self
            .compile()?
            .with_checkpointer(checkpointer)
            .with_interrupt_config(interrupts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::node_key;
    use crate::stream::NodeContext;
    use serde_json::json;

    node_key! {
        enum Key {
            A => "a",
            B => "b",
        }
    }

    async fn noop(_state: Value, _ctx: NodeContext) -> std::result::Result<Value, NodeError> {
        Ok(json!({}))
    }

    #[test]
    fn test_missing_entry_is_rejected() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node(Key::A, noop).add_edge(Key::A, Target::End);
        assert!(matches!(graph.validate(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph
            .add_node(Key::A, noop)
            .set_entry_point(Key::A)
            .add_edge(Key::A, Key::B);
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_node_without_exit_is_rejected() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph
            .add_node(Key::A, noop)
            .add_node(Key::B, noop)
            .set_entry_point(Key::A)
            .add_edge(Key::A, Key::B);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_valid_graph_compiles() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph
            .add_node(Key::A, noop)
            .add_node(Key::B, noop)
            .set_entry_point(Key::A)
            .add_edge(Key::A, Key::B)
            .add_edge(Key::B, Target::End);
        assert!(graph.compile().is_ok());
    }
}
