//! Routing decisions and fan-out
//!
//! A routing function returns a [`Route`]: continue to one node, to several
//! nodes that run concurrently against the shared state, to several
//! [`Send`] tasks that each run against their own derived input, or stop.
//!
//! ```rust
//! use langgraph_core::{node_key, Route, Send};
//! use serde_json::json;
//!
//! node_key! {
//!     enum Step { Worker => "worker", Synth => "synth" }
//! }
//!
//! // One task per plan item, each with its own input
//! let route = Route::Sends(vec![
//!     Send::new(Step::Worker, json!({"task": "a"})),
//!     Send::new(Step::Worker, json!({"task": "b"})),
//! ]);
//! assert_eq!(route.tasks().len(), 2);
//! ```
//!
//! Results of fan-out tasks converge into the shared state through the field
//! reducers before the executor moves past the fan-out point.

use crate::graph::NodeKey;
use serde_json::Value;

/// Invoke `node` with `arg` as its input instead of the shared state
#[derive(Debug, Clone, PartialEq)]
pub struct Send<N> {
    pub node: N,
    pub arg: Value,
}

impl<N: NodeKey> Send<N> {
    pub fn new(node: N, arg: Value) -> Self {
        Self { node, arg }
    }
}

/// Result of evaluating the outgoing edges of a node
#[derive(Debug, Clone, PartialEq)]
pub enum Route<N> {
    /// Continue with a single node
    Goto(N),
    /// Run several nodes concurrently with the shared state
    Many(Vec<N>),
    /// Run tasks with derived inputs concurrently
    Sends(Vec<Send<N>>),
    /// Stop this branch
    End,
}

/// One unit of work in a superstep
#[derive(Debug, Clone, PartialEq)]
pub struct Task<N> {
    pub node: N,
    pub arg: Option<Value>,
}

impl<N: NodeKey> Route<N> {
    /// Flatten into tasks. An empty `Many`/`Sends` behaves like `End`.
    pub fn tasks(self) -> Vec<Task<N>> {
        match self {
            Route::Goto(node) => vec![Task { node, arg: None }],
            Route::Many(nodes) => nodes.into_iter().map(|node| Task { node, arg: None }).collect(),
            Route::Sends(sends) => sends
                .into_iter()
                .map(|s| Task {
                    node: s.node,
                    arg: Some(s.arg),
                })
                .collect(),
            Route::End => Vec::new(),
        }
    }
}
