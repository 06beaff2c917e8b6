//! Core graph building blocks
//!
//! A graph is a fixed set of nodes identified by a closed enumeration of keys
//! ([`NodeKey`]). Using an enum instead of free-form strings means every
//! router in an application matches exhaustively over the nodes it can reach,
//! and adding a node is a compile-time checked change. Keys still have a
//! stable string form, which is what checkpoints persist.
//!
//! ```text
//!   START ──→ planner ──┬──→ executor ──→ reporter ──→ END
//!                ▲      │
//!                └──────┘  (conditional edge)
//! ```
//!
//! # Declaring node keys
//!
//! ```rust
//! use langgraph_core::{node_key, NodeKey};
//!
//! node_key! {
//!     pub enum Step {
//!         Plan => "plan",
//!         Act => "act",
//!     }
//! }
//!
//! assert_eq!(Step::Plan.as_str(), "plan");
//! assert_eq!(Step::parse("act"), Some(Step::Act));
//! ```

use crate::error::NodeError;
use crate::send::{Route, Task};
use crate::stream::NodeContext;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

/// Identifier of a node in a graph
pub trait NodeKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Stable name, used in checkpoints and telemetry
    fn as_str(&self) -> &'static str;

    /// Inverse of [`as_str`](Self::as_str)
    fn parse(name: &str) -> Option<Self>;
}

/// Declare a node-key enum with its stable names.
///
/// Generates the enum, a [`NodeKey`] impl and a `Display` impl.
#[macro_export]
macro_rules! node_key {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::graph::NodeKey for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }

            fn parse(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::graph::NodeKey::as_str(self))
            }
        }
    };
}

/// A unit of execution.
///
/// Receives the current state (or, for fan-out tasks, its own derived input)
/// and returns a partial update holding only the fields it changed.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError>;
}

#[async_trait]
impl<F, Fut> Node for F
where
    F: Fn(Value, NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, NodeError>> + Send + 'static,
{
    async fn run(&self, input: Value, ctx: NodeContext) -> Result<Value, NodeError> {
        (self)(input, ctx).await
    }
}

/// Destination of an unconditional edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target<N> {
    Node(N),
    End,
}

impl<N: NodeKey> From<N> for Target<N> {
    fn from(node: N) -> Self {
        Target::Node(node)
    }
}

/// Routing function evaluated against the merged state after a node completes
pub type Router<N> = Arc<dyn Fn(&Value) -> Route<N> + Send + Sync>;

/// Outgoing edges of one node (or of START)
pub(crate) struct Edges<N> {
    pub(crate) fixed: Vec<Target<N>>,
    pub(crate) conditional: Option<Router<N>>,
}

impl<N> Default for Edges<N> {
    fn default() -> Self {
        Self {
            fixed: Vec::new(),
            conditional: None,
        }
    }
}

impl<N: Clone> Clone for Edges<N> {
    fn clone(&self) -> Self {
        Self {
            fixed: self.fixed.clone(),
            conditional: self.conditional.clone(),
        }
    }
}

impl<N: NodeKey> Edges<N> {
    pub(crate) fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.conditional.is_none()
    }

    /// Evaluate all outgoing edges into the tasks they schedule
    pub(crate) fn resolve(&self, state: &Value) -> Vec<Task<N>> {
        let mut tasks: Vec<Task<N>> = self
            .fixed
            .iter()
            .filter_map(|target| match target {
                Target::Node(node) => Some(Task {
                    node: *node,
                    arg: None,
                }),
                Target::End => None,
            })
            .collect();
        if let Some(router) = &self.conditional {
            tasks.extend(router(state).tasks());
        }
        tasks
    }
}
