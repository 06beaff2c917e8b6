//! Interrupt-after-node configuration
//!
//! When a node listed in [`InterruptConfig`] completes, the executor persists
//! the merged state together with the tasks that would run next, marks the
//! checkpoint as an interrupt point and returns
//! [`RunOutcome::Interrupted`](crate::RunOutcome::Interrupted) without
//! advancing. There is no timeout: the thread stays paused until the caller
//! resumes it.
//!
//! Resuming takes one of two shapes, both expressed through
//! [`CompiledGraph::update_state`](crate::CompiledGraph::update_state):
//!
//! - `as_node = Some(node)`: the update is treated as if `node` had just
//!   written it, and the outgoing edges of `node` are re-evaluated against the
//!   updated state. A router may send execution back into `node` (revise) or
//!   forward (approve).
//! - `as_node = None`: the update is merged and the previously pending tasks
//!   run unchanged.
//!
//! Either way the caller then invokes the graph with no input to continue.

use crate::graph::NodeKey;

#[derive(Debug, Clone)]
pub struct InterruptConfig<N> {
    /// Nodes after which execution pauses
    pub interrupt_after: Vec<N>,
}

impl<N> Default for InterruptConfig<N> {
    fn default() -> Self {
        Self {
            interrupt_after: Vec::new(),
        }
    }
}

impl<N: NodeKey> InterruptConfig<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interrupt_after(mut self, nodes: Vec<N>) -> Self {
        self.interrupt_after = nodes;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.interrupt_after.is_empty()
    }

    pub fn should_interrupt_after(&self, node: N) -> bool {
        self.interrupt_after.contains(&node)
    }
}
