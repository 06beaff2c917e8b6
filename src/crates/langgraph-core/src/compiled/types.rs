//! Run outcomes and state snapshots

use crate::graph::NodeKey;
use chrono::{DateTime, Utc};
use langgraph_checkpoint::{CheckpointConfig, CheckpointMetadata};
use serde_json::Value;

/// Result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<N> {
    /// The run reached the end of the graph
    Complete(Value),
    /// The run paused after `node`; state is persisted and resumable
    Interrupted { node: N, state: Value },
}

impl<N: NodeKey> RunOutcome<N> {
    pub fn state(&self) -> &Value {
        match self {
            RunOutcome::Complete(state) | RunOutcome::Interrupted { state, .. } => state,
        }
    }

    pub fn into_state(self) -> Value {
        match self {
            RunOutcome::Complete(state) | RunOutcome::Interrupted { state, .. } => state,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunOutcome::Interrupted { .. })
    }

    pub fn interrupted_after(&self) -> Option<N> {
        match self {
            RunOutcome::Interrupted { node, .. } => Some(*node),
            RunOutcome::Complete(_) => None,
        }
    }
}

/// Persisted state of a thread at one checkpoint
#[derive(Debug, Clone)]
pub struct StateSnapshot<N> {
    pub values: Value,

    /// Nodes scheduled to run next; empty once the run finished
    pub next: Vec<N>,

    /// Set when the thread is paused at an interrupt point
    pub interrupted_after: Option<N>,

    /// Config addressing this exact checkpoint
    pub config: CheckpointConfig,

    pub metadata: CheckpointMetadata,

    pub created_at: DateTime<Utc>,
}

impl<N: NodeKey> StateSnapshot<N> {
    pub fn is_paused(&self) -> bool {
        self.interrupted_after.is_some() && !self.next.is_empty()
    }
}
