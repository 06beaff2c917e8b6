//! Error types for graph construction and execution
//!
//! Nodes report failures as a boxed error ([`NodeError`]); the executor wraps
//! them in [`GraphError::NodeExecution`] together with the failing node's name
//! and aborts the current run. The thread's last checkpoint stays intact, so a
//! later call can resume instead of starting over.

use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type returned by node implementations
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure is invalid (missing entry, dangling edge, ...)
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A node raised an error its own error handling did not absorb
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution { node: String, error: String },

    /// Run-level failure (recursion limit, nothing to resume, ...)
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("State error{}: {error}", node.as_ref().map(|n| format!(" in node '{}'", n)).unwrap_or_default())]
    StateError { node: Option<String>, error: String },

    /// A persisted node name no longer maps to a node of this graph
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] langgraph_checkpoint::CheckpointError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    pub fn state_error(node: Option<impl Into<String>>, error: impl Into<String>) -> Self {
        Self::StateError {
            node: node.map(|n| n.into()),
            error: error.into(),
        }
    }
}
