//! Execution telemetry
//!
//! While a graph runs, the executor and the nodes it drives emit
//! [`ExecutionEvent`]s into an [`EventSink`]. The sink is an unbounded channel
//! sender that never blocks and never fails: if the receiving side has gone
//! away (a client abandoned its stream) events are dropped and execution
//! continues unaffected.
//!
//! ```text
//!  executor ──NodeStart/NodeEnd──┐
//!  node ──ModelToken/ToolStart───┼──→ EventSink ──→ mpsc ──→ consumer
//!  node ──ToolEnd/Custom─────────┘
//! ```
//!
//! Nodes reach the sink through their [`NodeContext`], which also tags each
//! event with the emitting node's name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Raw telemetry from a running graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A node task is about to run with `input`
    NodeStart {
        node: String,
        step: usize,
        input: Value,
    },
    /// A node task finished and produced `output` (its partial update)
    NodeEnd {
        node: String,
        step: usize,
        output: Value,
    },
    /// A node task failed; the run aborts after this event
    NodeError {
        node: String,
        step: usize,
        error: String,
    },
    /// Streamed model output from inside a node
    ModelToken { node: String, token: String },
    ToolStart {
        node: String,
        tool: String,
        input: Value,
    },
    ToolEnd {
        node: String,
        tool: String,
        output: String,
    },
    /// Application-defined payload
    Custom { node: String, payload: Value },
}

impl ExecutionEvent {
    /// Name of the node that produced this event
    pub fn node(&self) -> &str {
        match self {
            ExecutionEvent::NodeStart { node, .. }
            | ExecutionEvent::NodeEnd { node, .. }
            | ExecutionEvent::NodeError { node, .. }
            | ExecutionEvent::ModelToken { node, .. }
            | ExecutionEvent::ToolStart { node, .. }
            | ExecutionEvent::ToolEnd { node, .. }
            | ExecutionEvent::Custom { node, .. } => node,
        }
    }
}

/// Non-blocking event sender. The default sink discards everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl EventSink {
    /// Create a connected sink and its receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event
    pub fn discard() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means nobody is watching; execution goes on
            let _ = tx.send(event);
        }
    }
}

/// Per-task handle given to a node
#[derive(Debug, Clone)]
pub struct NodeContext {
    node: &'static str,
    thread_id: String,
    step: usize,
    sink: EventSink,
}

impl NodeContext {
    pub fn new(node: &'static str, thread_id: impl Into<String>, step: usize, sink: EventSink) -> Self {
        Self {
            node,
            thread_id: thread_id.into(),
            step,
            sink,
        }
    }

    /// Context for calling a node outside of a graph run (tests, tooling)
    pub fn detached(node: &'static str) -> Self {
        Self::new(node, "detached", 0, EventSink::discard())
    }

    pub fn node(&self) -> &'static str {
        self.node
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub fn emit_token(&self, token: impl Into<String>) {
        self.sink.emit(ExecutionEvent::ModelToken {
            node: self.node.to_string(),
            token: token.into(),
        });
    }

    pub fn tool_start(&self, tool: impl Into<String>, input: Value) {
        self.sink.emit(ExecutionEvent::ToolStart {
            node: self.node.to_string(),
            tool: tool.into(),
            input,
        });
    }

    pub fn tool_end(&self, tool: impl Into<String>, output: impl Into<String>) {
        self.sink.emit(ExecutionEvent::ToolEnd {
            node: self.node.to_string(),
            tool: tool.into(),
            output: output.into(),
        });
    }

    pub fn custom(&self, payload: Value) {
        self.sink.emit(ExecutionEvent::Custom {
            node: self.node.to_string(),
            payload,
        });
    }
}
