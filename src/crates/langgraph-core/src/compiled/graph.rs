//! CompiledGraph struct and builder methods

use crate::error::{GraphError, Result};
use crate::graph::{Edges, Node, NodeKey};
use crate::interrupt::InterruptConfig;
use crate::send::Task;
use crate::state::StateSchema;
use langgraph_checkpoint::{CheckpointSaver, PendingTask};
use std::collections::HashMap;
use std::sync::Arc;

/// Default bound on supersteps per invocation
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

/// Compiled graph ready for execution. Cheap to clone.
pub struct CompiledGraph<N: NodeKey> {
    pub(crate) nodes: Arc<HashMap<N, Arc<dyn Node>>>,
    pub(crate) edges: Arc<HashMap<N, Edges<N>>>,
    pub(crate) entry: Arc<Edges<N>>,
    pub(crate) schema: Arc<StateSchema>,
    pub(crate) checkpoint_saver: Option<Arc<dyn CheckpointSaver>>,
    pub(crate) interrupt_config: InterruptConfig<N>,
    pub(crate) recursion_limit: usize,
}

impl<N: NodeKey> Clone for CompiledGraph<N> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            entry: self.entry.clone(),
            schema: self.schema.clone(),
            checkpoint_saver: self.checkpoint_saver.clone(),
            interrupt_config: self.interrupt_config.clone(),
            recursion_limit: self.recursion_limit,
        }
    }
}

impl<N: NodeKey> CompiledGraph<N> {
    pub(crate) fn new(
        nodes: HashMap<N, Arc<dyn Node>>,
        edges: HashMap<N, Edges<N>>,
        entry: Edges<N>,
        schema: StateSchema,
    ) -> Self {
        Self {
            nodes: Arc::new(nodes),
            edges: Arc::new(edges),
            entry: Arc::new(entry),
            schema: Arc::new(schema),
            checkpoint_saver: None,
            interrupt_config: InterruptConfig::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpoint_saver = Some(saver);
        self
    }

    pub fn with_interrupt_config(mut self, config: InterruptConfig<N>) -> Self {
        self.interrupt_config = config;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn interrupt_config(&self) -> &InterruptConfig<N> {
        &self.interrupt_config
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn CheckpointSaver>> {
        self.checkpoint_saver.as_ref()
    }

    pub(crate) fn require_saver(&self) -> Result<&Arc<dyn CheckpointSaver>> {
        self.checkpoint_saver.as_ref().ok_or_else(|| {
            GraphError::Execution("no checkpoint saver configured".to_string())
        })
    }

    /// Tasks scheduled by the outgoing edges of `node` for `state`
    pub(crate) fn routes_from(&self, node: N, state: &serde_json::Value) -> Vec<Task<N>> {
        self.edges
            .get(&node)
            .map(|edges| edges.resolve(state))
            .unwrap_or_default()
    }

    pub(crate) fn encode_tasks(tasks: &[Task<N>]) -> Vec<PendingTask> {
        tasks
            .iter()
            .map(|task| PendingTask {
                node: task.node.as_str().to_string(),
                arg: task.arg.clone(),
            })
            .collect()
    }

    pub(crate) fn decode_tasks(pending: &[PendingTask]) -> Result<Vec<Task<N>>> {
        pending
            .iter()
            .map(|p| {
                let node = N::parse(&p.node).ok_or_else(|| GraphError::UnknownNode(p.node.clone()))?;
                Ok(Task {
                    node,
                    arg: p.arg.clone(),
                })
            })
            .collect()
    }
}
