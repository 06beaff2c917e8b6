//! State inspection and external updates (get_state, update_state, ...)

use super::{CompiledGraph, StateSnapshot};
use crate::error::{GraphError, Result};
use crate::graph::NodeKey;
use futures::StreamExt;
use langgraph_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource, CheckpointTuple,
};
use serde_json::Value;

impl<N: NodeKey> CompiledGraph<N> {
    /// Latest (or addressed) snapshot of a thread. `None` for unknown threads.
    pub async fn get_state(&self, config: &CheckpointConfig) -> Result<Option<StateSnapshot<N>>> {
        let saver = self.require_saver()?;
        match saver.get_tuple(config).await? {
            Some(tuple) => Ok(Some(Self::to_snapshot(tuple)?)),
            None => Ok(None),
        }
    }

    /// Retained snapshots of a thread, newest first
    pub async fn get_state_history(
        &self,
        config: &CheckpointConfig,
        limit: Option<usize>,
    ) -> Result<Vec<StateSnapshot<N>>> {
        let saver = self.require_saver()?;
        let mut stream = saver.list(config, limit).await?;
        let mut snapshots = Vec::new();
        while let Some(tuple) = stream.next().await {
            snapshots.push(Self::to_snapshot(tuple?)?);
        }
        Ok(snapshots)
    }

    /// Merge `values` into a thread's latest state.
    ///
    /// With `as_node`, the update counts as a write by that node: its outgoing
    /// edges are re-evaluated against the updated state and replace the
    /// pending tasks. Without it, the pending tasks are kept. The result is
    /// stored as a pinned checkpoint; call
    /// [`resume`](Self::resume) to continue.
    #[tracing::instrument(skip(self, values), fields(thread_id = config.thread_id.as_deref().unwrap_or("")))]
    pub async fn update_state(
        &self,
        config: &CheckpointConfig,
        values: Value,
        as_node: Option<N>,
    ) -> Result<CheckpointConfig> {
        let saver = self.require_saver()?;
        let tuple = saver.get_tuple(config).await?.ok_or_else(|| {
            GraphError::Execution(format!(
                "no checkpoint found for thread '{}'",
                config.thread_id.as_deref().unwrap_or_default()
            ))
        })?;

        let mut state = Value::Object(tuple.checkpoint.values);
        self.schema
            .apply(&mut state, &values)
            .map_err(|e| GraphError::state_error(as_node.map(|n| n.as_str()), e.to_string()))?;

        let next = match as_node {
            Some(node) => Self::encode_tasks(&self.routes_from(node, &state)),
            None => tuple.checkpoint.next,
        };

        let mut metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Update)
            .with_step(tuple.metadata.step.unwrap_or(-1));
        if let Some(node) = as_node {
            metadata = metadata.with_extra("as_node", Value::String(node.as_str().to_string()));
        }

        tracing::info!(
            as_node = as_node.map(|n| n.as_str()),
            next = ?next.iter().map(|t| t.node.as_str()).collect::<Vec<_>>(),
            "State updated"
        );

        let values = state.as_object().cloned().unwrap_or_default();
        let saved = saver
            .put(config, Checkpoint::new(values, next), metadata)
            .await?;
        Ok(saved)
    }

    fn to_snapshot(tuple: CheckpointTuple) -> Result<StateSnapshot<N>> {
        let next = Self::decode_tasks(&tuple.checkpoint.next)?
            .into_iter()
            .map(|t| t.node)
            .collect();
        let interrupted_after = match &tuple.metadata.interrupted_after {
            Some(name) => Some(N::parse(name).ok_or_else(|| GraphError::UnknownNode(name.clone()))?),
            None => None,
        };

        Ok(StateSnapshot {
            values: Value::Object(tuple.checkpoint.values),
            next,
            interrupted_after,
            config: tuple.config,
            metadata: tuple.metadata,
            created_at: tuple.checkpoint.ts,
        })
    }
}
