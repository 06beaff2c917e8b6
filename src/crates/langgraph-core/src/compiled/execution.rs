//! Superstep execution loop
//!
//! Each superstep runs every scheduled task concurrently against a snapshot of
//! the state (or the task's own fan-out input), then folds the partial updates
//! into the state in task order through the schema reducers. Outgoing edges of
//! the nodes that ran are evaluated against the merged state to schedule the
//! next superstep. After every superstep the state and the pending tasks are
//! checkpointed, so a failure in a later step leaves a resumable snapshot.
//!
//! ```text
//!   tasks ──join_all──→ updates ──reducers──→ state ──edges──→ next tasks
//!                                                │
//!                                          checkpoint(next)
//! ```

use super::{CompiledGraph, RunOutcome};
use crate::error::{GraphError, Result};
use crate::graph::NodeKey;
use crate::send::Task;
use crate::stream::{EventSink, ExecutionEvent, NodeContext};
use futures::future::join_all;
use langgraph_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource};
use serde_json::Value;
use std::collections::HashSet;

impl<N: NodeKey> CompiledGraph<N> {
    /// Start a new run with `input` and no telemetry
    pub async fn invoke(&self, input: Value) -> Result<RunOutcome<N>> {
        self.invoke_with_config(Some(input), &CheckpointConfig::default(), EventSink::discard())
            .await
    }

    /// Continue a thread from its latest checkpoint
    pub async fn resume(&self, config: &CheckpointConfig, sink: EventSink) -> Result<RunOutcome<N>> {
        self.invoke_with_config(None, config, sink).await
    }

    /// Run the graph on a thread.
    ///
    /// With `Some(input)` a new run starts from the entry point with the
    /// input folded over the schema defaults. With `None` the thread's latest
    /// checkpoint is loaded and its pending tasks run; a thread whose last run
    /// already finished returns its final state unchanged.
    #[tracing::instrument(
        skip(self, input, sink),
        fields(thread_id = config.thread_id.as_deref().unwrap_or(""), resume = input.is_none())
    )]
    pub async fn invoke_with_config(
        &self,
        input: Option<Value>,
        config: &CheckpointConfig,
        sink: EventSink,
    ) -> Result<RunOutcome<N>> {
        let thread_id = config.thread_id.clone().unwrap_or_default();

        let (mut state, mut tasks, mut step) = match input {
            Some(input) => {
                tracing::info!("Starting graph execution");
                let state = self
                    .schema
                    .initial_state(&input)
                    .map_err(|e| GraphError::state_error(None::<String>, e.to_string()))?;
                let tasks = self.entry.resolve(&state);
                self.save(config, &state, &tasks, -1, CheckpointSource::Input, None)
                    .await?;
                (state, tasks, 0usize)
            }
            None => {
                let saver = self.require_saver()?;
                let tuple = saver.get_tuple(config).await?.ok_or_else(|| {
                    GraphError::Execution(format!("no checkpoint to resume for thread '{}'", thread_id))
                })?;
                let tasks = Self::decode_tasks(&tuple.checkpoint.next)?;
                let step = (tuple.metadata.step.unwrap_or(-1) + 1).max(0) as usize;
                tracing::info!(pending = tasks.len(), step, "Resuming graph execution");
                (Value::Object(tuple.checkpoint.values), tasks, step)
            }
        };

        // `step` keeps counting across resumes for checkpoint ordering; the
        // limit applies to the supersteps of this call only
        let mut supersteps = 0usize;
        loop {
            if tasks.is_empty() {
                tracing::info!(step, "Graph execution completed");
                return Ok(RunOutcome::Complete(state));
            }
            if supersteps >= self.recursion_limit {
                tracing::error!(step, supersteps, "Recursion limit reached");
                return Err(GraphError::Execution(format!(
                    "recursion limit of {} supersteps reached",
                    self.recursion_limit
                )));
            }

            tracing::debug!(
                step,
                tasks = ?tasks.iter().map(|t| t.node.as_str()).collect::<Vec<_>>(),
                "Running superstep"
            );
            let updates = self.run_superstep(&state, &tasks, &thread_id, step, &sink).await?;

            for (task, update) in tasks.iter().zip(updates.iter()) {
                self.schema.apply(&mut state, update).map_err(|e| {
                    GraphError::state_error(Some(task.node.as_str()), e.to_string())
                })?;
            }

            let next = self.schedule_next(&tasks, &state);
            let interrupted = tasks
                .iter()
                .map(|t| t.node)
                .find(|node| self.interrupt_config.should_interrupt_after(*node));

            let paused = interrupted.filter(|_| !next.is_empty());
            self.save(config, &state, &next, step as i32, CheckpointSource::Loop, paused)
                .await?;

            if let Some(node) = paused {
                tracing::info!(node = node.as_str(), step, "Execution interrupted");
                return Ok(RunOutcome::Interrupted { node, state });
            }

            tasks = next;
            step += 1;
            supersteps += 1;
        }
    }

    async fn run_superstep(
        &self,
        state: &Value,
        tasks: &[Task<N>],
        thread_id: &str,
        step: usize,
        sink: &EventSink,
    ) -> Result<Vec<Value>> {
        let runs = tasks.iter().map(|task| {
            let name = task.node.as_str();
            let node = self.nodes.get(&task.node).cloned();
            let input = task.arg.clone().unwrap_or_else(|| state.clone());
            let ctx = NodeContext::new(name, thread_id, step, sink.clone());
            let sink = sink.clone();

            async move {
                let node = node.ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
                sink.emit(ExecutionEvent::NodeStart {
                    node: name.to_string(),
                    step,
                    input: input.clone(),
                });

                match node.run(input, ctx).await {
                    Ok(update) => {
                        sink.emit(ExecutionEvent::NodeEnd {
                            node: name.to_string(),
                            step,
                            output: update.clone(),
                        });
                        Ok(update)
                    }
                    Err(e) => {
                        tracing::error!(node = name, step, error = %e, "Node execution failed");
                        sink.emit(ExecutionEvent::NodeError {
                            node: name.to_string(),
                            step,
                            error: e.to_string(),
                        });
                        Err(GraphError::node_execution(name, e.to_string()))
                    }
                }
            }
        });

        // siblings always run to completion before the first error surfaces
        join_all(runs).await.into_iter().collect()
    }

    /// Evaluate outgoing edges once per distinct node that ran.
    /// Plain targets are deduplicated so fan-in nodes run once.
    fn schedule_next(&self, tasks: &[Task<N>], state: &Value) -> Vec<Task<N>> {
        let mut sources = HashSet::new();
        let mut plain = HashSet::new();
        let mut next = Vec::new();

        for task in tasks {
            if !sources.insert(task.node) {
                continue;
            }
            for candidate in self.routes_from(task.node, state) {
                if candidate.arg.is_none() && !plain.insert(candidate.node) {
                    continue;
                }
                next.push(candidate);
            }
        }

        next
    }

    pub(crate) async fn save(
        &self,
        config: &CheckpointConfig,
        state: &Value,
        next: &[Task<N>],
        step: i32,
        source: CheckpointSource,
        interrupted_after: Option<N>,
    ) -> Result<()> {
        let Some(saver) = &self.checkpoint_saver else {
            return Ok(());
        };

        let values = state.as_object().cloned().unwrap_or_default();
        let checkpoint = Checkpoint::new(values, Self::encode_tasks(next));
        let mut metadata = CheckpointMetadata::new().with_source(source).with_step(step);
        if let Some(node) = interrupted_after {
            metadata = metadata.with_interrupted_after(node.as_str());
        }

        saver.put(config, checkpoint, metadata).await?;
        Ok(())
    }
}
