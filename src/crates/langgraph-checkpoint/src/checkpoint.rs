//! Checkpoint data structures
//!
//! A [`Checkpoint`] is one snapshot of a thread's graph state: the merged state
//! values plus the tasks that were scheduled but not yet executed when the
//! snapshot was taken. The executor resumes a thread by loading its latest
//! checkpoint and running the pending tasks.
//!
//! ```text
//!  thread "t-1"
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//!  │ step -1      │   │ step 0       │   │ step 1 (pinned)      │
//!  │ source=input │──→│ source=loop  │──→│ interrupted_after=   │
//!  │ next=[a]     │   │ next=[b]     │   │   "planner"          │
//!  └──────────────┘   └──────────────┘   └──────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Checkpoint identifier
pub type CheckpointId = String;

/// Where a checkpoint came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Created from the input of a new run
    Input,
    /// Created by the executor after a superstep
    Loop,
    /// Created by an external state update (resume hint)
    Update,
}

/// Metadata associated with a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointMetadata {
    /// The source of the checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CheckpointSource>,

    /// Superstep number. -1 for the input checkpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i32>,

    /// Node after which the executor paused, if this snapshot is an interrupt point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted_after: Option<String>,

    /// Additional custom metadata
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CheckpointMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: CheckpointSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_step(mut self, step: i32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_interrupted_after(mut self, node: impl Into<String>) -> Self {
        self.interrupted_after = Some(node.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Pinned checkpoints survive retention: interrupt points and external updates.
    pub fn is_pinned(&self) -> bool {
        self.interrupted_after.is_some() || self.source == Some(CheckpointSource::Update)
    }
}

/// A task scheduled for the next superstep.
///
/// `arg` is set for fan-out tasks that run against their own derived input
/// instead of the shared state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingTask {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<Value>,
}

impl PendingTask {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            arg: None,
        }
    }

    pub fn with_arg(node: impl Into<String>, arg: Value) -> Self {
        Self {
            node: node.into(),
            arg: Some(arg),
        }
    }
}

/// State snapshot at a given point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Format version
    pub v: i32,

    /// Unique checkpoint ID
    pub id: CheckpointId,

    pub ts: DateTime<Utc>,

    /// Merged state values
    pub values: Map<String, Value>,

    /// Tasks still to run. Empty once the run reached its end.
    #[serde(default)]
    pub next: Vec<PendingTask>,
}

impl Checkpoint {
    /// Current checkpoint format version
    pub const CURRENT_VERSION: i32 = 1;

    pub fn new(values: Map<String, Value>, next: Vec<PendingTask>) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id: Uuid::new_v4().to_string(),
            ts: Utc::now(),
            values,
            next,
        }
    }

    pub fn empty() -> Self {
        Self::new(Map::new(), Vec::new())
    }

    /// True when the run that produced this snapshot has nothing left to execute
    pub fn is_finished(&self) -> bool {
        self.next.is_empty()
    }
}

/// Configuration for checkpoint operations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointConfig {
    /// Thread ID grouping related checkpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Specific checkpoint to retrieve; latest when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CheckpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a config addressing the latest checkpoint of a thread
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self::new().with_thread_id(thread_id)
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }
}

/// A checkpoint with its config and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTuple {
    pub config: CheckpointConfig,
    pub checkpoint: Checkpoint,
    pub metadata: CheckpointMetadata,
    pub parent_config: Option<CheckpointConfig>,
}

impl CheckpointTuple {
    pub fn new(
        config: CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            config,
            checkpoint,
            metadata,
            parent_config: None,
        }
    }

    pub fn with_parent_config(mut self, parent_config: CheckpointConfig) -> Self {
        self.parent_config = Some(parent_config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_creation() {
        let checkpoint = Checkpoint::empty();
        assert_eq!(checkpoint.v, Checkpoint::CURRENT_VERSION);
        assert!(checkpoint.values.is_empty());
        assert!(checkpoint.is_finished());
    }

    #[test]
    fn test_metadata_pinning() {
        assert!(!CheckpointMetadata::new()
            .with_source(CheckpointSource::Loop)
            .is_pinned());
        assert!(CheckpointMetadata::new()
            .with_source(CheckpointSource::Loop)
            .with_interrupted_after("planner")
            .is_pinned());
        assert!(CheckpointMetadata::new()
            .with_source(CheckpointSource::Update)
            .is_pinned());
    }

    #[test]
    fn test_checkpoint_serde() {
        let mut values = Map::new();
        values.insert("topic".to_string(), json!("rust"));
        let checkpoint = Checkpoint::new(
            values,
            vec![
                PendingTask::new("executor"),
                PendingTask::with_arg("worker", json!({"task": "x"})),
            ],
        );

        let raw = serde_json::to_string(&checkpoint).unwrap();
        let back: Checkpoint = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, checkpoint);
        assert!(!back.is_finished());
    }

    #[test]
    fn test_checkpoint_config() {
        let config = CheckpointConfig::for_thread("thread-1").with_checkpoint_id("checkpoint-1");

        assert_eq!(config.thread_id.as_deref(), Some("thread-1"));
        assert_eq!(config.checkpoint_id.as_deref(), Some("checkpoint-1"));
    }
}
