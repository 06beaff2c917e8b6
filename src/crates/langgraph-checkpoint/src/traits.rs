//! Checkpoint persistence trait
//!
//! [`CheckpointSaver`] is the seam between the graph executor and a storage
//! backend. The executor only ever needs three things from a backend:
//!
//! - read the latest (or a specific) checkpoint of a thread,
//! - write a new checkpoint for a thread,
//! - list a thread's retained history.
//!
//! # Retention
//!
//! Backends apply a [`RetentionPolicy`] on every `put`. With the default
//! [`RetentionPolicy::LatestAndPinned`] the newest snapshot of a thread is
//! overwritten on each step, while pinned snapshots (interrupt points and
//! external updates, see [`CheckpointMetadata::is_pinned`]) are kept. A thread
//! paused for human review therefore always has a durable record of the exact
//! state it paused in.
//!
//! # Implementing a backend
//!
//! ```rust,ignore
//! #[async_trait]
//! impl CheckpointSaver for MyStore {
//!     async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
//!         // latest row for config.thread_id, or the row for config.checkpoint_id
//!     }
//!     async fn list(&self, config: &CheckpointConfig, limit: Option<usize>) -> Result<CheckpointStream> {
//!         // newest first
//!     }
//!     async fn put(&self, config: &CheckpointConfig, checkpoint: Checkpoint, metadata: CheckpointMetadata)
//!         -> Result<CheckpointConfig> {
//!         // honour self.retention()
//!     }
//!     async fn delete_thread(&self, thread_id: &str) -> Result<()> { ... }
//! }
//! ```

use crate::checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple};
use crate::error::{CheckpointError, Result};
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of checkpoint tuples, newest first
pub type CheckpointStream = Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send>>;

/// How many snapshots a backend keeps per thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep the newest snapshot plus every pinned snapshot
    #[default]
    LatestAndPinned,
    /// Keep every snapshot
    KeepAll,
}

impl RetentionPolicy {
    /// Whether the current newest snapshot should be replaced by the next write
    pub fn replaces(&self, newest: &CheckpointMetadata) -> bool {
        match self {
            RetentionPolicy::LatestAndPinned => !newest.is_pinned(),
            RetentionPolicy::KeepAll => false,
        }
    }
}

/// Extract the required thread id from a config
pub fn require_thread_id(config: &CheckpointConfig) -> Result<&str> {
    config
        .thread_id
        .as_deref()
        .ok_or(CheckpointError::MissingThreadId)
}

/// Storage backend for per-thread checkpoints.
///
/// Implementations must be safe to share across tasks; the executor holds them
/// as `Arc<dyn CheckpointSaver>`.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch a checkpoint using the given configuration
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// Retrieve a checkpoint with metadata.
    ///
    /// Returns the checkpoint named by `config.checkpoint_id`, or the latest
    /// one for `config.thread_id` when no id is given. A missing checkpoint is
    /// `Ok(None)`, not an error.
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// Retained checkpoints of a thread, newest first
    async fn list(&self, config: &CheckpointConfig, limit: Option<usize>)
        -> Result<CheckpointStream>;

    /// Store a checkpoint and return the config addressing it
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig>;

    /// Remove every checkpoint of a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Retention applied by `put`
    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::LatestAndPinned
    }
}
