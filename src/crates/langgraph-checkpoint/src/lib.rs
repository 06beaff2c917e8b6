//! # langgraph-checkpoint - Per-thread state persistence
//!
//! Checkpoints are snapshots of a thread's graph state taken by the executor
//! after every superstep. They make two things possible:
//!
//! - **Interrupt/resume**: a run paused after a node returns control to the
//!   caller; a later call loads the snapshot and continues from the pending
//!   tasks, even after a process restart when a durable backend is used.
//! - **Failure recovery**: an engine failure leaves the last good snapshot in
//!   place so a retry resumes rather than restarts.
//!
//! ## Core types
//!
//! - [`Checkpoint`] - state values plus pending tasks
//! - [`CheckpointMetadata`] - source, step and interrupt marker
//! - [`CheckpointConfig`] - addresses a thread (and optionally a snapshot)
//! - [`CheckpointSaver`] - backend trait
//! - [`InMemoryCheckpointSaver`] - reference backend
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use langgraph_checkpoint::{
//!     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, InMemoryCheckpointSaver,
//! };
//!
//! # async fn example() -> langgraph_checkpoint::Result<()> {
//! let saver = InMemoryCheckpointSaver::new();
//! let config = CheckpointConfig::for_thread("thread-123");
//!
//! saver.put(&config, Checkpoint::empty(), CheckpointMetadata::new()).await?;
//! let latest = saver.get(&config).await?;
//! assert!(latest.is_some());
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod traits;

pub use checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointId, CheckpointMetadata, CheckpointSource,
    CheckpointTuple, PendingTask,
};
pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointSaver;
pub use traits::{require_thread_id, CheckpointSaver, CheckpointStream, RetentionPolicy};
