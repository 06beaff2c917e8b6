//! SQLite persistence
//!
//! Only graph checkpoints are stored: one table, written through
//! [`SqliteCheckpointSaver`], so paused threads survive a restart.

pub mod checkpoint_saver;
pub mod connection;
pub mod error;

pub use checkpoint_saver::SqliteCheckpointSaver;
pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
