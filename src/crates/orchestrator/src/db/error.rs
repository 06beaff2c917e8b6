//! Database error types

use langgraph_core::checkpoint::CheckpointError;
use thiserror::Error;

pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Query error: {0}")]
    QueryError(String),

    /// Stored payload could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

impl From<DatabaseError> for CheckpointError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::CorruptRecord(msg) => CheckpointError::Invalid(msg),
            other => CheckpointError::Storage(other.to_string()),
        }
    }
}
