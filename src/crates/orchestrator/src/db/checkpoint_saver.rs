//! SQLite-backed [`CheckpointSaver`]
//!
//! Each retained snapshot is one row of `checkpoints`. The full tuple
//! (checkpoint, metadata, configs) is stored as a JSON payload; the other
//! columns only exist for lookup and ordering. `seq` orders rows per thread,
//! so the newest snapshot is the row with the highest `seq`.

use super::connection::{DatabaseConnection, DatabasePool};
use super::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use futures::stream;
use langgraph_core::checkpoint::{
    require_thread_id, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver,
    CheckpointStream, CheckpointTuple, RetentionPolicy, Result,
};
use serde::{Deserialize, Serialize};

/// Row payload
#[derive(Debug, Serialize, Deserialize)]
struct StoredCheckpoint {
    config: CheckpointConfig,
    checkpoint: Checkpoint,
    metadata: CheckpointMetadata,
    #[serde(default)]
    parent_config: Option<CheckpointConfig>,
}

impl StoredCheckpoint {
    fn decode(payload: &str) -> DbResult<Self> {
        serde_json::from_str(payload).map_err(|e| DatabaseError::CorruptRecord(e.to_string()))
    }

    fn into_tuple(self) -> CheckpointTuple {
        CheckpointTuple {
            config: self.config,
            checkpoint: self.checkpoint,
            metadata: self.metadata,
            parent_config: self.parent_config,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteCheckpointSaver {
    pool: DatabasePool,
    retention: RetentionPolicy,
}

impl SqliteCheckpointSaver {
    pub fn new(connection: &DatabaseConnection) -> Self {
        Self {
            pool: connection.pool().clone(),
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Retained snapshots of a thread
    pub async fn count(&self, thread_id: &str) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn fetch_payload(&self, config: &CheckpointConfig, thread_id: &str) -> DbResult<Option<String>> {
        let row: Option<(String,)> = match &config.checkpoint_id {
            Some(checkpoint_id) => {
                sqlx::query_as("SELECT payload FROM checkpoints WHERE thread_id = ? AND checkpoint_id = ?")
                    .bind(thread_id)
                    .bind(checkpoint_id.to_string())
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT payload FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC LIMIT 1")
                    .bind(thread_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(|(payload,)| payload))
    }

    async fn insert(
        &self,
        thread_id: &str,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        extra: &CheckpointConfig,
    ) -> DbResult<CheckpointConfig> {
        let mut tx = self.pool.begin().await?;

        let newest: Option<(i64, String)> =
            sqlx::query_as("SELECT seq, payload FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC LIMIT 1")
                .bind(thread_id)
                .fetch_optional(&mut *tx)
                .await?;

        let mut parent_config = None;
        if let Some((seq, payload)) = newest {
            let previous = StoredCheckpoint::decode(&payload)?;
            if self.retention.replaces(&previous.metadata) {
                sqlx::query("DELETE FROM checkpoints WHERE seq = ?")
                    .bind(seq)
                    .execute(&mut *tx)
                    .await?;
            }
            parent_config = Some(previous.config);
        }

        let config = CheckpointConfig {
            thread_id: Some(thread_id.to_string()),
            checkpoint_id: Some(checkpoint.id.clone()),
            extra: extra.extra.clone(),
        };
        let pinned = metadata.is_pinned();
        let step = metadata.step;
        let created_at = checkpoint.ts.to_rfc3339();
        let checkpoint_id = checkpoint.id.to_string();

        let stored = StoredCheckpoint {
            config: config.clone(),
            checkpoint,
            metadata,
            parent_config,
        };
        let payload =
            serde_json::to_string(&stored).map_err(|e| DatabaseError::CorruptRecord(e.to_string()))?;

        sqlx::query(
            "INSERT INTO checkpoints (thread_id, checkpoint_id, step, pinned, created_at, payload)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(checkpoint_id)
        .bind(step)
        .bind(pinned)
        .bind(created_at)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(config)
    }
}

#[async_trait]
impl CheckpointSaver for SqliteCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = require_thread_id(config)?;
        match self.fetch_payload(config, thread_id).await? {
            Some(payload) => Ok(Some(StoredCheckpoint::decode(&payload)?.into_tuple())),
            None => Ok(None),
        }
    }

    async fn list(&self, config: &CheckpointConfig, limit: Option<usize>) -> Result<CheckpointStream> {
        let thread_id = require_thread_id(config)?;
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT payload FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC LIMIT ?")
                .bind(thread_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        let tuples: Vec<Result<CheckpointTuple>> = rows
            .into_iter()
            .map(|(payload,)| {
                StoredCheckpoint::decode(&payload)
                    .map(StoredCheckpoint::into_tuple)
                    .map_err(Into::into)
            })
            .collect();
        Ok(Box::pin(stream::iter(tuples)))
    }

    #[tracing::instrument(skip(self, checkpoint, metadata), fields(thread_id = config.thread_id.as_deref().unwrap_or("")))]
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        let thread_id = require_thread_id(config)?;
        Ok(self.insert(thread_id, checkpoint, metadata, config).await?)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    fn retention(&self) -> RetentionPolicy {
        self.retention
    }
}
