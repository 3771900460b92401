//! Move job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres};

use codex_core::{Error, MoveJobRepository, Result};

/// PostgreSQL implementation of MoveJobRepository.
#[derive(Clone)]
pub struct PgMoveJobRepository {
    pool: Pool<Postgres>,
}

impl PgMoveJobRepository {
    /// Create a new PgMoveJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MoveJobRepository for PgMoveJobRepository {
    async fn insert_job(
        &self,
        id: &str,
        payload: JsonValue,
        enqueued_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO move_job (id, payload, enqueued_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&payload)
            .bind(enqueued_at)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Job(e.to_string()))?;
        Ok(())
    }
}
