//! Block index repository implementation.
//!
//! Each block row duplicates its owning strand's path in `strand_path`.
//! Moves keep that column in step with `strand.path`.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use codex_core::{BlockRepository, Error, Result};

use crate::escape_like;

/// PostgreSQL implementation of BlockRepository.
#[derive(Clone)]
pub struct PgBlockRepository {
    pool: Pool<Postgres>,
}

impl PgBlockRepository {
    /// Create a new PgBlockRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockRepository for PgBlockRepository {
    async fn update_owner_path(&self, new_path: &str, old_path: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE strand_block SET strand_path = $1 WHERE strand_path = $2")
            .bind(new_path)
            .bind(old_path)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "blocks",
            op = "update_owner_path",
            db_table = "strand_block",
            block_count = result.rows_affected(),
            "Rewrote block owner paths"
        );
        Ok(result.rows_affected())
    }

    async fn update_owner_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE strand_block
             SET strand_path = $2 || substr(strand_path, char_length($1) + 1)
             WHERE strand_path = $1 OR strand_path LIKE $3 || '/%' ESCAPE '\\'",
        )
        .bind(old_prefix)
        .bind(new_prefix)
        .bind(escape_like(old_prefix))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "blocks",
            op = "update_owner_path_prefix",
            db_table = "strand_block",
            block_count = result.rows_affected(),
            "Rewrote block owner path prefixes"
        );
        Ok(result.rows_affected())
    }
}
