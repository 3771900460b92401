//! Strand repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use codex_core::{Error, Result, Strand, StrandContent, StrandRepository};

use crate::escape_like;

const STRAND_COLUMNS: &str = "id, path, content, last_indexed_at, updated_at";

/// PostgreSQL implementation of StrandRepository.
#[derive(Clone)]
pub struct PgStrandRepository {
    pool: Pool<Postgres>,
}

impl PgStrandRepository {
    /// Create a new PgStrandRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_strand_row(row: sqlx::postgres::PgRow) -> Strand {
        Strand {
            id: row.get("id"),
            path: row.get("path"),
            content: row.get("content"),
            last_indexed_at: row.get("last_indexed_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl StrandRepository for PgStrandRepository {
    async fn find_by_exact_path(&self, path: &str) -> Result<Option<Strand>> {
        let sql = format!("SELECT {STRAND_COLUMNS} FROM strand WHERE path = $1");
        let row = sqlx::query(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_strand_row))
    }

    async fn find_by_path_prefix(&self, prefix: &str) -> Result<Vec<Strand>> {
        let sql = format!(
            "SELECT {STRAND_COLUMNS} FROM strand
             WHERE path = $1 OR path LIKE $2 || '/%' ESCAPE '\\'
             ORDER BY path"
        );
        let rows = sqlx::query(&sql)
            .bind(prefix)
            .bind(escape_like(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_strand_row).collect())
    }

    async fn find_referencing(&self, path: &str) -> Result<Vec<Strand>> {
        // strpos keeps the match literal, no LIKE escaping involved
        let sql = format!(
            "SELECT {STRAND_COLUMNS} FROM strand
             WHERE strpos(content, $1) > 0
             ORDER BY path"
        );
        let rows = sqlx::query(&sql)
            .bind(path)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_strand_row).collect())
    }

    async fn fetch_content(&self, id: Uuid) -> Result<Option<StrandContent>> {
        let row = sqlx::query("SELECT id, path, content FROM strand WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|row| StrandContent {
            id: row.get("id"),
            path: row.get("path"),
            content: row.get("content"),
        }))
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE strand SET content = $1, updated_at = $2 WHERE id = $3")
            .bind(content)
            .bind(modified_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn clear_indexed_at(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE strand SET last_indexed_at = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
