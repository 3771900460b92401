//! # codex-db
//!
//! PostgreSQL database layer for Quarry Codex.
//!
//! This crate provides:
//! - Connection pool management
//! - Strand, block index, and move job repositories
//! - A [`MoveStoreConnector`] that checks reachability before each batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use codex_db::{Database, PgMoveStoreConnector};
//!
//! let db = Database::connect("postgres://localhost/codex").await?;
//! let connector = PgMoveStoreConnector::new(db);
//! let store = connector.connect().await?;
//! ```

pub mod blocks;
pub mod jobs;
pub mod pool;
pub mod strands;
pub mod test_fixtures;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

// Re-export core types
pub use codex_core::*;

pub use blocks::PgBlockRepository;
pub use jobs::PgMoveJobRepository;
pub use pool::{
    create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig,
};
pub use strands::PgStrandRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Strand repository.
    pub strands: PgStrandRepository,
    /// Block index repository.
    pub blocks: PgBlockRepository,
    /// Move job queue repository.
    pub jobs: PgMoveJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            strands: PgStrandRepository::new(pool.clone()),
            blocks: PgBlockRepository::new(pool.clone()),
            jobs: PgMoveJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Create without opening a connection; the first query connects.
    pub fn connect_lazy(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_lazy_pool(url, config)?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query to confirm the database answers.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StrandRepository for Database {
    async fn find_by_exact_path(&self, path: &str) -> Result<Option<Strand>> {
        self.strands.find_by_exact_path(path).await
    }

    async fn find_by_path_prefix(&self, prefix: &str) -> Result<Vec<Strand>> {
        self.strands.find_by_path_prefix(prefix).await
    }

    async fn find_referencing(&self, path: &str) -> Result<Vec<Strand>> {
        self.strands.find_referencing(path).await
    }

    async fn fetch_content(&self, id: Uuid) -> Result<Option<StrandContent>> {
        self.strands.fetch_content(id).await
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<u64> {
        self.strands.update_content(id, content, modified_at).await
    }

    async fn clear_indexed_at(&self, ids: &[Uuid]) -> Result<()> {
        self.strands.clear_indexed_at(ids).await
    }
}

#[async_trait]
impl BlockRepository for Database {
    async fn update_owner_path(&self, new_path: &str, old_path: &str) -> Result<u64> {
        self.blocks.update_owner_path(new_path, old_path).await
    }

    async fn update_owner_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<u64> {
        self.blocks
            .update_owner_path_prefix(old_prefix, new_prefix)
            .await
    }
}

#[async_trait]
impl MoveJobRepository for Database {
    async fn insert_job(
        &self,
        id: &str,
        payload: JsonValue,
        enqueued_at: DateTime<Utc>,
    ) -> Result<()> {
        self.jobs.insert_job(id, payload, enqueued_at).await
    }
}

/// Hands out the shared [`Database`] once it answers a ping.
#[derive(Clone)]
pub struct PgMoveStoreConnector {
    db: Arc<Database>,
}

impl PgMoveStoreConnector {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Underlying database context.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl MoveStoreConnector for PgMoveStoreConnector {
    async fn connect(&self) -> Result<Arc<dyn MoveStore>> {
        if let Err(e) = self.db.ping().await {
            warn!(
                subsystem = "db",
                component = "connector",
                op = "connect",
                error = %e,
                "Move store unreachable"
            );
            return Err(e);
        }
        log_pool_metrics(&self.db.pool);
        debug!(subsystem = "db", component = "connector", op = "connect", "Move store acquired");
        Ok(self.db.clone())
    }
}
