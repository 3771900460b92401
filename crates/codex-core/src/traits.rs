//! Core traits for Quarry Codex storage abstractions.
//!
//! The move pipeline depends only on these traits, so a PostgreSQL adapter
//! and an in-memory fake can be swapped freely.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Strand, StrandContent};

// =============================================================================
// STRAND REPOSITORY
// =============================================================================

/// Repository for reading and rewriting strands.
#[async_trait]
pub trait StrandRepository: Send + Sync {
    /// Find the strand stored at exactly `path`.
    async fn find_by_exact_path(&self, path: &str) -> Result<Option<Strand>>;

    /// Find every strand at `prefix` or nested under `prefix/`.
    async fn find_by_path_prefix(&self, prefix: &str) -> Result<Vec<Strand>>;

    /// Find every strand whose content contains `path` as a literal substring.
    async fn find_referencing(&self, path: &str) -> Result<Vec<Strand>>;

    /// Fetch the current id, path, and content of a strand.
    async fn fetch_content(&self, id: Uuid) -> Result<Option<StrandContent>>;

    /// Replace a strand's content and modification timestamp.
    ///
    /// Returns the number of rows written.
    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Clear `last_indexed_at` so the strands get re-embedded.
    async fn clear_indexed_at(&self, ids: &[Uuid]) -> Result<()>;
}

// =============================================================================
// BLOCK REPOSITORY
// =============================================================================

/// Repository for the block index and its denormalized owner path.
#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Set `owner_path = new_path` wherever `owner_path = old_path`.
    async fn update_owner_path(&self, new_path: &str, old_path: &str) -> Result<u64>;

    /// Replace the leading `old_prefix` of every owner path at or under it.
    async fn update_owner_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<u64>;
}

// =============================================================================
// MOVE JOB REPOSITORY
// =============================================================================

/// Durable queue of move batches.
#[async_trait]
pub trait MoveJobRepository: Send + Sync {
    /// Persist a queued move job.
    async fn insert_job(
        &self,
        id: &str,
        payload: JsonValue,
        enqueued_at: DateTime<Utc>,
    ) -> Result<()>;
}

// =============================================================================
// STORAGE COLLABORATOR
// =============================================================================

/// Everything the move pipeline needs from storage.
pub trait MoveStore: StrandRepository + BlockRepository + MoveJobRepository {}

impl<T> MoveStore for T where T: StrandRepository + BlockRepository + MoveJobRepository {}

/// Acquires a storage handle for one batch.
///
/// An `Err` from [`connect`](MoveStoreConnector::connect) means storage is
/// unreachable and no work may be attempted.
#[async_trait]
pub trait MoveStoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MoveStore>>;
}
