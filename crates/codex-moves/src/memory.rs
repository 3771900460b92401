//! In-memory move store for deterministic testing.
//!
//! Implements every storage trait over plain collections, records each call
//! in order, and can be told to fail specific calls.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use codex_moves::memory::InMemoryMoveStore;
//! use codex_moves::{MoveOperation, MoveProcessingOptions, MoveProcessor};
//!
//! # tokio_test_block(async {
//! let store = InMemoryMoveStore::new();
//! store.insert_strand("old/a.md", "see [[old/a.md]]");
//!
//! let processor = MoveProcessor::new(Arc::new(store.clone()));
//! let ops = vec![MoveOperation::file("old/a.md", "new/a.md")];
//! let result = processor.process(MoveProcessingOptions::new(ops)).await;
//! assert!(result.success);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use codex_core::{
    BlockRepository, Error, MoveJobRepository, MoveStore, MoveStoreConnector, Result, Strand,
    StrandContent, StrandRepository,
};

/// One recorded storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Connect,
    FindByExactPath(String),
    FindByPathPrefix(String),
    FindReferencing(String),
    FetchContent(Uuid),
    UpdateContent { id: Uuid, content: String },
    ClearIndexedAt(Vec<Uuid>),
    UpdateOwnerPath { new_path: String, old_path: String },
    UpdateOwnerPathPrefix { old_prefix: String, new_prefix: String },
    InsertJob(String),
}

/// A block row: only the denormalized owner path matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: Uuid,
    pub strand_id: Uuid,
    pub owner_path: String,
}

/// A job row written by the queue gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: String,
    pub payload: JsonValue,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    strands: Vec<Strand>,
    blocks: Vec<BlockRecord>,
    jobs: Vec<QueuedJob>,
    calls: Vec<StoreCall>,
    unavailable: bool,
    fail_job_insert: bool,
    fail_fetch: HashSet<Uuid>,
}

/// Shared in-memory store; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMoveStore {
    state: Arc<Mutex<State>>,
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl InMemoryMoveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: StoreCall) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    /// Add a strand indexed now; returns its id.
    pub fn insert_strand(&self, path: &str, content: &str) -> Uuid {
        let id = Uuid::now_v7();
        let now = Utc::now();
        self.state().strands.push(Strand {
            id,
            path: path.to_string(),
            content: content.to_string(),
            last_indexed_at: Some(now),
            updated_at: now,
        });
        id
    }

    /// Add a block owned by `strand_id` carrying the strand's current path.
    pub fn insert_block(&self, strand_id: Uuid) -> Uuid {
        let id = Uuid::now_v7();
        let mut state = self.state();
        let owner_path = state
            .strands
            .iter()
            .find(|s| s.id == strand_id)
            .map(|s| s.path.clone())
            .unwrap_or_default();
        state.blocks.push(BlockRecord {
            id,
            strand_id,
            owner_path,
        });
        id
    }

    /// Make `connect` fail until set back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Make `insert_job` fail, as if the job table were missing.
    pub fn fail_job_insert(&self, fail: bool) {
        self.state().fail_job_insert = fail;
    }

    /// Make `fetch_content` fail for one strand.
    pub fn fail_fetch_for(&self, id: Uuid) {
        self.state().fail_fetch.insert(id);
    }

    /// Move a strand's `path` the way the editor would.
    pub fn set_path(&self, id: Uuid, path: &str) {
        if let Some(strand) = self.state().strands.iter_mut().find(|s| s.id == id) {
            strand.path = path.to_string();
        }
    }

    pub fn strand(&self, id: Uuid) -> Option<Strand> {
        self.state().strands.iter().find(|s| s.id == id).cloned()
    }

    pub fn blocks(&self) -> Vec<BlockRecord> {
        self.state().blocks.clone()
    }

    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.state().jobs.clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Content updates recorded so far.
    pub fn content_updates(&self) -> Vec<(Uuid, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::UpdateContent { id, content } => Some((id, content)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl StrandRepository for InMemoryMoveStore {
    async fn find_by_exact_path(&self, path: &str) -> Result<Option<Strand>> {
        let state = self.record(StoreCall::FindByExactPath(path.to_string()));
        Ok(state.strands.iter().find(|s| s.path == path).cloned())
    }

    async fn find_by_path_prefix(&self, prefix: &str) -> Result<Vec<Strand>> {
        let state = self.record(StoreCall::FindByPathPrefix(prefix.to_string()));
        let mut found: Vec<Strand> = state
            .strands
            .iter()
            .filter(|s| under_prefix(&s.path, prefix))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn find_referencing(&self, path: &str) -> Result<Vec<Strand>> {
        let state = self.record(StoreCall::FindReferencing(path.to_string()));
        let mut found: Vec<Strand> = state
            .strands
            .iter()
            .filter(|s| s.content.contains(path))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    async fn fetch_content(&self, id: Uuid) -> Result<Option<StrandContent>> {
        let state = self.record(StoreCall::FetchContent(id));
        if state.fail_fetch.contains(&id) {
            return Err(Error::Internal(format!("fetch failed for {id}")));
        }
        Ok(state
            .strands
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .map(StrandContent::from))
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.record(StoreCall::UpdateContent {
            id,
            content: content.to_string(),
        });
        match state.strands.iter_mut().find(|s| s.id == id) {
            Some(strand) => {
                strand.content = content.to_string();
                strand.updated_at = modified_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear_indexed_at(&self, ids: &[Uuid]) -> Result<()> {
        let mut state = self.record(StoreCall::ClearIndexedAt(ids.to_vec()));
        for strand in state.strands.iter_mut().filter(|s| ids.contains(&s.id)) {
            strand.last_indexed_at = None;
        }
        Ok(())
    }
}

#[async_trait]
impl BlockRepository for InMemoryMoveStore {
    async fn update_owner_path(&self, new_path: &str, old_path: &str) -> Result<u64> {
        let mut state = self.record(StoreCall::UpdateOwnerPath {
            new_path: new_path.to_string(),
            old_path: old_path.to_string(),
        });
        let mut updated = 0;
        for block in state.blocks.iter_mut().filter(|b| b.owner_path == old_path) {
            block.owner_path = new_path.to_string();
            updated += 1;
        }
        Ok(updated)
    }

    async fn update_owner_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<u64> {
        let mut state = self.record(StoreCall::UpdateOwnerPathPrefix {
            old_prefix: old_prefix.to_string(),
            new_prefix: new_prefix.to_string(),
        });
        let mut updated = 0;
        for block in state
            .blocks
            .iter_mut()
            .filter(|b| under_prefix(&b.owner_path, old_prefix))
        {
            block.owner_path = format!("{new_prefix}{}", &block.owner_path[old_prefix.len()..]);
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl MoveJobRepository for InMemoryMoveStore {
    async fn insert_job(
        &self,
        id: &str,
        payload: JsonValue,
        enqueued_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.record(StoreCall::InsertJob(id.to_string()));
        if state.fail_job_insert {
            return Err(Error::Job("relation \"move_job\" does not exist".to_string()));
        }
        state.jobs.push(QueuedJob {
            id: id.to_string(),
            payload,
            enqueued_at,
        });
        Ok(())
    }
}

#[async_trait]
impl MoveStoreConnector for InMemoryMoveStore {
    async fn connect(&self) -> Result<Arc<dyn MoveStore>> {
        let state = self.record(StoreCall::Connect);
        if state.unavailable {
            return Err(Error::Unavailable("in-memory store offline".to_string()));
        }
        drop(state);
        Ok(Arc::new(self.clone()))
    }
}
