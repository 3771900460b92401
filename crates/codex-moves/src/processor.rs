//! Move reference processor.
//!
//! Given a batch of move operations this collects the strands living under
//! the moved paths, rewrites path references in their content, repoints the
//! block index at the new owner paths, and optionally flags the strands for
//! re-embedding.
//!
//! Storage being unreachable is the only batch-level failure. Everything
//! else is recorded per strand or per operation in
//! [`ProcessingResult::errors`] and the batch carries on.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use codex_core::defaults::DB_UNAVAILABLE_MESSAGE;
use codex_core::{
    Error, MoveKind, MoveOperation, MoveStore, MoveStoreConnector, ProcessingResult,
    ProgressStage, Result, Strand,
};

use crate::config::MoveConfig;
use crate::references::ReferenceRewriter;

/// Progress callback: `(stage, current, total)`.
pub type ProgressCallback = Box<dyn Fn(ProgressStage, usize, usize) + Send + Sync>;

/// Options for one processing call.
pub struct MoveProcessingOptions {
    pub operations: Vec<MoveOperation>,
    /// Clear `last_indexed_at` on every affected strand.
    pub update_embeddings: bool,
    /// Also rewrite strands whose content links into a moved path.
    pub rewrite_referencing: bool,
    progress_callback: Option<ProgressCallback>,
}

impl MoveProcessingOptions {
    pub fn new(operations: Vec<MoveOperation>) -> Self {
        Self {
            operations,
            update_embeddings: false,
            rewrite_referencing: false,
            progress_callback: None,
        }
    }

    /// Seed the flags from configuration.
    pub fn with_config(mut self, config: &MoveConfig) -> Self {
        self.update_embeddings = config.update_embeddings;
        self.rewrite_referencing = config.rewrite_referencing;
        self
    }

    pub fn with_update_embeddings(mut self, enabled: bool) -> Self {
        self.update_embeddings = enabled;
        self
    }

    pub fn with_rewrite_referencing(mut self, enabled: bool) -> Self {
        self.rewrite_referencing = enabled;
        self
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressStage, usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, stage: ProgressStage, current: usize, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback(stage, current, total);
        }
    }
}

impl std::fmt::Debug for MoveProcessingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveProcessingOptions")
            .field("operations", &self.operations.len())
            .field("update_embeddings", &self.update_embeddings)
            .field("rewrite_referencing", &self.rewrite_referencing)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

/// Applies move batches against a storage collaborator.
#[derive(Clone)]
pub struct MoveProcessor {
    connector: Arc<dyn MoveStoreConnector>,
}

impl MoveProcessor {
    pub fn new(connector: Arc<dyn MoveStoreConnector>) -> Self {
        Self { connector }
    }

    pub(crate) fn connector(&self) -> &Arc<dyn MoveStoreConnector> {
        &self.connector
    }

    /// Process a move batch. Never fails; see [`ProcessingResult`].
    #[instrument(skip(self, options), fields(operation_count = options.operations.len()))]
    pub async fn process(&self, options: MoveProcessingOptions) -> ProcessingResult {
        if options.operations.is_empty() {
            return ProcessingResult::empty();
        }

        let start = Instant::now();
        let mut errors = Vec::new();
        let operations = validate_operations(&options.operations, &mut errors);
        if operations.is_empty() {
            debug!(
                subsystem = "moves",
                component = "processor",
                error_count = errors.len(),
                "No valid operations in batch"
            );
            return ProcessingResult {
                success: false,
                errors,
                duration_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            };
        }

        let store = match self.connector.connect().await {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    subsystem = "moves",
                    component = "processor",
                    op = "connect",
                    error = %e,
                    "Move store unavailable, batch aborted"
                );
                return ProcessingResult::failed(
                    DB_UNAVAILABLE_MESSAGE,
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        let affected = collect_affected(store.as_ref(), &operations, &options, &mut errors).await;
        rewrite_affected(store.as_ref(), &affected, &operations, &options, &mut errors).await;
        let blocks_updated =
            repoint_blocks(store.as_ref(), &operations, &options, &mut errors).await;

        if options.update_embeddings && !affected.is_empty() {
            if let Err(e) = store.clear_indexed_at(&affected).await {
                errors.push(format!("Failed to flag strands for re-embedding: {e}"));
            } else {
                debug!(
                    subsystem = "moves",
                    component = "processor",
                    strand_count = affected.len(),
                    "Flagged affected strands for re-embedding"
                );
            }
        }

        let result = ProcessingResult {
            success: errors.is_empty(),
            strands_processed: affected.len(),
            blocks_updated,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            subsystem = "moves",
            component = "processor",
            op = "process",
            operation_count = operations.len(),
            strand_count = result.strands_processed,
            block_count = result.blocks_updated,
            error_count = result.errors.len(),
            success = result.success,
            duration_ms = result.duration_ms,
            "Move batch processed"
        );
        result
    }
}

/// Normalize valid operations; record the invalid ones as errors.
fn validate_operations(
    operations: &[MoveOperation],
    errors: &mut Vec<String>,
) -> Vec<MoveOperation> {
    operations
        .iter()
        .filter_map(|op| match op.validate() {
            Ok(()) => Some(op.normalized()),
            Err(e) => {
                errors.push(format!("Invalid move operation {}: {e}", op.source_path));
                None
            }
        })
        .collect()
}

/// Strands directly touched by one operation.
pub(crate) async fn strands_for_operation(
    store: &dyn MoveStore,
    op: &MoveOperation,
    include_referencing: bool,
) -> Result<Vec<Strand>> {
    let mut strands = match op.kind {
        MoveKind::File => store
            .find_by_exact_path(&op.source_path)
            .await?
            .into_iter()
            .collect(),
        MoveKind::Directory => store.find_by_path_prefix(&op.source_path).await?,
    };
    if include_referencing {
        strands.extend(store.find_referencing(&op.source_path).await?);
    }
    Ok(strands)
}

/// Union of affected strand ids in discovery order.
async fn collect_affected(
    store: &dyn MoveStore,
    operations: &[MoveOperation],
    options: &MoveProcessingOptions,
    errors: &mut Vec<String>,
) -> Vec<Uuid> {
    let stage = ProgressStage::CollectingAffectedStrands;
    let total = operations.len();
    options.report_progress(stage, 0, total);

    let mut seen = HashSet::new();
    let mut affected = Vec::new();
    for (i, op) in operations.iter().enumerate() {
        match strands_for_operation(store, op, options.rewrite_referencing).await {
            Ok(strands) => {
                if strands.is_empty() {
                    debug!(
                        subsystem = "moves",
                        component = "processor",
                        source_path = %op.source_path,
                        "No strands under moved path"
                    );
                }
                for strand in strands {
                    if seen.insert(strand.id) {
                        affected.push(strand.id);
                    }
                }
            }
            Err(e) => errors.push(format!(
                "Failed to collect strands for {}: {e}",
                op.source_path
            )),
        }
        options.report_progress(stage, i + 1, total);
    }
    affected
}

async fn rewrite_affected(
    store: &dyn MoveStore,
    affected: &[Uuid],
    operations: &[MoveOperation],
    options: &MoveProcessingOptions,
    errors: &mut Vec<String>,
) {
    let stage = ProgressStage::UpdatingPathReferences;
    let total = affected.len();
    options.report_progress(stage, 0, total);

    let rewriter = ReferenceRewriter::new(operations);
    for (i, &id) in affected.iter().enumerate() {
        if let Err(e) = rewrite_strand(store, id, &rewriter).await {
            warn!(
                subsystem = "moves",
                component = "processor",
                strand_id = %id,
                error = %e,
                "Failed to rewrite strand references"
            );
            errors.push(format!("Failed to update strand {id}: {e}"));
        }
        options.report_progress(stage, i + 1, total);
    }
}

/// Rewrite one strand from fresh content; returns references replaced.
async fn rewrite_strand(
    store: &dyn MoveStore,
    id: Uuid,
    rewriter: &ReferenceRewriter,
) -> Result<usize> {
    let strand = store
        .fetch_content(id)
        .await?
        .ok_or(Error::StrandNotFound(id))?;

    let Some(rewritten) = rewriter.rewrite(&strand.content) else {
        trace!(
            subsystem = "moves",
            component = "processor",
            strand_id = %id,
            path = %strand.path,
            "No references to rewrite"
        );
        return Ok(0);
    };

    let rows = store
        .update_content(id, &rewritten.content, Utc::now())
        .await?;
    if rows == 0 {
        return Err(Error::StrandNotFound(id));
    }

    trace!(
        subsystem = "moves",
        component = "processor",
        strand_id = %id,
        path = %strand.path,
        reference_count = rewritten.occurrence_count(),
        "Rewrote strand references"
    );
    Ok(rewritten.occurrence_count())
}

async fn repoint_blocks(
    store: &dyn MoveStore,
    operations: &[MoveOperation],
    options: &MoveProcessingOptions,
    errors: &mut Vec<String>,
) -> u64 {
    let stage = ProgressStage::UpdatingBlockRecords;
    let total = operations.len();
    options.report_progress(stage, 0, total);

    let mut blocks_updated = 0;
    for (i, op) in operations.iter().enumerate() {
        let updated = match op.kind {
            MoveKind::File => store.update_owner_path(&op.dest_path, &op.source_path).await,
            MoveKind::Directory => {
                store
                    .update_owner_path_prefix(&op.source_path, &op.dest_path)
                    .await
            }
        };
        match updated {
            Ok(n) => blocks_updated += n,
            Err(e) => errors.push(format!(
                "Failed to update blocks for {}: {e}",
                op.source_path
            )),
        }
        options.report_progress(stage, i + 1, total);
    }
    blocks_updated
}
