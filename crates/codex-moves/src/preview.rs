//! Dry-run view of what a move batch would rewrite.

use std::collections::HashSet;

use tracing::debug;

use codex_core::{Error, MoveOperation, Result, StrandPreview};

use crate::processor::{strands_for_operation, MoveProcessor};
use crate::references::ReferenceRewriter;

impl MoveProcessor {
    /// List the references each affected strand would have rewritten.
    ///
    /// Reads only. Strands without any reference to a moved path are left
    /// out. Unlike [`process`](MoveProcessor::process), any storage error
    /// aborts the preview.
    pub async fn preview(
        &self,
        operations: &[MoveOperation],
        include_referencing: bool,
    ) -> Result<Vec<StrandPreview>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let operations = operations
            .iter()
            .map(|op| op.validate().map(|()| op.normalized()))
            .collect::<Result<Vec<_>>>()?;

        let store = self.connector().connect().await?;
        let rewriter = ReferenceRewriter::new(&operations);

        let mut seen = HashSet::new();
        let mut previews = Vec::new();
        for op in &operations {
            for strand in strands_for_operation(store.as_ref(), op, include_referencing).await? {
                if !seen.insert(strand.id) {
                    continue;
                }
                let current = store
                    .fetch_content(strand.id)
                    .await?
                    .ok_or(Error::StrandNotFound(strand.id))?;
                let matches = rewriter.detect(&current.content);
                if !matches.is_empty() {
                    previews.push(StrandPreview {
                        strand_id: current.id,
                        path: current.path,
                        matches,
                    });
                }
            }
        }

        debug!(
            subsystem = "moves",
            component = "preview",
            operation_count = operations.len(),
            strand_count = previews.len(),
            "Move preview computed"
        );
        Ok(previews)
    }
}
