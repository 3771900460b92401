//! Core data models for Quarry Codex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// MOVE OPERATIONS
// =============================================================================

/// Whether a move relocates a single file or a whole directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    File,
    Directory,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::File => "file",
            MoveKind::Directory => "directory",
        }
    }
}

impl std::fmt::Display for MoveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file or directory relocation.
///
/// Paths are slash-delimited logical paths and are matched as opaque
/// literal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    pub kind: MoveKind,
    pub source_path: String,
    pub dest_path: String,
    /// Human-readable label, never used for matching.
    #[serde(default)]
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

impl MoveOperation {
    /// Create a file move occurring now.
    pub fn file(source_path: impl Into<String>, dest_path: impl Into<String>) -> Self {
        Self::new(MoveKind::File, source_path, dest_path)
    }

    /// Create a directory move occurring now.
    pub fn directory(source_path: impl Into<String>, dest_path: impl Into<String>) -> Self {
        Self::new(MoveKind::Directory, source_path, dest_path)
    }

    fn new(kind: MoveKind, source_path: impl Into<String>, dest_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let display_name = source_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            source_path,
            dest_path: dest_path.into(),
            display_name,
            occurred_at: Utc::now(),
        }
    }

    /// Set the display label.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Check the operation is usable: both paths present and distinct.
    pub fn validate(&self) -> Result<()> {
        let normalized = self.normalized();
        if normalized.source_path.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} move has an empty source path",
                self.kind
            )));
        }
        if normalized.dest_path.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} move of {} has an empty destination path",
                self.kind, self.source_path
            )));
        }
        if normalized.source_path == normalized.dest_path {
            return Err(Error::InvalidInput(format!(
                "{} move of {} has identical source and destination",
                self.kind, self.source_path
            )));
        }
        Ok(())
    }

    /// Copy with trailing slashes stripped from directory paths.
    ///
    /// File paths are returned untouched.
    pub fn normalized(&self) -> Self {
        let mut op = self.clone();
        if op.kind == MoveKind::Directory {
            op.source_path = op.source_path.trim_end_matches('/').to_string();
            op.dest_path = op.dest_path.trim_end_matches('/').to_string();
        }
        op
    }
}

// =============================================================================
// STRANDS AND REFERENCES
// =============================================================================

/// A stored knowledge unit addressed by a unique logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strand {
    pub id: Uuid,
    pub path: String,
    pub content: String,
    /// `None` marks the strand as needing re-embedding.
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Fresh projection of a strand used while rewriting references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandContent {
    pub id: Uuid,
    pub path: String,
    pub content: String,
}

impl From<Strand> for StrandContent {
    fn from(s: Strand) -> Self {
        Self {
            id: s.id,
            path: s.path,
            content: s.content,
        }
    }
}

/// Aggregated occurrences of one moved path inside a content blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathReferenceMatch {
    pub old_path: String,
    pub new_path: String,
    pub occurrence_count: usize,
}

/// References a batch would rewrite in one strand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandPreview {
    pub strand_id: Uuid,
    pub path: String,
    pub matches: Vec<PathReferenceMatch>,
}

// =============================================================================
// PROCESSING
// =============================================================================

/// Stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    CollectingAffectedStrands,
    UpdatingPathReferences,
    UpdatingBlockRecords,
}

impl ProgressStage {
    /// Human-readable stage label.
    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::CollectingAffectedStrands => "Collecting affected strands",
            ProgressStage::UpdatingPathReferences => "Updating path references",
            ProgressStage::UpdatingBlockRecords => "Updating block records",
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a move processing call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// True iff storage was reachable and `errors` is empty.
    pub success: bool,
    pub strands_processed: usize,
    pub blocks_updated: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ProcessingResult {
    /// Zero-valued successful result.
    pub fn empty() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Failed result carrying a single batch-level error.
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            duration_ms,
            ..Default::default()
        }
    }
}

// =============================================================================
// QUEUEING
// =============================================================================

/// Answer returned to callers that asked for a batch to be queued.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueOutcome {
    pub queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl QueueOutcome {
    pub fn not_queued() -> Self {
        Self::default()
    }

    pub fn queued(job_id: String) -> Self {
        Self {
            queued: true,
            job_id: Some(job_id),
        }
    }
}

/// Serialized body of a queued move job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveJobPayload {
    pub operations: Vec<MoveOperation>,
}

impl MoveJobPayload {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MoveKind::Directory).unwrap(),
            "\"directory\""
        );
        assert_eq!(MoveKind::File.to_string(), "file");
    }

    #[test]
    fn test_display_name_defaults_to_last_segment() {
        let op = MoveOperation::file("weaves/a/intro.md", "weaves/b/intro.md");
        assert_eq!(op.display_name, "intro.md");

        let op = MoveOperation::directory("weaves/a/", "weaves/b/");
        assert_eq!(op.display_name, "a");
    }

    #[test]
    fn test_validate_rejects_identical_paths() {
        let op = MoveOperation::file("a.md", "a.md");
        assert!(matches!(op.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_identical_after_trailing_slash() {
        let op = MoveOperation::directory("weaves/a/", "weaves/a");
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        assert!(MoveOperation::file("", "b.md").validate().is_err());
        assert!(MoveOperation::file("a.md", "").validate().is_err());
        assert!(MoveOperation::directory("/", "b").validate().is_err());
    }

    #[test]
    fn test_validate_accepts_distinct_paths() {
        assert!(MoveOperation::file("a.md", "b.md").validate().is_ok());
    }

    #[test]
    fn test_normalized_only_touches_directories() {
        let dir = MoveOperation::directory("weaves/a/", "weaves/b//").normalized();
        assert_eq!(dir.source_path, "weaves/a");
        assert_eq!(dir.dest_path, "weaves/b");

        let file = MoveOperation::file("odd/", "odder/").normalized();
        assert_eq!(file.source_path, "odd/");
    }

    #[test]
    fn test_progress_stage_labels() {
        assert_eq!(
            ProgressStage::CollectingAffectedStrands.label(),
            "Collecting affected strands"
        );
        assert_eq!(
            ProgressStage::UpdatingPathReferences.to_string(),
            "Updating path references"
        );
        assert_eq!(
            ProgressStage::UpdatingBlockRecords.label(),
            "Updating block records"
        );
    }

    #[test]
    fn test_processing_result_constructors() {
        let empty = ProcessingResult::empty();
        assert!(empty.success);
        assert_eq!(empty.strands_processed, 0);
        assert!(empty.errors.is_empty());

        let failed = ProcessingResult::failed("Database not available", 3);
        assert!(!failed.success);
        assert_eq!(failed.errors, vec!["Database not available".to_string()]);
        assert_eq!(failed.duration_ms, 3);
    }

    #[test]
    fn test_queue_outcome_omits_missing_job_id() {
        let json = serde_json::to_value(QueueOutcome::not_queued()).unwrap();
        assert_eq!(json, serde_json::json!({ "queued": false }));
    }

    #[test]
    fn test_job_payload_decodes_with_missing_display_name() {
        let value = serde_json::json!({
            "operations": [{
                "kind": "file",
                "source_path": "a.md",
                "dest_path": "b.md",
                "occurred_at": "2026-10-16T12:00:00Z"
            }]
        });
        let payload = MoveJobPayload::from_json(value).unwrap();
        assert_eq!(payload.operations.len(), 1);
        assert_eq!(payload.operations[0].display_name, "");
        assert_eq!(payload.operations[0].kind, MoveKind::File);
    }
}
