//! # codex-moves
//!
//! Keeps strands consistent after files and directories move.
//!
//! This crate provides:
//! - Literal path reference detection ([`detect_references`])
//! - The move reference processor ([`MoveProcessor::process`]): rewrites
//!   references in affected strands, repoints the block index, and
//!   optionally flags strands for re-embedding
//! - A queue gateway ([`MoveQueueGateway`]) that persists batches as jobs and
//!   falls back to synchronous processing
//! - A read-only preview ([`MoveProcessor::preview`])
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use codex_db::{Database, PgMoveStoreConnector};
//! use codex_moves::{MoveOperation, MoveProcessingOptions, MoveProcessor};
//!
//! let db = Database::connect("postgres://...").await?;
//! let processor = MoveProcessor::new(Arc::new(PgMoveStoreConnector::new(db)));
//!
//! let ops = vec![MoveOperation::directory("weaves/drafts", "weaves/published")];
//! let result = processor
//!     .process(
//!         MoveProcessingOptions::new(ops)
//!             .with_update_embeddings(true)
//!             .with_progress_callback(|stage, current, total| {
//!                 println!("{stage}: {current}/{total}");
//!             }),
//!     )
//!     .await;
//! ```

pub mod config;
pub mod memory;
pub mod preview;
pub mod processor;
pub mod queue;
pub mod references;

// Re-export core types
pub use codex_core::*;

pub use config::MoveConfig;
pub use processor::{MoveProcessingOptions, MoveProcessor, ProgressCallback};
pub use queue::{generate_job_id, MoveQueueGateway};
pub use references::{
    detect_references, escape_path_pattern, ReferencePattern, ReferenceRewriter,
    RewrittenContent,
};
