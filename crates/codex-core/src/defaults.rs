//! Centralized default constants for Quarry Codex.
//!
//! Crates reference these constants instead of defining their own magic
//! numbers or message strings.

// =============================================================================
// MOVE PROCESSING
// =============================================================================

/// Error recorded when the storage collaborator cannot be acquired.
pub const DB_UNAVAILABLE_MESSAGE: &str = "Database not available";

/// Whether move batches clear `last_indexed_at` unless told otherwise.
pub const MOVE_UPDATE_EMBEDDINGS: bool = false;

/// Whether move batches also rewrite strands that link into a moved path.
pub const MOVE_REWRITE_REFERENCING: bool = false;

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Prefix of every queued move job identifier.
pub const MOVE_JOB_PREFIX: &str = "move";

/// Length of the random base-36 suffix in a move job identifier.
pub const MOVE_JOB_SUFFIX_LEN: usize = 9;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of connections in the pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default maximum connection lifetime in seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;
