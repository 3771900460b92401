//! Structured logging schema and field name constants for Quarry Codex.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, batch completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (strands, references) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "moves", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "processor", "queue", "pool", "strands", "blocks"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process", "queue", "preview", "collect"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Strand UUID being operated on.
pub const STRAND_ID: &str = "strand_id";

/// Queued move job identifier.
pub const JOB_ID: &str = "job_id";

/// Source path of a move operation.
pub const SOURCE_PATH: &str = "source_path";

/// Destination path of a move operation.
pub const DEST_PATH: &str = "dest_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of operations in a move batch.
pub const OPERATION_COUNT: &str = "operation_count";

/// Number of strands affected by a batch.
pub const STRAND_COUNT: &str = "strand_count";

/// Number of block rows whose owner path changed.
pub const BLOCK_COUNT: &str = "block_count";

/// Number of reference occurrences rewritten in a strand.
pub const REFERENCE_COUNT: &str = "reference_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Number of errors collected for a batch.
pub const ERROR_COUNT: &str = "error_count";
