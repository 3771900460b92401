//! Queue gateway for move batches.
//!
//! Persists a batch as a durable job for background execution. When the job
//! cannot be written the batch is processed synchronously instead, so the
//! work is never dropped. Callers only learn whether it was queued.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use codex_core::defaults::{MOVE_JOB_PREFIX, MOVE_JOB_SUFFIX_LEN};
use codex_core::{MoveJobPayload, MoveOperation, QueueOutcome};

use crate::config::MoveConfig;
use crate::processor::{MoveProcessingOptions, MoveProcessor};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Build a job id of the form `move-<unix millis>-<random base36 suffix>`.
pub fn generate_job_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..MOVE_JOB_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{MOVE_JOB_PREFIX}-{}-{suffix}", now.timestamp_millis())
}

/// Queues move batches, degrading to synchronous processing.
#[derive(Clone)]
pub struct MoveQueueGateway {
    processor: MoveProcessor,
    config: MoveConfig,
}

impl MoveQueueGateway {
    pub fn new(processor: MoveProcessor) -> Self {
        Self {
            processor,
            config: MoveConfig::default(),
        }
    }

    /// Flags used when a batch falls back to synchronous processing.
    pub fn with_config(mut self, config: MoveConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn queue(&self, operations: Vec<MoveOperation>) -> QueueOutcome {
        if operations.is_empty() {
            return QueueOutcome::not_queued();
        }

        let store = match self.processor.connector().connect().await {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    subsystem = "moves",
                    component = "queue",
                    op = "connect",
                    error = %e,
                    "Move store unavailable, batch not queued"
                );
                return QueueOutcome::not_queued();
            }
        };

        let enqueued_at = Utc::now();
        let job_id = generate_job_id(enqueued_at);
        let payload = MoveJobPayload {
            operations: operations.clone(),
        };

        let inserted = match payload.to_json() {
            Ok(json) => store.insert_job(&job_id, json, enqueued_at).await,
            Err(e) => Err(e),
        };

        match inserted {
            Ok(()) => {
                info!(
                    subsystem = "moves",
                    component = "queue",
                    op = "queue",
                    job_id = %job_id,
                    operation_count = operations.len(),
                    "Move batch queued"
                );
                QueueOutcome::queued(job_id)
            }
            Err(e) => {
                warn!(
                    subsystem = "moves",
                    component = "queue",
                    op = "queue",
                    job_id = %job_id,
                    error = %e,
                    "Failed to queue move batch, processing synchronously"
                );
                let options = MoveProcessingOptions::new(operations).with_config(&self.config);
                let result = self.processor.process(options).await;
                debug!(
                    subsystem = "moves",
                    component = "queue",
                    success = result.success,
                    error_count = result.errors.len(),
                    "Synchronous fallback finished"
                );
                QueueOutcome::not_queued()
            }
        }
    }
}
