//! codex-move: apply, queue, or preview a batch of strand moves.
//!
//! Reads a JSON batch (either an array of operations or
//! `{"operations": [...]}`) and runs it against the database named by
//! `DATABASE_URL`. Results are printed to stdout as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codex_db::{Database, PgMoveStoreConnector, PoolConfig};
use codex_moves::{
    MoveConfig, MoveOperation, MoveProcessingOptions, MoveProcessor, MoveQueueGateway,
};

#[derive(Parser)]
#[command(name = "codex-move")]
#[command(author, version, about = "Rewrite strand references after moves")]
#[command(propagate_version = true)]
struct Cli {
    /// Database URL (falls back to DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch now
    Process {
        /// JSON file holding the move batch
        #[arg(short, long)]
        file: PathBuf,

        /// Flag affected strands for re-embedding
        #[arg(long)]
        update_embeddings: bool,

        /// Also rewrite strands that link into moved paths
        #[arg(long)]
        rewrite_referencing: bool,
    },

    /// Queue a batch as a background job
    Queue {
        /// JSON file holding the move batch
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show which references a batch would rewrite
    Preview {
        /// JSON file holding the move batch
        #[arg(short, long)]
        file: PathBuf,

        /// Include strands that link into moved paths
        #[arg(long)]
        rewrite_referencing: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    List(Vec<MoveOperation>),
    Payload { operations: Vec<MoveOperation> },
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<MoveOperation>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let batch: BatchFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid move batch in {}", path.display()))?;
    Ok(match batch {
        BatchFile::List(operations) | BatchFile::Payload { operations } => operations,
    })
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "codex_moves=info,codex_db=info")
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "codex_moves=info,codex_db=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("codex-move.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(log_ansi.unwrap_or(false)),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let db = Database::connect_lazy(&cli.database_url, PoolConfig::from_env())
        .context("Invalid database URL")?;
    let processor = MoveProcessor::new(Arc::new(PgMoveStoreConnector::new(db)));
    let config = MoveConfig::from_env();

    match cli.command {
        Commands::Process {
            file,
            update_embeddings,
            rewrite_referencing,
        } => {
            let operations = read_batch(&file)?;
            let options = MoveProcessingOptions::new(operations)
                .with_update_embeddings(update_embeddings || config.update_embeddings)
                .with_rewrite_referencing(rewrite_referencing || config.rewrite_referencing)
                .with_progress_callback(|stage, current, total| {
                    info!(stage = %stage, current, total, "Progress");
                });
            let result = processor.process(options).await;
            print_json(&result)?;
            Ok(result.success)
        }
        Commands::Queue { file } => {
            let operations = read_batch(&file)?;
            let gateway = MoveQueueGateway::new(processor).with_config(config);
            let outcome = gateway.queue(operations).await;
            print_json(&outcome)?;
            Ok(true)
        }
        Commands::Preview {
            file,
            rewrite_referencing,
        } => {
            let operations = read_batch(&file)?;
            let previews = processor
                .preview(
                    &operations,
                    rewrite_referencing || config.rewrite_referencing,
                )
                .await?;
            print_json(&previews)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
