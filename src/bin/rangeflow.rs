//! # Rangeflow CLI
//!
//! Runs a parameterized SQL statement over every row of a table, block by block, with
//! one worker per partition of the table's key space.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rangeflow_core::config::ConfigManager;
use rangeflow_core::database::{DatabaseConnection, SqlStatementOperation};
use rangeflow_core::execution::{ExecutionCoordinator, RunSummary, TargetEntity};
use rangeflow_core::logging;
use rangeflow_core::system;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rangeflow")]
#[command(about = "Parallel range-partitioned batch execution over PostgreSQL tables")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $RANGEFLOW_CONFIG_DIR or ./config)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a statement to every block of a table
    Run {
        /// Table to process, optionally schema-qualified
        #[arg(long)]
        table: String,

        /// Integer key column used to partition the table
        #[arg(long, default_value = "id")]
        key_column: String,

        /// Statement run once per block with the block bounds bound as $1 (inclusive) and $2 (exclusive)
        #[arg(long)]
        statement: String,

        /// Number of parallel workers (default: configured value or hardware parallelism)
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Keys per block (default: configured value)
        #[arg(short, long)]
        block_size: Option<i64>,

        /// Print the partition plan without executing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Load and validate configuration, then print it with credentials masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load_from_directory(cli.config_dir.clone())
        .context("failed to load configuration")?;

    let mut logging_config = manager.config().logging.clone();
    match cli.verbose {
        0 => {}
        1 => logging_config.level = Some("debug".to_string()),
        _ => logging_config.level = Some("trace".to_string()),
    }
    logging::init_with_config(&logging_config);
    info!(
        version = system::RANGEFLOW_CORE_VERSION,
        environment = manager.environment(),
        "Rangeflow starting"
    );

    match cli.command {
        Commands::CheckConfig => {
            println!("environment: {}", manager.environment());
            println!("directory:   {}", manager.config_directory().display());
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            Ok(())
        }
        Commands::Run {
            table,
            key_column,
            statement,
            parallelism,
            block_size,
            dry_run,
        } => {
            let mut config = manager.config().clone();
            if parallelism.is_some() {
                config.execution.parallelism = parallelism;
            }
            if let Some(block_size) = block_size {
                config.execution.block_size = block_size;
            }
            config.validate().context("invalid run settings")?;

            let entity = TargetEntity::new(table, key_column)?;
            let operation = SqlStatementOperation::new(statement)?;

            let db = DatabaseConnection::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            if !db.health_check().await? {
                bail!("database health check failed");
            }
            let keys = db.load_keys(&entity).await?;
            if keys.is_empty() {
                warn!(table = entity.table(), "Table has no rows; nothing to do");
                return Ok(());
            }

            let coordinator = Arc::new(ExecutionCoordinator::new(
                keys,
                entity,
                db.session_factory(),
                config.execution,
            ));

            if dry_run {
                for (worker_id, partition) in coordinator.plan()?.iter().enumerate() {
                    println!(
                        "worker {worker_id}: {partition} ({} blocks)",
                        partition.block_count(coordinator.settings().block_size)
                    );
                }
                db.close().await;
                return Ok(());
            }

            let operation = Arc::new(operation);
            let workers = coordinator.dispatch(Arc::clone(&operation))?;
            info!(workers = workers, "Run started");

            let interrupt = {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        coordinator.cancel();
                    }
                })
            };
            let reporter = {
                let progress = coordinator.progress();
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_millis(500));
                    loop {
                        ticker.tick().await;
                        print!("\r Progress: {}%", progress.percentile());
                        let _ = std::io::stdout().flush();
                    }
                })
            };

            let result = coordinator.join().await;
            reporter.abort();
            interrupt.abort();
            println!("\r Progress: {}%", result.final_progress.percentile);

            let summary = result.summary();
            print_summary(&summary, operation.rows_affected());
            db.close().await;

            if !summary.is_complete() {
                bail!(
                    "run incomplete: {} of {} blocks committed",
                    summary.blocks_committed,
                    summary.blocks_total
                );
            }
            Ok(())
        }
    }
}

fn print_summary(summary: &RunSummary, rows_affected: u64) {
    println!(
        "workers: {}  blocks: {}/{} committed  rows affected: {}",
        summary.workers, summary.blocks_committed, summary.blocks_total, rows_affected
    );
    for block in &summary.exhausted_blocks {
        println!("  exhausted retries: {block}");
    }
    if summary.failed_blocks > 0 {
        println!("  blocks failed fatally: {}", summary.failed_blocks);
    }
    if !summary.failed_workers.is_empty() {
        println!("  failed workers: {:?}", summary.failed_workers);
    }
    if !summary.cancelled_workers.is_empty() {
        println!(
            "  cancelled workers: {:?} ({} blocks skipped)",
            summary.cancelled_workers, summary.skipped_blocks
        );
    }
}
