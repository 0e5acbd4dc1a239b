//! Innbox CLI - staff-terminal queue inspection and drain
//!
//! Lets an operator look at what a terminal has queued while offline, what
//! has been dead-lettered, and force a sync pass against the backend.

mod error;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use error::CliError;
use innbox_core::queue::DeadOperation;
use innbox_core::{
    HttpRemoteService, LibSqlStore, OperationQueue, QueuedOperation, SyncProcessor,
};

#[derive(Parser)]
#[command(name = "innbox")]
#[command(about = "Inspect and drain the local Innbox mutation queue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the local queue database file
    #[arg(long, value_name = "PATH", default_value = "innbox-queue.db")]
    db_path: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List operations waiting to sync
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List dead-lettered operations that exhausted their retries
    Dead {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay pending operations against the backend
    Drain {
        /// Backend API base URL (or INNBOX_API_URL)
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Bearer token for the tenant (or INNBOX_API_TOKEN)
        #[arg(long, value_name = "TOKEN")]
        api_token: Option<String>,
    },
    /// Show queue depth summary
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = LibSqlStore::open(&cli.db_path).await?;
    let queue = OperationQueue::new(Arc::new(store));

    match cli.command {
        Commands::Pending { json } => {
            let pending = queue.list_pending().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No pending operations.");
            } else {
                for op in &pending {
                    print_pending(op);
                }
                println!("{} pending operation(s).", pending.len());
            }
        }
        Commands::Dead { json } => {
            let dead = queue.list_dead().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dead)?);
            } else if dead.is_empty() {
                println!("No dead-lettered operations.");
            } else {
                for entry in &dead {
                    print_dead(entry);
                }
                println!("{} dead-lettered operation(s).", dead.len());
            }
        }
        Commands::Drain { api_url, api_token } => {
            let remote = build_remote(api_url, api_token)?;
            let processor = SyncProcessor::new(queue.clone(), Arc::new(remote));

            let report = processor.drain().await?;
            println!(
                "Drain finished: {} applied, {} retained, {} dead-lettered, {} deferred.",
                report.applied, report.retained, report.buried, report.deferred
            );
            let remaining = queue.list_pending().await?.len();
            if remaining > 0 {
                println!("{remaining} operation(s) still pending.");
            }
        }
        Commands::Status => {
            let pending = queue.list_pending().await?.len();
            let dead = queue.list_dead().await?.len();
            println!("Pending: {pending}");
            println!("Dead-lettered: {dead}");
        }
    }

    Ok(())
}

fn build_remote(
    api_url: Option<String>,
    api_token: Option<String>,
) -> Result<HttpRemoteService, CliError> {
    let url = api_url
        .or_else(|| env::var("INNBOX_API_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .ok_or(CliError::RemoteNotConfigured)?;

    let mut remote = HttpRemoteService::new(url)?;
    if let Some(token) = api_token
        .or_else(|| env::var("INNBOX_API_TOKEN").ok())
        .filter(|token| !token.trim().is_empty())
    {
        remote = remote.with_auth_token(token);
    }
    Ok(remote)
}

fn print_pending(op: &QueuedOperation) {
    println!(
        "{}  {:<7} {:<16} enqueued {}  retries {}",
        op.id,
        op.action.to_string(),
        op.target_entity,
        format_ms(op.enqueued_at.unwrap_or(0)),
        op.retry_count
    );
}

fn print_dead(entry: &DeadOperation) {
    println!(
        "{}  {:<7} {:<16} failed {}  {}",
        entry.op.id,
        entry.op.action.to_string(),
        entry.op.target_entity,
        format_ms(entry.failed_at),
        entry.last_error
    );
}

fn format_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map_or_else(|| ms.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
