//! trove: ingest archives into a browsable catalog.
//!
//! Reads configuration from the environment (see `.env`). `--memory` runs
//! against an in-process store instead of PostgreSQL.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use trove_cli::{print_json, progress_line, App};
use trove_core::models::{TaskResponse, TaskStatus};
use trove_core::TroveConfig;

#[derive(Parser)]
#[command(name = "trove", about = "Archive ingestion and catalog")]
struct Cli {
    /// Use an in-memory store; nothing survives the process
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Submit an archive and follow its task to completion
    Ingest {
        /// Path to the archive
        archive: PathBuf,
        /// Dataset name
        #[arg(long)]
        name: String,
        /// Poll interval in milliseconds
        #[arg(long, default_value = "250")]
        poll_ms: u64,
    },
    /// Show a task
    Task {
        /// Task UUID
        id: Uuid,
    },
    /// List datasets, newest first
    Datasets,
    /// List the entries of a dataset
    Entries {
        /// Dataset UUID
        dataset_id: Uuid,
    },
    /// Write an entry's bytes to stdout
    Cat {
        /// Entry UUID
        entry_id: Uuid,
    },
    /// Delete a dataset with its entries and files
    Delete {
        /// Dataset UUID
        dataset_id: Uuid,
    },
}

/// Arguments are parsed before the environment is read, so `--help` and
/// usage errors work even when the configuration is broken.
fn startup<I, T>(args: I) -> Result<(Cli, TroveConfig)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let config = TroveConfig::from_env().context("Invalid configuration")?;
    Ok((cli, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, config) = match startup(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => match e.downcast::<clap::Error>() {
            Ok(usage) => usage.exit(),
            Err(e) => return Err(e),
        },
    };
    trove_worker::telemetry::init_tracing(config.log_format)?;

    let app = App::build(config, cli.memory).await?;
    let result = run(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        // The app applies migrations when it connects.
        Commands::Migrate => {
            if app.in_memory() {
                println!("In-memory store, nothing to migrate");
            } else {
                println!("Migrations applied");
            }
        }
        Commands::Ingest {
            archive,
            name,
            poll_ms,
        } => {
            let task = app.submitter.submit_file(&archive, &name).await?;
            eprintln!("Task {}", task.id);

            let done = app
                .catalog
                .wait_for_task(task.id, Duration::from_millis(poll_ms), |t| {
                    eprintln!(
                        "{}",
                        progress_line(t.progress, t.status.as_str(), t.message.as_deref())
                    );
                })
                .await?;

            let failed = done.status == TaskStatus::Failure;
            let message = done.message.clone().unwrap_or_default();
            print_json(&TaskResponse::from(done))?;
            if failed {
                anyhow::bail!("Ingestion failed: {}", message);
            }
        }
        Commands::Task { id } => {
            let task = app.catalog.get_task(id).await?;
            print_json(&TaskResponse::from(task))?;
        }
        Commands::Datasets => {
            let datasets = app.catalog.list_datasets().await?;
            print_json(&datasets)?;
        }
        Commands::Entries { dataset_id } => {
            let entries = app.catalog.list_entries(dataset_id).await?;
            print_json(&entries)?;
        }
        Commands::Cat { entry_id } => {
            let content = app.catalog.read_entry_bytes(entry_id).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content.data).await?;
            stdout.flush().await?;
        }
        Commands::Delete { dataset_id } => {
            app.catalog.delete_dataset(dataset_id).await?;
            println!("Deleted dataset {}", dataset_id);
        }
    }
    Ok(())
}
