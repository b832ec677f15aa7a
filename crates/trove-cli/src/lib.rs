//! Process wiring shared by the `trove` binary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use trove_core::TroveConfig;
use trove_db::{MemoryStore, StoreHandle};
use trove_storage::{DatasetStorage, UploadArea};
use trove_worker::{
    CatalogService, IngestPipeline, IngestQueue, IngestQueueConfig, IngestSubmitter,
};

/// Everything a command needs, built once per process.
pub struct App {
    pub config: TroveConfig,
    pub store: StoreHandle,
    pub catalog: CatalogService,
    pub submitter: IngestSubmitter,
    queue: IngestQueue,
    in_memory: bool,
}

impl App {
    /// Connect the store, prepare the data directories and start the queue.
    pub async fn build(config: TroveConfig, in_memory: bool) -> Result<Self> {
        let store = if in_memory {
            tracing::info!("Using in-memory store");
            StoreHandle::memory(Arc::new(MemoryStore::new()))
        } else {
            let pool = connect_pool(&config).await?;
            trove_db::run_migrations(&pool).await?;
            StoreHandle::postgres(pool)
        };

        let datasets = DatasetStorage::new(config.datasets_dir())
            .await
            .context("Failed to prepare dataset storage")?;
        let uploads = UploadArea::new(config.uploads_dir())
            .await
            .context("Failed to prepare upload area")?;

        let pipeline = Arc::new(IngestPipeline::new(
            store.clone(),
            datasets.clone(),
            config.extraction_limits,
        ));
        let queue = IngestQueue::new(IngestQueueConfig::from(&config), pipeline);
        let submitter = IngestSubmitter::new(store.tasks.clone(), uploads, queue.clone());
        let catalog = CatalogService::new(store.clone(), datasets);

        Ok(Self {
            config,
            store,
            catalog,
            submitter,
            queue,
            in_memory,
        })
    }

    pub fn in_memory(&self) -> bool {
        self.in_memory
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}

/// Open the PostgreSQL pool named by `DATABASE_URL`.
pub async fn connect_pool(config: &TroveConfig) -> Result<trove_db::PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set; pass --memory to run without a database")?;
    trove_db::connect(url, config.db_max_connections, config.db_timeout_seconds).await
}

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// One progress line for a polled task.
pub fn progress_line(progress: i16, status: &str, message: Option<&str>) -> String {
    format!("[{:>3}%] {:<8} {}", progress, status, message.unwrap_or(""))
        .trim_end()
        .to_string()
}
