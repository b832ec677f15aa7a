//! Seams the queue and pipeline call through
//!
//! The queue holds an `Arc<dyn IngestHandler>` and calls `handle` once per
//! job. `IngestPipeline` is the production implementation. The pipeline
//! disposes of a consumed archive through `SourceCleanup`.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use trove_core::models::IngestJob;

#[async_trait]
pub trait IngestHandler: Send + Sync {
    /// Run one job to completion. Outcomes are recorded on the job's task,
    /// so nothing is returned.
    async fn handle(self: Arc<Self>, job: IngestJob);
}

/// Removes a source archive once its dataset has been cataloged.
#[async_trait]
pub trait SourceCleanup: Send + Sync {
    async fn remove(&self, archive: &Path) -> std::io::Result<()>;
}

/// Deletes the archive file.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveSourceFile;

#[async_trait]
impl SourceCleanup for RemoveSourceFile {
    async fn remove(&self, archive: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(archive).await
    }
}
