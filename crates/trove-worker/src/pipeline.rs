//! Ingestion pipeline
//!
//! Drives one archive through `Received -> Unpacking -> Cataloging ->
//! Finalizing` and records every milestone on the job's task. Extraction,
//! content sniffing and image decoding are blocking and run on the blocking
//! thread pool.
//!
//! Progress milestones:
//! - 5: run started, source archive checked
//! - 10: unpacking
//! - 40: unpacked, dataset row created
//! - 40..=89: one step per cataloged file
//! - 90: finalizing, source archive removed
//! - 100: success
//!
//! Entries are committed one at a time. A failure part way through the
//! catalog walk leaves the dataset and every entry committed before it in
//! place; only the task reports FAILURE.
//!
//! A run starts by claiming its PENDING task. A job delivered again after its
//! task was picked up does nothing and leaves the task untouched.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use trove_core::config::ExtractionLimits;
use trove_core::error::{ErrorMetadata, LogLevel};
use trove_core::models::{Dataset, Dimensions, IngestJob, NewEntry};
use trove_core::IngestError;
use trove_db::StoreHandle;
use trove_processing::{classify, detect_content_type, Classification};
use trove_storage::DatasetStorage;
use uuid::Uuid;

use crate::context::{IngestHandler, RemoveSourceFile, SourceCleanup};
use crate::progress::{catalog_progress, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Unpacking,
    Cataloging,
    Finalizing,
    Succeeded,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Unpacking => "unpacking",
            IngestStage::Cataloging => "cataloging",
            IngestStage::Finalizing => "finalizing",
            IngestStage::Succeeded => "succeeded",
            IngestStage::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub dataset_id: Uuid,
    pub dataset_name: String,
    pub entries: usize,
    pub skipped: usize,
}

/// What the blocking per-file step found out about one extracted file.
struct FileInspection {
    content_type: Option<String>,
    classification: Classification,
    dimensions: Option<Dimensions>,
}

fn inspect_file(path: &Path, relative_path: &str) -> FileInspection {
    let content_type = detect_content_type(path);
    let classification = classify(relative_path, content_type.as_deref());
    let dimensions = if classification.is_image() {
        trove_processing::dimensions(path)
    } else {
        None
    };
    FileInspection {
        content_type,
        classification,
        dimensions,
    }
}

pub struct IngestPipeline {
    store: StoreHandle,
    datasets: DatasetStorage,
    limits: ExtractionLimits,
    cleanup: Arc<dyn SourceCleanup>,
}

impl IngestPipeline {
    pub fn new(store: StoreHandle, datasets: DatasetStorage, limits: ExtractionLimits) -> Self {
        Self {
            store,
            datasets,
            limits,
            cleanup: Arc::new(RemoveSourceFile),
        }
    }

    /// Replace how the source archive is disposed of after cataloging.
    pub fn with_cleanup(mut self, cleanup: Arc<dyn SourceCleanup>) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Run one job. The task ends SUCCESS or FAILURE unless the final status
    /// write itself fails.
    ///
    /// Returns `AlreadyClaimed` without writing anything when the task is no
    /// longer PENDING. Separate tasks for the same archive each create their
    /// own dataset.
    #[tracing::instrument(
        skip(self, job),
        fields(task_id = %job.task_id, dataset_name = %job.dataset_name)
    )]
    pub async fn run(&self, job: &IngestJob) -> Result<IngestOutcome, IngestError> {
        let mut progress = ProgressReporter::new(self.store.tasks.clone(), job.task_id);
        let mut stage = IngestStage::Received;

        // Received -> Unpacking
        if let Err(err) = progress.start(5, "Checking source archive").await {
            tracing::warn!(error = %err, code = err.error_code(), "Ingestion not started");
            return Err(err);
        }

        match self.execute(job, &mut progress, &mut stage).await {
            Ok(outcome) => {
                progress
                    .succeed(&format!(
                        "Dataset {} ('{}') created with {} entries",
                        outcome.dataset_id, outcome.dataset_name, outcome.entries
                    ))
                    .await?;
                tracing::info!(
                    dataset_id = %outcome.dataset_id,
                    entries = outcome.entries,
                    skipped = outcome.skipped,
                    "Ingestion succeeded"
                );
                Ok(outcome)
            }
            Err(err) => {
                match err.log_level() {
                    LogLevel::Error => tracing::error!(
                        error = %err,
                        code = err.error_code(),
                        stage = %stage,
                        "Ingestion failed"
                    ),
                    _ => tracing::warn!(
                        error = %err,
                        code = err.error_code(),
                        stage = %stage,
                        "Ingestion failed"
                    ),
                }

                if let Err(status_err) = progress.fail(&err.to_string()).await {
                    tracing::error!(
                        error = %status_err,
                        "Failed to record task failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Run the same job given as loose fields.
    pub async fn run_parts(
        &self,
        task_id: Uuid,
        archive_location: impl Into<PathBuf>,
        original_filename: impl Into<String>,
        dataset_name: impl Into<String>,
    ) -> Result<IngestOutcome, IngestError> {
        let job = IngestJob {
            task_id,
            archive_location: archive_location.into(),
            original_filename: original_filename.into(),
            dataset_name: dataset_name.into(),
        };
        self.run(&job).await
    }

    async fn execute(
        &self,
        job: &IngestJob,
        progress: &mut ProgressReporter,
        stage: &mut IngestStage,
    ) -> Result<IngestOutcome, IngestError> {
        *stage = IngestStage::Unpacking;

        let source_exists = tokio::fs::try_exists(&job.archive_location)
            .await
            .unwrap_or(false);
        if !source_exists {
            return Err(IngestError::SourceMissing(job.archive_location.clone()));
        }

        progress.running(10, "Unpacking archive").await?;

        let dataset_id = Uuid::new_v4();
        let root = self.datasets.dataset_root(dataset_id);
        let files = {
            let archive = job.archive_location.clone();
            let original = job.original_filename.clone();
            let root = root.clone();
            let limits = self.limits;
            tokio::task::spawn_blocking(move || {
                trove_processing::extract(&archive, &original, &root, &limits)
            })
            .await
            .map_err(|e| IngestError::Internal(format!("Extraction task panicked: {}", e)))??
        };

        tracing::info!(
            dataset_id = %dataset_id,
            files = files.len(),
            "Archive unpacked"
        );

        // Unpacking -> Cataloging
        *stage = IngestStage::Cataloging;
        let dataset = Dataset::new(
            dataset_id,
            job.dataset_name.clone(),
            job.archive_location.display().to_string(),
        );
        if let Err(e) = self.store.catalog.create_dataset(&dataset).await {
            if let Err(io_err) = self.datasets.remove_dataset(dataset_id).await {
                tracing::warn!(error = %io_err, dataset_id = %dataset_id, "Failed to remove unpacked files");
            }
            return Err(IngestError::Persistence(e));
        }

        progress
            .running(40, &format!("Unpacked {} files, cataloging", files.len()))
            .await?;

        let total = files.len();
        let mut entries = 0;
        let mut skipped = 0;

        for (index, relative_path) in files.into_iter().enumerate() {
            let absolute = root.join(&relative_path);
            let inspection = {
                let relative_path = relative_path.clone();
                tokio::task::spawn_blocking(move || inspect_file(&absolute, &relative_path))
                    .await
                    .map_err(|e| {
                        IngestError::Internal(format!("File inspection task panicked: {}", e))
                    })?
            };

            if inspection.classification.is_accepted() {
                let filename = relative_path
                    .rsplit('/')
                    .next()
                    .unwrap_or(&relative_path)
                    .to_string();

                self.store
                    .catalog
                    .insert_entry(NewEntry {
                        dataset_id,
                        filename,
                        path: relative_path.clone(),
                        dimensions: inspection.dimensions,
                        content_type: inspection.content_type,
                    })
                    .await
                    .map_err(IngestError::Persistence)?;
                entries += 1;
            } else {
                tracing::debug!(path = %relative_path, "Skipping file rejected by classification");
                skipped += 1;
            }

            progress
                .advance_to(
                    catalog_progress(index + 1, total),
                    &format!("Cataloged {} of {} files", index + 1, total),
                )
                .await?;
        }

        // Cataloging -> Finalizing
        *stage = IngestStage::Finalizing;
        progress.running(90, "Removing source archive").await?;

        self.cleanup
            .remove(&job.archive_location)
            .await
            .map_err(|source| IngestError::Cleanup {
                path: job.archive_location.clone(),
                source,
            })?;

        *stage = IngestStage::Succeeded;
        Ok(IngestOutcome {
            dataset_id,
            dataset_name: job.dataset_name.clone(),
            entries,
            skipped,
        })
    }
}

#[async_trait]
impl IngestHandler for IngestPipeline {
    async fn handle(self: Arc<Self>, job: IngestJob) {
        if let Err(e) = self.run(&job).await {
            tracing::debug!(
                task_id = %job.task_id,
                error = %e,
                cleanup_only = e.is_cleanup_only(),
                "Ingestion job finished with error"
            );
        }
    }
}
