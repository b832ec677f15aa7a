//! Submission: stage the upload, create the PENDING task, queue the job.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use trove_core::constants::{INGEST_TASK_KIND, QUEUED_MESSAGE};
use trove_core::models::{IngestJob, Task, TaskUpdate};
use trove_db::TaskStore;
use trove_storage::{sanitize_filename, UploadArea};

use crate::queue::IngestQueue;

#[derive(Clone)]
pub struct IngestSubmitter {
    tasks: Arc<dyn TaskStore>,
    uploads: UploadArea,
    queue: IngestQueue,
}

impl IngestSubmitter {
    pub fn new(tasks: Arc<dyn TaskStore>, uploads: UploadArea, queue: IngestQueue) -> Self {
        Self {
            tasks,
            uploads,
            queue,
        }
    }

    /// Accept uploaded archive bytes. Returns the PENDING task a client polls.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn submit(
        &self,
        original_filename: &str,
        data: &[u8],
        dataset_name: &str,
    ) -> Result<Task> {
        let staged = self
            .uploads
            .stage(original_filename, data)
            .await
            .context("Failed to stage upload")?;
        self.enqueue_staged(&staged, original_filename, dataset_name)
            .await
    }

    /// Accept an archive already on local disk. The file is copied into the
    /// upload area; the original is left alone.
    #[tracing::instrument(skip(self))]
    pub async fn submit_file(&self, path: &Path, dataset_name: &str) -> Result<Task> {
        let original_filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let staged = self
            .uploads
            .stage_file(path)
            .await
            .with_context(|| format!("Failed to stage {}", path.display()))?;
        self.enqueue_staged(&staged, &original_filename, dataset_name)
            .await
    }

    async fn enqueue_staged(
        &self,
        staged: &Path,
        original_filename: &str,
        dataset_name: &str,
    ) -> Result<Task> {
        let task = match self.tasks.create(INGEST_TASK_KIND, QUEUED_MESSAGE).await {
            Ok(task) => task,
            Err(e) => {
                discard_staged(staged).await;
                return Err(e.context("Failed to create ingest task"));
            }
        };

        let job = IngestJob {
            task_id: task.id,
            archive_location: staged.to_path_buf(),
            original_filename: sanitize_filename(original_filename, "upload"),
            dataset_name: dataset_name.to_string(),
        };

        if let Err(e) = self.queue.enqueue(job).await {
            tracing::error!(task_id = %task.id, error = %e, "Failed to queue ingest job");
            discard_staged(staged).await;
            self.tasks
                .advance(task.id, &TaskUpdate::failure(0, e.to_string()))
                .await
                .context("Failed to mark unqueued task as failed")?;
            return Err(e);
        }

        tracing::info!(
            task_id = %task.id,
            staged = %staged.display(),
            "Upload accepted"
        );
        Ok(task)
    }
}

async fn discard_staged(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        tracing::warn!(error = %e, staged = %staged.display(), "Failed to remove staged upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;
    use trove_core::models::TaskStatus;
    use trove_db::MemoryStore;
    use uuid::Uuid;

    use crate::context::IngestHandler;
    use crate::queue::IngestQueueConfig;

    struct NoopHandler;

    #[async_trait]
    impl IngestHandler for NoopHandler {
        async fn handle(self: Arc<Self>, _job: IngestJob) {}
    }

    async fn closed_queue() -> IngestQueue {
        let queue = IngestQueue::new(IngestQueueConfig::default(), Arc::new(NoopHandler));
        queue.shutdown().await;
        for _ in 0..50 {
            let job = IngestJob {
                task_id: Uuid::new_v4(),
                archive_location: "/tmp/none.zip".into(),
                original_filename: "none.zip".into(),
                dataset_name: "none".into(),
            };
            if queue.enqueue(job).await.is_err() {
                return queue;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never closed");
    }

    #[tokio::test]
    async fn unqueued_upload_is_discarded_and_task_failed() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let uploads = UploadArea::new(dir.path().join("uploads")).await.unwrap();
        let submitter = IngestSubmitter::new(store.clone(), uploads.clone(), closed_queue().await);

        let err = submitter
            .submit("photos.zip", b"PK\x03\x04", "late")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));

        assert_eq!(std::fs::read_dir(uploads.base_path()).unwrap().count(), 0);
        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Failure);
        assert!(tasks[0].message.as_deref().unwrap_or_default().contains("closed"));
    }
}
