//! Task progress writes for one pipeline run
//!
//! Each write is its own commit so pollers see intermediate progress. The
//! reporter keeps progress non-decreasing and refuses writes once the task
//! has reached a terminal status. A run begins with [`ProgressReporter::start`],
//! which only succeeds for a task nobody has picked up yet.

use std::sync::Arc;

use trove_core::models::TaskUpdate;
use trove_core::IngestError;
use trove_db::TaskStore;
use uuid::Uuid;

pub struct ProgressReporter {
    tasks: Arc<dyn TaskStore>,
    task_id: Uuid,
    progress: i16,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(tasks: Arc<dyn TaskStore>, task_id: Uuid) -> Self {
        Self {
            tasks,
            task_id,
            progress: 0,
            finished: false,
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Last progress value written.
    pub fn progress(&self) -> i16 {
        self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Claim the task with its first RUNNING update.
    ///
    /// A task that has already left PENDING belongs to an earlier delivery of
    /// the same job: nothing is written and `AlreadyClaimed` is returned.
    pub async fn start(&mut self, progress: i16, message: &str) -> Result<(), IngestError> {
        let update = TaskUpdate::running(progress, message);
        match self
            .tasks
            .claim(self.task_id, &update)
            .await
            .map_err(IngestError::Persistence)?
        {
            Some(task) => {
                self.progress = task.progress;
                self.finished = false;
                tracing::debug!(task_id = %self.task_id, progress = task.progress, "Task claimed");
                Ok(())
            }
            None => {
                self.finished = true;
                Err(IngestError::AlreadyClaimed(self.task_id))
            }
        }
    }

    /// Write a RUNNING update. A value below the last one written is raised
    /// to it, so the message still lands without moving progress backwards.
    pub async fn running(&mut self, progress: i16, message: &str) -> Result<(), IngestError> {
        let progress = progress.max(self.progress).min(99);
        self.write(TaskUpdate::running(progress, message)).await
    }

    /// Write a RUNNING update only if it moves progress forward.
    pub async fn advance_to(&mut self, progress: i16, message: &str) -> Result<bool, IngestError> {
        if progress <= self.progress {
            return Ok(false);
        }
        self.running(progress, message).await?;
        Ok(true)
    }

    pub async fn succeed(&mut self, message: &str) -> Result<(), IngestError> {
        self.write(TaskUpdate::success(message)).await
    }

    pub async fn fail(&mut self, message: &str) -> Result<(), IngestError> {
        self.write(TaskUpdate::failure(self.progress, message)).await
    }

    async fn write(&mut self, update: TaskUpdate) -> Result<(), IngestError> {
        if self.finished {
            tracing::warn!(
                task_id = %self.task_id,
                status = %update.status,
                "Ignoring task update after terminal status"
            );
            return Ok(());
        }

        self.tasks
            .advance(self.task_id, &update)
            .await
            .map_err(IngestError::Persistence)?;

        self.progress = update.progress;
        self.finished = update.status.is_terminal();

        tracing::debug!(
            task_id = %self.task_id,
            status = %update.status,
            progress = update.progress,
            message = %update.message,
            "Task progress recorded"
        );
        Ok(())
    }
}

/// Progress for the `completed`-th of `total` cataloged files, spread over
/// 40..=89 so the finalizing step at 90 is always ahead.
pub fn catalog_progress(completed: usize, total: usize) -> i16 {
    if total == 0 {
        return 89;
    }
    let share = (50 * completed.min(total)) / total;
    (40 + share as i16).min(89)
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("task_id", &self.task_id)
            .field("progress", &self.progress)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::models::TaskStatus;
    use trove_db::MemoryStore;

    #[test]
    fn catalog_progress_spreads_below_ninety() {
        assert_eq!(catalog_progress(0, 4), 40);
        assert_eq!(catalog_progress(1, 4), 52);
        assert_eq!(catalog_progress(2, 4), 65);
        assert_eq!(catalog_progress(4, 4), 89);
        assert_eq!(catalog_progress(1, 1), 89);
        assert_eq!(catalog_progress(0, 0), 89);
        assert_eq!(catalog_progress(1, 1000), 40);
    }

    #[tokio::test]
    async fn progress_never_moves_backwards() {
        let store = Arc::new(MemoryStore::new());
        let task = store.create("process_dataset_upload", "queued").await.unwrap();
        let mut reporter = ProgressReporter::new(store.clone(), task.id);

        reporter.running(40, "unpacked").await.unwrap();
        reporter.running(10, "late").await.unwrap();
        assert_eq!(reporter.progress(), 40);
        assert!(!reporter.advance_to(40, "same").await.unwrap());
        assert!(reporter.advance_to(52, "file 1").await.unwrap());

        let history: Vec<i16> = store
            .task_history(task.id)
            .await
            .iter()
            .map(|t| t.progress)
            .collect();
        assert_eq!(history, vec![0, 40, 40, 52]);
    }

    #[tokio::test]
    async fn no_writes_after_terminal() {
        let store = Arc::new(MemoryStore::new());
        let task = store.create("process_dataset_upload", "queued").await.unwrap();
        let mut reporter = ProgressReporter::new(store.clone(), task.id);

        reporter.running(5, "starting").await.unwrap();
        reporter.fail("boom").await.unwrap();
        assert!(reporter.is_finished());
        reporter.running(50, "too late").await.unwrap();
        reporter.succeed("too late").await.unwrap();

        let last = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(last.status, TaskStatus::Failure);
        assert_eq!(last.progress, 5);
        assert_eq!(store.task_history(task.id).await.len(), 3);
    }

    #[tokio::test]
    async fn start_claims_a_task_once() {
        let store = Arc::new(MemoryStore::new());
        let task = store.create("process_dataset_upload", "queued").await.unwrap();

        let mut first = ProgressReporter::new(store.clone(), task.id);
        first.start(5, "starting").await.unwrap();
        assert_eq!(first.progress(), 5);
        first.succeed("done").await.unwrap();

        let mut second = ProgressReporter::new(store.clone(), task.id);
        let err = second.start(5, "starting").await.unwrap_err();
        assert!(matches!(err, IngestError::AlreadyClaimed(id) if id == task.id));
        assert!(second.is_finished());
        second.fail("duplicate").await.unwrap();

        let last = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(last.status, TaskStatus::Success);
        assert_eq!(last.progress, 100);
        assert_eq!(store.task_history(task.id).await.len(), 3);
    }

    #[tokio::test]
    async fn unknown_task_is_a_persistence_error() {
        let store = Arc::new(MemoryStore::new());
        let mut reporter = ProgressReporter::new(store, Uuid::new_v4());
        let err = reporter.start(5, "starting").await.unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
    }
}
