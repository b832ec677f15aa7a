//! Storage seams used by the pipeline and the query layer.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use trove_core::models::{Dataset, Entry, NewEntry, Task, TaskUpdate};

use crate::db::{CatalogRepository, TaskRepository};
use crate::memory::MemoryStore;

/// Read/write access to task rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a `PENDING` task with progress 0.
    async fn create(&self, kind: &str, initial_message: &str) -> Result<Task>;

    /// Apply one status/progress/message write as a single commit.
    ///
    /// Callers must not lower progress while the status stays `RUNNING` and
    /// must not write after a terminal status; this method does not check
    /// either. Errors if the task does not exist.
    async fn advance(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Task>;

    /// Apply `update` only if the task is still `PENDING`, as one commit.
    ///
    /// Returns `None` without writing when the task has already been picked
    /// up. Errors if the task does not exist.
    async fn claim(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Option<Task>>;

    async fn get(&self, task_id: Uuid) -> Result<Option<Task>>;
}

/// Durable datasets and entries.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset>;

    async fn get_dataset(&self, dataset_id: Uuid) -> Result<Option<Dataset>>;

    /// Newest first.
    async fn list_datasets(&self) -> Result<Vec<Dataset>>;

    /// Remove a dataset and, by cascade, its entries. Returns false when absent.
    async fn delete_dataset(&self, dataset_id: Uuid) -> Result<bool>;

    /// Insert one entry. Fails if the owning dataset does not exist.
    async fn insert_entry(&self, entry: NewEntry) -> Result<Entry>;

    async fn list_entries(&self, dataset_id: Uuid) -> Result<Vec<Entry>>;

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>>;
}

/// Explicit store handle passed to every pipeline and query operation.
#[derive(Clone)]
pub struct StoreHandle {
    pub tasks: Arc<dyn TaskStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl StoreHandle {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            catalog: Arc::new(CatalogRepository::new(pool)),
        }
    }

    /// Both seams backed by the same in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            tasks: store.clone(),
            catalog: store,
        }
    }
}
