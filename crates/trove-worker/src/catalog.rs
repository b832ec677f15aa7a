//! Read-side queries over tasks and the catalog
//!
//! Lookups of unknown ids return `CatalogError::NotFound`, never an empty
//! value, so a front end can map them straight to 404.

use bytes::Bytes;
use std::time::Duration;

use trove_core::models::{DatasetResponse, Entry, Task};
use trove_core::CatalogError;
use trove_db::StoreHandle;
use trove_storage::{DatasetStorage, StorageError};
use uuid::Uuid;

/// Bytes of one cataloged file.
#[derive(Debug, Clone)]
pub struct EntryContent {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct CatalogService {
    store: StoreHandle,
    datasets: DatasetStorage,
}

impl CatalogService {
    pub fn new(store: StoreHandle, datasets: DatasetStorage) -> Self {
        Self { store, datasets }
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Task, CatalogError> {
        self.store
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Task {} not found", task_id)))
    }

    /// Newest first.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetResponse>, CatalogError> {
        let datasets = self.store.catalog.list_datasets().await?;
        Ok(datasets.into_iter().map(DatasetResponse::from).collect())
    }

    pub async fn list_entries(&self, dataset_id: Uuid) -> Result<Vec<Entry>, CatalogError> {
        if self.store.catalog.get_dataset(dataset_id).await?.is_none() {
            return Err(CatalogError::NotFound(format!(
                "Dataset {} not found",
                dataset_id
            )));
        }
        Ok(self.store.catalog.list_entries(dataset_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_entry_bytes(&self, entry_id: Uuid) -> Result<EntryContent, CatalogError> {
        let entry = self
            .store
            .catalog
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Entry {} not found", entry_id)))?;

        let data = self
            .datasets
            .read(entry.dataset_id, &entry.path)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(path) => {
                    tracing::warn!(entry_id = %entry_id, path = %path, "Entry file missing from storage");
                    CatalogError::NotFound(format!("File for entry {} not found", entry_id))
                }
                StorageError::IoError(io) => CatalogError::Io(io),
                other => CatalogError::Database(anyhow::anyhow!(other)),
            })?;

        Ok(EntryContent {
            filename: entry.filename,
            content_type: entry.content_type,
            data,
        })
    }

    /// Delete a dataset, its entries and its extracted files.
    #[tracing::instrument(skip(self))]
    pub async fn delete_dataset(&self, dataset_id: Uuid) -> Result<(), CatalogError> {
        if !self.store.catalog.delete_dataset(dataset_id).await? {
            return Err(CatalogError::NotFound(format!(
                "Dataset {} not found",
                dataset_id
            )));
        }

        self.datasets
            .remove_dataset(dataset_id)
            .await
            .map_err(|e| match e {
                StorageError::IoError(io) => CatalogError::Io(io),
                other => CatalogError::Database(anyhow::anyhow!(other)),
            })?;

        tracing::info!(dataset_id = %dataset_id, "Dataset deleted");
        Ok(())
    }

    /// Poll a task until it reaches SUCCESS or FAILURE. `on_update` sees
    /// every poll whose status or progress differs from the previous one.
    pub async fn wait_for_task<F>(
        &self,
        task_id: Uuid,
        poll_interval: Duration,
        mut on_update: F,
    ) -> Result<Task, CatalogError>
    where
        F: FnMut(&Task),
    {
        let mut last: Option<(trove_core::models::TaskStatus, i16)> = None;
        loop {
            let task = self.get_task(task_id).await?;
            if last != Some((task.status, task.progress)) {
                on_update(&task);
                last = Some((task.status, task.progress));
            }
            if task.is_terminal() {
                return Ok(task);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
