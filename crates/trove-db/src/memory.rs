//! In-memory store
//!
//! Implements both seams with the same invariants as the PostgreSQL schema:
//! entries must reference an existing dataset, deleting a dataset cascades to
//! its entries. Used by tests and by the CLI's `--memory` mode.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use trove_core::models::{Dataset, Entry, NewEntry, Task, TaskStatus, TaskUpdate};

use crate::traits::{CatalogStore, TaskStore};

#[derive(Default)]
struct Tables {
    tasks: HashMap<Uuid, Task>,
    datasets: HashMap<Uuid, Dataset>,
    /// Insertion order is kept so listings are stable.
    entries: Vec<Entry>,
    /// Every task write in commit order, for observing progress histories.
    task_history: Vec<(Uuid, Task)>,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Entry inserts still allowed before injected failures start; negative
    /// disables injection.
    inserts_until_failure: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            inserts_until_failure: AtomicI64::new(-1),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_entry` fail, as a lost database
    /// connection would.
    pub fn set_fail_entry_inserts(&self, fail: bool) {
        self.inserts_until_failure
            .store(if fail { 0 } else { -1 }, Ordering::SeqCst);
    }

    /// Let `count` more entry inserts succeed, then fail the rest.
    pub fn fail_entry_inserts_after(&self, count: usize) {
        self.inserts_until_failure
            .store(count as i64, Ordering::SeqCst);
    }

    /// Every committed state of a task, oldest first.
    pub async fn task_history(&self, task_id: Uuid) -> Vec<Task> {
        self.tables
            .read()
            .await
            .task_history
            .iter()
            .filter(|(id, _)| *id == task_id)
            .map(|(_, task)| task.clone())
            .collect()
    }

    /// Current state of every task.
    pub async fn tasks(&self) -> Vec<Task> {
        self.tables.read().await.tasks.values().cloned().collect()
    }

    pub async fn entry_count(&self) -> usize {
        self.tables.read().await.entries.len()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, kind: &str, initial_message: &str) -> Result<Task> {
        let task = Task::pending(kind, initial_message);
        let mut tables = self.tables.write().await;
        tables.tasks.insert(task.id, task.clone());
        tables.task_history.push((task.id, task.clone()));
        Ok(task)
    }

    async fn advance(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Task> {
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| anyhow!("Task {} not found", task_id))?;

        task.status = update.status;
        task.progress = update.progress;
        task.message = Some(update.message.clone());
        task.updated_at = Utc::now();

        let snapshot = task.clone();
        tables.task_history.push((task_id, snapshot.clone()));
        Ok(snapshot)
    }

    async fn claim(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Option<Task>> {
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| anyhow!("Task {} not found", task_id))?;
        if task.status != TaskStatus::Pending {
            return Ok(None);
        }

        task.status = update.status;
        task.progress = update.progress;
        task.message = Some(update.message.clone());
        task.updated_at = Utc::now();

        let snapshot = task.clone();
        tables.task_history.push((task_id, snapshot.clone()));
        Ok(Some(snapshot))
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<Task>> {
        Ok(self.tables.read().await.tasks.get(&task_id).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        let mut tables = self.tables.write().await;
        if tables.datasets.contains_key(&dataset.id) {
            return Err(anyhow!("Dataset {} already exists", dataset.id));
        }
        tables.datasets.insert(dataset.id, dataset.clone());
        Ok(dataset.clone())
    }

    async fn get_dataset(&self, dataset_id: Uuid) -> Result<Option<Dataset>> {
        Ok(self.tables.read().await.datasets.get(&dataset_id).cloned())
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let mut datasets: Vec<Dataset> =
            self.tables.read().await.datasets.values().cloned().collect();
        datasets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(datasets)
    }

    async fn delete_dataset(&self, dataset_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.datasets.remove(&dataset_id).is_none() {
            return Ok(false);
        }
        tables.entries.retain(|e| e.dataset_id != dataset_id);
        Ok(true)
    }

    async fn insert_entry(&self, entry: NewEntry) -> Result<Entry> {
        let allowed = self
            .inserts_until_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 {
                    Some(n - 1)
                } else {
                    None
                }
            })
            .map(|_| true)
            .unwrap_or_else(|n| n < 0);
        if !allowed {
            return Err(anyhow!("Failed to insert entry {}: store unavailable", entry.path));
        }

        let mut tables = self.tables.write().await;
        if !tables.datasets.contains_key(&entry.dataset_id) {
            return Err(anyhow!(
                "Failed to insert entry {}: dataset {} does not exist",
                entry.path,
                entry.dataset_id
            ));
        }
        let row = entry.into_entry(Uuid::new_v4());
        tables.entries.push(row.clone());
        Ok(row)
    }

    async fn list_entries(&self, dataset_id: Uuid) -> Result<Vec<Entry>> {
        Ok(self
            .tables
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.dataset_id == dataset_id)
            .cloned()
            .collect())
    }

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>> {
        Ok(self
            .tables
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .cloned())
    }
}
