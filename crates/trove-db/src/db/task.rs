use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use trove_core::models::{Task, TaskStatus, TaskUpdate};

use crate::traits::TaskStore;

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    #[tracing::instrument(skip(self, initial_message))]
    async fn create(&self, kind: &str, initial_message: &str) -> Result<Task> {
        let pending = Task::pending(kind, initial_message);

        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            INSERT INTO tasks (id, kind, status, progress, message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, kind, status, progress, message, created_at, updated_at
            "#,
        )
        .bind(pending.id)
        .bind(&pending.kind)
        .bind(pending.status.as_str())
        .bind(pending.progress)
        .bind(&pending.message)
        .bind(pending.created_at)
        .bind(pending.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, kind = %kind, "Failed to insert task into database");
            anyhow::anyhow!("Failed to insert task into database: {}", e)
        })?;

        tracing::info!(task_id = %task.id, kind = %kind, "Task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self, update), fields(status = %update.status, progress = update.progress))]
    async fn advance(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Task> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = $2, progress = $3, message = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, kind, status, progress, message, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(update.status.as_str())
        .bind(update.progress)
        .bind(&update.message)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update task")?;

        task.ok_or_else(|| anyhow::anyhow!("Task {} not found", task_id))
    }

    #[tracing::instrument(skip(self, update), fields(progress = update.progress))]
    async fn claim(&self, task_id: Uuid, update: &TaskUpdate) -> Result<Option<Task>> {
        let claimed: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = $2, progress = $3, message = $4, updated_at = NOW()
            WHERE id = $1 AND status = $5
            RETURNING id, kind, status, progress, message, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(update.status.as_str())
        .bind(update.progress)
        .bind(&update.message)
        .bind(TaskStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim task")?;

        if claimed.is_some() {
            return Ok(claimed);
        }
        match self.get(task_id).await? {
            Some(_) => Ok(None),
            None => Err(anyhow::anyhow!("Task {} not found", task_id)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, task_id: Uuid) -> Result<Option<Task>> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT id, kind, status, progress, message, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch task")?;

        Ok(task)
    }
}
