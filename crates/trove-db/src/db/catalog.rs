use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use trove_core::models::{Dataset, Entry, NewEntry};

use crate::traits::CatalogStore;

/// Datasets and their entries.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    #[tracing::instrument(skip(self, dataset), fields(dataset_id = %dataset.id))]
    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        let created: Dataset = sqlx::query_as::<Postgres, Dataset>(
            r#"
            INSERT INTO datasets (id, name, source_path, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, source_path, created_at
            "#,
        )
        .bind(dataset.id)
        .bind(&dataset.name)
        .bind(&dataset.source_path)
        .bind(dataset.created_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert dataset")?;

        tracing::info!(dataset_id = %created.id, name = %created.name, "Dataset created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn get_dataset(&self, dataset_id: Uuid) -> Result<Option<Dataset>> {
        sqlx::query_as::<Postgres, Dataset>(
            "SELECT id, name, source_path, created_at FROM datasets WHERE id = $1",
        )
        .bind(dataset_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch dataset")
    }

    #[tracing::instrument(skip(self))]
    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        sqlx::query_as::<Postgres, Dataset>(
            "SELECT id, name, source_path, created_at FROM datasets ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list datasets")
    }

    #[tracing::instrument(skip(self))]
    async fn delete_dataset(&self, dataset_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(dataset_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete dataset")?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, entry), fields(dataset_id = %entry.dataset_id, filename = %entry.filename))]
    async fn insert_entry(&self, entry: NewEntry) -> Result<Entry> {
        let row = entry.into_entry(Uuid::new_v4());

        let inserted: Entry = sqlx::query_as::<Postgres, Entry>(
            r#"
            INSERT INTO entries (id, dataset_id, filename, path, width, height, content_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, dataset_id, filename, path, width, height, content_type
            "#,
        )
        .bind(row.id)
        .bind(row.dataset_id)
        .bind(&row.filename)
        .bind(&row.path)
        .bind(row.width)
        .bind(row.height)
        .bind(&row.content_type)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to insert entry {}", row.path))?;

        Ok(inserted)
    }

    #[tracing::instrument(skip(self))]
    async fn list_entries(&self, dataset_id: Uuid) -> Result<Vec<Entry>> {
        sqlx::query_as::<Postgres, Entry>(
            r#"
            SELECT id, dataset_id, filename, path, width, height, content_type
            FROM entries
            WHERE dataset_id = $1
            ORDER BY path
            "#,
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries")
    }

    #[tracing::instrument(skip(self))]
    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>> {
        sqlx::query_as::<Postgres, Entry>(
            r#"
            SELECT id, dataset_id, filename, path, width, height, content_type
            FROM entries
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch entry")
    }
}
