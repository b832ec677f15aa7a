//! PostgreSQL repositories
//!
//! Queries are built at runtime with `query_as` and the hand-written
//! `FromRow` impls in `trove-core`, so no database is needed at compile time.

pub mod catalog;
pub mod task;

pub use catalog::CatalogRepository;
pub use task::TaskRepository;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Open a connection pool.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    timeout_seconds: u64,
) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_seconds))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "Database pool established");
    Ok(pool)
}

/// Create or upgrade the `datasets`, `entries` and `tasks` tables.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
