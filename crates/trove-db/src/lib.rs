//! Trove persistence layer
//!
//! Two seams, [`TaskStore`] and [`CatalogStore`], with a PostgreSQL
//! implementation (sqlx) and an in-memory one. Every write is its own commit:
//! pollers observe task progress as it happens, and a catalog survives a
//! failure part-way through a run.

pub mod db;
pub mod memory;
pub mod traits;

pub use db::{connect, run_migrations, CatalogRepository, TaskRepository};
pub use memory::MemoryStore;
pub use sqlx::PgPool;
pub use traits::{CatalogStore, StoreHandle, TaskStore};
