//! Trove Core Library
//!
//! Domain models, the ingestion error taxonomy and configuration shared by
//! every trove crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::TroveConfig;
pub use error::{CatalogError, IngestError};
