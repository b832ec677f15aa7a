//! File-level processing for ingestion
//!
//! Everything here is synchronous and filesystem-bound. Callers on an async
//! runtime run these functions under `tokio::task::spawn_blocking`.

pub mod archive;
pub mod classify;
pub mod detect;
pub mod metadata;

pub use archive::{extract, ArchiveError, ArchiveFormat};
pub use classify::{classify, Classification};
pub use detect::detect_content_type;
pub use metadata::dimensions;
