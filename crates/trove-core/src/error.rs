//! Error types module
//!
//! `IngestError` is the stage-level taxonomy of the ingestion pipeline: every
//! variant aborts a run and is recorded verbatim in the task's message,
//! except `AlreadyClaimed`, which means the task belongs to another run.
//! Per-file outcomes (a rejected file, an image whose dimensions cannot be
//! read) are not errors and never appear here.
//!
//! `CatalogError` covers the read side exposed to the query layer.

use std::path::PathBuf;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like lookups of unknown ids
    Debug,
    /// Warning level - for failures caused by the submitted input
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to callers.
pub trait ErrorMetadata {
    /// HTTP-equivalent status code
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNSUPPORTED_FORMAT")
    fn error_code(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Source archive not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("Cleanup failed for {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Task {0} has already been picked up")]
    AlreadyClaimed(Uuid),
}

impl IngestError {
    /// A cleanup failure leaves the catalog valid even though the task fails.
    pub fn is_cleanup_only(&self) -> bool {
        matches!(self, IngestError::Cleanup { .. })
    }
}

impl ErrorMetadata for IngestError {
    fn http_status_code(&self) -> u16 {
        match self {
            IngestError::SourceMissing(_) => 410,
            IngestError::UnsupportedFormat(_) => 415,
            IngestError::Extraction(_) => 422,
            IngestError::AlreadyClaimed(_) => 409,
            IngestError::Persistence(_) | IngestError::Cleanup { .. } | IngestError::Internal(_) => {
                500
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            IngestError::SourceMissing(_) => "SOURCE_MISSING",
            IngestError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            IngestError::Extraction(_) => "EXTRACTION_ERROR",
            IngestError::Persistence(_) => "PERSISTENCE_ERROR",
            IngestError::Cleanup { .. } => "CLEANUP_ERROR",
            IngestError::Internal(_) => "INTERNAL_ERROR",
            IngestError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            IngestError::UnsupportedFormat(_)
            | IngestError::Extraction(_)
            | IngestError::AlreadyClaimed(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorMetadata for CatalogError {
    fn http_status_code(&self) -> u16 {
        match self {
            CatalogError::NotFound(_) => 404,
            CatalogError::Database(_) | CatalogError::Io(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "NOT_FOUND",
            CatalogError::Database(_) => "DATABASE_ERROR",
            CatalogError::Io(_) => "IO_ERROR",
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            CatalogError::NotFound(_) => LogLevel::Debug,
            _ => LogLevel::Error,
        }
    }
}
