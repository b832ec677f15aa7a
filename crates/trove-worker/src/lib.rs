//! Ingestion worker
//!
//! The pipeline turns one uploaded archive into a dataset, the queue hands
//! jobs to a bounded pool of executors, and the catalog service answers the
//! read-side queries a front end needs.

pub mod catalog;
pub mod context;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod submit;
pub mod telemetry;

pub use catalog::{CatalogService, EntryContent};
pub use context::{IngestHandler, RemoveSourceFile, SourceCleanup};
pub use pipeline::{IngestOutcome, IngestPipeline, IngestStage};
pub use progress::ProgressReporter;
pub use queue::{IngestQueue, IngestQueueConfig};
pub use submit::IngestSubmitter;
