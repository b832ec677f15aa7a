//! Shared constants.

/// Task kind recorded for archive ingestion runs.
pub const INGEST_TASK_KIND: &str = "process_dataset_upload";

/// Message stored on a freshly submitted ingestion task.
pub const QUEUED_MESSAGE: &str = "Upload received, queued for processing";

/// Sub-directory of the data dir holding one storage root per dataset.
pub const DATASETS_DIR: &str = "datasets";

/// Sub-directory of the data dir holding staged uploads.
pub const UPLOADS_DIR: &str = "uploads";
