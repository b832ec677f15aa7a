//! Trove Storage Library
//!
//! Local filesystem layout for ingestion:
//!
//! - **Dataset roots**: `{data_dir}/datasets/{dataset_id}/...`, holding the
//!   extracted files exactly as they were nested in the archive.
//! - **Upload staging**: `{data_dir}/uploads/{uuid}_{filename}`, one file per
//!   submitted archive, owned by its task until the run finalizes.
//!
//! Relative paths must not contain `..` or a leading `/`.

pub mod datasets;
pub mod error;
pub mod uploads;

pub use datasets::DatasetStorage;
pub use error::{StorageError, StorageResult};
pub use uploads::{sanitize_filename, UploadArea};
