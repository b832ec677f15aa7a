use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Work descriptor handed from the submission handler to exactly one executor.
///
/// Carries the archive location and original filename as typed fields so the
/// worker never has to recover them from a task's display message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestJob {
    pub task_id: Uuid,
    pub archive_location: PathBuf,
    pub original_filename: String,
    pub dataset_name: String,
}
