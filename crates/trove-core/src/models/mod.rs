pub mod dataset;
pub mod entry;
pub mod job;
pub mod task;

pub use dataset::{Dataset, DatasetResponse};
pub use entry::{Dimensions, Entry, NewEntry};
pub use job::IngestJob;
pub use task::{Task, TaskResponse, TaskStatus, TaskUpdate};
