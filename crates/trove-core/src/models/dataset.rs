use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named collection of cataloged files produced from one archive ingestion.
///
/// The identifier is assigned when unpacking starts, not at upload time; it
/// also names the dataset's storage root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    /// Location of the archive the dataset was unpacked from.
    pub source_path: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Dataset {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Dataset {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            source_path: row.try_get("source_path")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Dataset {
    pub fn new(id: Uuid, name: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_path: source_path.into(),
            created_at: Utc::now(),
        }
    }
}

/// Listing shape exposed to the query layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Dataset> for DatasetResponse {
    fn from(dataset: Dataset) -> Self {
        Self {
            id: dataset.id,
            name: dataset.name,
        }
    }
}
