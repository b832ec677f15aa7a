use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pixel dimensions of a raster image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// One cataloged file belonging to a dataset.
///
/// `width` and `height` are either both set or both absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub filename: String,
    /// Path relative to the dataset's storage root, `/`-separated.
    pub path: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Detected content type; `None` when detection failed.
    pub content_type: Option<String>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Entry {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Entry {
            id: row.try_get("id")?,
            dataset_id: row.try_get("dataset_id")?,
            filename: row.try_get("filename")?,
            path: row.try_get("path")?,
            width: row.try_get("width")?,
            height: row.try_get("height")?,
            content_type: row.try_get("content_type")?,
        })
    }
}

impl Entry {
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Dimensions {
                width: w as u32,
                height: h as u32,
            }),
            _ => None,
        }
    }
}

/// Insert payload for a cataloged file. Dimensions travel as one value so a
/// half-populated pair cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub dataset_id: Uuid,
    pub filename: String,
    pub path: String,
    pub dimensions: Option<Dimensions>,
    pub content_type: Option<String>,
}

impl NewEntry {
    pub fn into_entry(self, id: Uuid) -> Entry {
        let (width, height) = match self.dimensions {
            Some(d) => (Some(d.width as i32), Some(d.height as i32)),
            None => (None, None),
        };
        Entry {
            id,
            dataset_id: self.dataset_id,
            filename: self.filename,
            path: self.path,
            width,
            height,
            content_type: self.content_type,
        }
    }
}
