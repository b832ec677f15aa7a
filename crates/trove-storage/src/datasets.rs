use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// One storage root per dataset under a common base directory.
#[derive(Clone, Debug)]
pub struct DatasetStorage {
    base_path: PathBuf,
}

impl DatasetStorage {
    /// Create the base directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create dataset directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory that holds every extracted file of `dataset_id`.
    pub fn dataset_root(&self, dataset_id: Uuid) -> PathBuf {
        self.base_path.join(dataset_id.to_string())
    }

    /// Resolve an entry path against its dataset root.
    ///
    /// Rejects absolute paths and any `..` component so a stored path can
    /// never address a file outside the dataset.
    pub fn resolve(&self, dataset_id: Uuid, relative_path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(relative_path);
        if relative_path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(format!(
                "{} is not a relative path inside the dataset",
                relative_path
            )));
        }

        Ok(self.dataset_root(dataset_id).join(relative))
    }

    /// Read the bytes of one extracted file.
    pub async fn read(&self, dataset_id: Uuid, relative_path: &str) -> StorageResult<Bytes> {
        let path = self.resolve(dataset_id, relative_path)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    /// Remove a dataset's storage root. Missing roots are not an error.
    pub async fn remove_dataset(&self, dataset_id: Uuid) -> StorageResult<()> {
        let root = self.dataset_root(dataset_id);
        match fs::remove_dir_all(&root).await {
            Ok(()) => {
                tracing::info!(dataset_id = %dataset_id, path = %root.display(), "Removed dataset storage");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}
