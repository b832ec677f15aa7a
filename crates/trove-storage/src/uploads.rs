use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Strip any directory components from a client-supplied filename.
pub fn sanitize_filename(filename: &str, fallback: &str) -> String {
    // Treat backslashes as separators too; uploads come from any client OS.
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Staging directory for uploaded archives awaiting ingestion.
#[derive(Clone, Debug)]
pub struct UploadArea {
    base_path: PathBuf,
}

impl UploadArea {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn staged_path(&self, original_filename: &str) -> PathBuf {
        let id = Uuid::new_v4();
        let safe = sanitize_filename(original_filename, &format!("upload_{}", id));
        self.base_path.join(format!("{}_{}", id, safe))
    }

    /// Write uploaded bytes to a fresh staging file and return its location.
    pub async fn stage(&self, original_filename: &str, data: &[u8]) -> StorageResult<PathBuf> {
        let path = self.staged_path(original_filename);

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        tracing::info!(path = %path.display(), size = data.len(), "Upload staged");
        Ok(path)
    }

    /// Copy an existing file into the staging area; the source is left untouched.
    pub async fn stage_file(&self, source: &Path) -> StorageResult<PathBuf> {
        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let path = self.staged_path(original);

        match fs::copy(source, &path).await {
            Ok(size) => {
                tracing::info!(path = %path.display(), size, "Upload staged");
                Ok(path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(source.display().to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}
