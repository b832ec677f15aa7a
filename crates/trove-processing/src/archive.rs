//! Archive extraction
//!
//! Zip is the one supported container. Other recognizable archive formats
//! are rejected up front without touching the destination.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use trove_core::config::ExtractionLimits;
use trove_core::IngestError;
use zip::ZipArchive;

/// Bytes read from the head of a file when sniffing its format.
const MAGIC_LEN: usize = 262;

/// Archive formats recognized by extension or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Gzip,
    Bzip2,
    Xz,
    Rar,
    SevenZip,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Gzip => "gz",
            ArchiveFormat::Bzip2 => "bz2",
            ArchiveFormat::Xz => "xz",
            ArchiveFormat::Rar => "rar",
            ArchiveFormat::SevenZip => "7z",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, ArchiveFormat::Zip)
    }

    /// Recognize a format from a filename's extension. Compound tar
    /// extensions are matched before their single-suffix forms.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        const COMPOUND: [(&str, ArchiveFormat); 6] = [
            (".tar.gz", ArchiveFormat::TarGz),
            (".tgz", ArchiveFormat::TarGz),
            (".tar.bz2", ArchiveFormat::TarBz2),
            (".tbz2", ArchiveFormat::TarBz2),
            (".tar.xz", ArchiveFormat::TarXz),
            (".txz", ArchiveFormat::TarXz),
        ];
        if let Some((_, format)) = COMPOUND.iter().find(|(suffix, _)| lower.ends_with(suffix)) {
            return Some(*format);
        }

        let ext = Path::new(&lower).extension()?.to_str()?.to_string();
        ext.parse().ok()
    }

    /// Recognize a format from leading file bytes.
    pub fn from_magic(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
            Some(ArchiveFormat::Zip)
        } else if data.starts_with(b"Rar!\x1a\x07") {
            Some(ArchiveFormat::Rar)
        } else if data.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
            Some(ArchiveFormat::SevenZip)
        } else if data.starts_with(&[0x1F, 0x8B]) {
            Some(ArchiveFormat::Gzip)
        } else if data.starts_with(b"BZh") {
            Some(ArchiveFormat::Bzip2)
        } else if data.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(ArchiveFormat::Xz)
        } else if data.len() >= 262 && &data[257..262] == b"ustar" {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    /// Extension first, then file signature.
    pub fn detect(original_filename: &str, archive_path: &Path) -> Result<Self, ArchiveError> {
        if let Some(format) = Self::from_filename(original_filename) {
            return Ok(format);
        }

        let mut head = Vec::with_capacity(MAGIC_LEN);
        File::open(archive_path)?
            .take(MAGIC_LEN as u64)
            .read_to_end(&mut head)?;

        Self::from_magic(&head).ok_or_else(|| {
            ArchiveError::Unsupported(format!(
                "{} is not a recognized archive",
                original_filename
            ))
        })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tgz" | "tar.gz" => Ok(ArchiveFormat::TarGz),
            "tbz2" | "tar.bz2" => Ok(ArchiveFormat::TarBz2),
            "txz" | "tar.xz" => Ok(ArchiveFormat::TarXz),
            "gz" => Ok(ArchiveFormat::Gzip),
            "bz2" => Ok(ArchiveFormat::Bzip2),
            "xz" => Ok(ArchiveFormat::Xz),
            "rar" => Ok(ArchiveFormat::Rar),
            "7z" => Ok(ArchiveFormat::SevenZip),
            _ => Err(ArchiveError::Unsupported(format!("unknown archive type '{}'", s))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("{0}")]
    Unsupported(String),

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("entry '{0}' would be written outside the destination")]
    PathTraversal(String),

    #[error("archive exceeds limit: {0}")]
    LimitExceeded(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::Corrupt(err.to_string())
    }
}

impl From<ArchiveError> for IngestError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Unsupported(msg) => IngestError::UnsupportedFormat(msg),
            other => IngestError::Extraction(other.to_string()),
        }
    }
}

/// Unpack `archive_path` into `destination` and return the extracted file
/// paths relative to it, `/`-separated, in archive order.
///
/// `original_filename` is the name the archive was submitted under; its
/// extension decides the format. If extraction fails after `destination` was
/// created here, the directory is removed again.
pub fn extract(
    archive_path: &Path,
    original_filename: &str,
    destination: &Path,
    limits: &ExtractionLimits,
) -> Result<Vec<String>, ArchiveError> {
    let format = ArchiveFormat::detect(original_filename, archive_path)?;
    if !format.is_supported() {
        return Err(ArchiveError::Unsupported(format!(
            "{} archives are not supported, only zip",
            format
        )));
    }

    let existed = destination.exists();
    let result = extract_zip(archive_path, destination, limits);

    if result.is_err() && !existed && destination.exists() {
        if let Err(e) = fs::remove_dir_all(destination) {
            tracing::warn!(
                error = %e,
                destination = %destination.display(),
                "Failed to remove partially extracted archive"
            );
        }
    }

    result
}

fn extract_zip(
    archive_path: &Path,
    destination: &Path,
    limits: &ExtractionLimits,
) -> Result<Vec<String>, ArchiveError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    if archive.len() > limits.max_entries {
        return Err(ArchiveError::LimitExceeded(format!(
            "{} entries, at most {} allowed",
            archive.len(),
            limits.max_entries
        )));
    }

    // Validate every entry before writing anything.
    let mut declared_total: u64 = 0;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.enclosed_name().is_none() {
            return Err(ArchiveError::PathTraversal(entry.name().to_string()));
        }
        declared_total = declared_total.saturating_add(entry.size());
        if declared_total > limits.max_total_bytes {
            return Err(ArchiveError::LimitExceeded(format!(
                "more than {} uncompressed bytes",
                limits.max_total_bytes
            )));
        }
    }

    fs::create_dir_all(destination)?;

    let mut extracted = Vec::new();
    let mut seen = HashSet::new();
    let mut written: u64 = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .map(normalize)
            .ok_or_else(|| ArchiveError::PathTraversal(name.clone()))?;
        let target = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // Declared sizes can lie; cap what is actually inflated.
        let remaining = limits.max_total_bytes - written;
        let mut out = File::create(&target)?;
        let copied = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)
            .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", name, e)))?;
        if copied > remaining {
            return Err(ArchiveError::LimitExceeded(format!(
                "more than {} uncompressed bytes",
                limits.max_total_bytes
            )));
        }
        written += copied;

        let relative = relative_string(&relative);
        if seen.insert(relative.clone()) {
            extracted.push(relative);
        }
    }

    tracing::debug!(
        files = extracted.len(),
        bytes = written,
        destination = %destination.display(),
        "Archive extracted"
    );

    Ok(extracted)
}

/// Resolve `.` and `..` lexically. Input has already passed `enclosed_name`,
/// so `..` never climbs above the root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            _ => {}
        }
    }
    normalized
}

fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = FileOptions::default();
        for (name, data) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(ArchiveFormat::from_filename("photos.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_filename("photos.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("photos.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("photos.rar"), Some(ArchiveFormat::Rar));
        assert_eq!(ArchiveFormat::from_filename("photos.7z"), Some(ArchiveFormat::SevenZip));
        assert_eq!(ArchiveFormat::from_filename("photos.docx"), None);
        assert_eq!(ArchiveFormat::from_filename("photos"), None);
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(ArchiveFormat::from_magic(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_magic(b"Rar!\x1a\x07\x00"), Some(ArchiveFormat::Rar));
        assert_eq!(ArchiveFormat::from_magic(&[0x1F, 0x8B, 0x08]), Some(ArchiveFormat::Gzip));
        assert_eq!(ArchiveFormat::from_magic(b"hello"), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("ZIP".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!(".rar".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Rar);
        assert!("docx".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn extracts_nested_files() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload.zip");
        write_zip(
            &archive,
            &[
                ("a.jpg", b"not really a jpeg"),
                ("docs/", b""),
                ("docs/c.txt", b"hello"),
            ],
        );

        let dest = dir.path().join("out");
        let files = extract(&archive, "photos.zip", &dest, &ExtractionLimits::default()).unwrap();

        assert_eq!(files, vec!["a.jpg".to_string(), "docs/c.txt".to_string()]);
        assert_eq!(fs::read(dest.join("docs/c.txt")).unwrap(), b"hello");
    }

    #[test]
    fn detects_zip_without_extension() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("blob");
        write_zip(&archive, &[("c.txt", b"hello")]);

        let dest = dir.path().join("out");
        let files = extract(&archive, "upload", &dest, &ExtractionLimits::default()).unwrap();
        assert_eq!(files, vec!["c.txt".to_string()]);
    }

    #[test]
    fn rar_is_declared_unsupported() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload.rar");
        fs::write(&archive, b"Rar!\x1a\x07\x00garbage").unwrap();

        let dest = dir.path().join("out");
        let err = extract(&archive, "photos.rar", &dest, &ExtractionLimits::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported(ref m) if m.contains("rar")));
        assert!(!dest.exists());
        assert!(matches!(IngestError::from(err), IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn unknown_content_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload");
        fs::write(&archive, b"just some text").unwrap();

        let err = extract(
            &archive,
            "notes.docx",
            &dir.path().join("out"),
            &ExtractionLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported(_)));
    }

    #[test]
    fn corrupt_zip_fails_and_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload.zip");
        write_zip(&archive, &[("a.txt", b"hello world")]);
        let bytes = fs::read(&archive).unwrap();
        fs::write(&archive, &bytes[..bytes.len() / 2]).unwrap();

        let dest = dir.path().join("out");
        let err = extract(&archive, "photos.zip", &dest, &ExtractionLimits::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt(_)));
        assert!(!dest.exists());
        assert!(matches!(IngestError::from(err), IngestError::Extraction(_)));
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload.zip");
        write_zip(&archive, &[("ok.txt", b"fine"), ("../evil.txt", b"escape")]);

        let dest = dir.path().join("out");
        let err = extract(&archive, "photos.zip", &dest, &ExtractionLimits::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::PathTraversal(ref name) if name == "../evil.txt"));
        assert!(!dir.path().join("evil.txt").exists());
        assert!(!dest.exists());
    }

    #[test]
    fn enforces_entry_and_byte_limits() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("upload.zip");
        write_zip(&archive, &[("a.txt", b"0123456789"), ("b.txt", b"0123456789")]);

        let few_entries = ExtractionLimits {
            max_total_bytes: 1024,
            max_entries: 1,
        };
        let err = extract(&archive, "x.zip", &dir.path().join("one"), &few_entries).unwrap_err();
        assert!(matches!(err, ArchiveError::LimitExceeded(_)));

        let few_bytes = ExtractionLimits {
            max_total_bytes: 15,
            max_entries: 10,
        };
        let err = extract(&archive, "x.zip", &dir.path().join("two"), &few_bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::LimitExceeded(_)));
        assert!(!dir.path().join("two").exists());
    }
}
