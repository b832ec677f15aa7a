//! Classification policy
//!
//! Pure decision over a file name and its detected content type. No I/O.

use std::path::Path;

const ACCEPTED_TYPE_PREFIXES: [&str; 2] = ["image/", "video/"];
const ACCEPTED_TYPES: [&str; 1] = ["text/plain"];
const ACCEPTED_EXTENSIONS: [&str; 13] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "mp4", "avi", "mov", "mkv", "webm", "txt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Catalog the file. Dimensions are read only when `is_image`.
    Accept { is_image: bool },
    /// Skip the file silently.
    Reject,
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accept { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Classification::Accept { is_image: true })
    }
}

/// Accept when the detected type is allow-listed or the extension is.
///
/// `is_image` follows the detected type alone: a `.jpg` whose content is not
/// an image is still cataloged, without dimensions.
pub fn classify(file_name: &str, detected_content_type: Option<&str>) -> Classification {
    let detected = detected_content_type.map(|t| t.trim().to_ascii_lowercase());

    let type_accepted = detected.as_deref().is_some_and(|t| {
        ACCEPTED_TYPE_PREFIXES.iter().any(|p| t.starts_with(p)) || ACCEPTED_TYPES.contains(&t)
    });

    let extension_accepted = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str()));

    if type_accepted || extension_accepted {
        Classification::Accept {
            is_image: detected.as_deref().is_some_and(|t| t.starts_with("image/")),
        }
    } else {
        Classification::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_by_detected_type() {
        assert_eq!(
            classify("photo.dat", Some("image/png")),
            Classification::Accept { is_image: true }
        );
        assert_eq!(
            classify("clip", Some("video/mp4")),
            Classification::Accept { is_image: false }
        );
        assert_eq!(
            classify("README", Some("text/plain")),
            Classification::Accept { is_image: false }
        );
    }

    #[test]
    fn test_accept_by_extension() {
        assert_eq!(
            classify("photo.JPG", Some("application/octet-stream")),
            Classification::Accept { is_image: false }
        );
        assert_eq!(
            classify("nested/dir/movie.mkv", None),
            Classification::Accept { is_image: false }
        );
    }

    #[test]
    fn test_reject() {
        assert_eq!(classify("b.bin", Some("application/octet-stream")), Classification::Reject);
        assert_eq!(classify("b.bin", None), Classification::Reject);
        // text/html is not text/plain
        assert_eq!(classify("index.html", Some("text/html")), Classification::Reject);
    }

    #[test]
    fn test_image_requires_detected_type() {
        let c = classify("a.jpg", None);
        assert!(c.is_accepted());
        assert!(!c.is_image());
        assert!(classify("a.jpg", Some("image/jpeg")).is_image());
    }
}
