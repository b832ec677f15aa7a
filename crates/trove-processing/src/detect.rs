//! Content-type detection from file signatures

use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_LEN: u64 = 8192;

/// Detect a file's content type from its leading bytes.
///
/// Returns `None` when the file cannot be read or is empty; callers treat
/// that as "indeterminate", not as a rejection.
pub fn detect_content_type(path: &Path) -> Option<String> {
    let mut head = Vec::new();
    match File::open(path).and_then(|f| f.take(SNIFF_LEN).read_to_end(&mut head)) {
        Ok(_) => sniff(&head).map(str::to_string),
        Err(e) => {
            tracing::debug!(error = %e, path = %path.display(), "Content-type detection failed");
            None
        }
    }
}

/// Map leading bytes to a MIME type.
pub fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.is_empty() {
        return None;
    }

    if let Ok(format) = image::guess_format(data) {
        return Some(format.to_mime_type());
    }

    // ISO base media (MP4, QuickTime, HEIF)
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return Some(match &data[8..12] {
            b"qt  " => "video/quicktime",
            b"heic" | b"heix" | b"mif1" | b"msf1" => "image/heic",
            _ => "video/mp4",
        });
    }

    // EBML header: Matroska or WebM
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        let head = &data[..data.len().min(64)];
        if head.windows(4).any(|w| w == b"webm") {
            return Some("video/webm");
        }
        return Some("video/x-matroska");
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"AVI " {
        return Some("video/x-msvideo");
    }

    if data.starts_with(b"PK\x03\x04") {
        return Some("application/zip");
    }

    if data.starts_with(b"%PDF") {
        return Some("application/pdf");
    }

    if is_text(data) {
        return Some("text/plain");
    }

    Some("application/octet-stream")
}

/// UTF-8 without control characters other than common whitespace. A
/// multi-byte sequence cut off at the end of the sample still counts.
fn is_text(data: &[u8]) -> bool {
    let valid = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&data[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    valid
        .chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t' | '\x0c'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sniff_images() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("image/jpeg"));
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(sniff(b"GIF89a......"), Some("image/gif"));
    }

    #[test]
    fn test_sniff_video() {
        assert_eq!(sniff(b"\x00\x00\x00\x18ftypisom\x00\x00"), Some("video/mp4"));
        assert_eq!(sniff(b"\x00\x00\x00\x14ftypqt  \x00\x00"), Some("video/quicktime"));
        assert_eq!(
            sniff(b"\x1A\x45\xDF\xA3\x9F\x42\x86\x81\x01\x42\x82\x84webm"),
            Some("video/webm")
        );
        assert_eq!(sniff(b"RIFF\x00\x00\x00\x00AVI LIST"), Some("video/x-msvideo"));
    }

    #[test]
    fn test_sniff_text_and_binary() {
        assert_eq!(sniff(b"hello world\n"), Some("text/plain"));
        assert_eq!(sniff("héllo".as_bytes()), Some("text/plain"));
        // trailing partial UTF-8 sequence
        assert_eq!(sniff(&[b'a', b'b', 0xC3]), Some("text/plain"));
        assert_eq!(sniff(&[0x00, 0x01, 0x02, 0xFF]), Some("application/octet-stream"));
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn missing_file_is_indeterminate() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_content_type(&dir.path().join("absent")), None);

        let path = dir.path().join("c.txt");
        std::fs::write(&path, b"plain words").unwrap();
        assert_eq!(detect_content_type(&path).as_deref(), Some("text/plain"));
    }
}
