use std::path::Path;

use image::ImageReader;
use trove_core::models::Dimensions;

/// Read pixel dimensions from an image's header.
///
/// Any failure yields `None`; a file without dimensions is still cataloged.
pub fn dimensions(path: &Path) -> Option<Dimensions> {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::debug!(error = %e, path = %path.display(), "Failed to open image");
            return None;
        }
    };

    match reader.into_dimensions() {
        Ok((width, height))
            if width > 0
                && height > 0
                && width <= i32::MAX as u32
                && height <= i32::MAX as u32 =>
        {
            Some(Dimensions { width, height })
        }
        Ok((width, height)) => {
            tracing::debug!(width, height, path = %path.display(), "Ignoring out-of-range dimensions");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %path.display(), "Failed to read image dimensions");
            None
        }
    }
}
