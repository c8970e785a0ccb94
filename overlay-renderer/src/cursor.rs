//! Cursor asset loading.
//!
//! The cursor is tried as PNG first, then DDS. Files are decoded by content
//! rather than extension, and converted from RGBA to the overlay's BGRA
//! layout.

use std::path::Path;

use image::ImageReader;
use overlay_core::{CursorImage, OverlayConfig};

use crate::{RenderError, RenderResult};

/// Load a cursor image from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_cursor_image(path: &Path) -> RenderResult<CursorImage> {
    let image = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))?
        .decode()
        .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))?;

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    to_cursor(width, height, rgba.into_raw())
}

/// Decode a cursor image from encoded bytes.
///
/// # Errors
///
/// Returns an error if the data cannot be decoded.
pub fn load_cursor_from_memory(data: &[u8]) -> RenderResult<CursorImage> {
    let rgba = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode cursor: {e}")))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    to_cursor(width, height, rgba.into_raw())
}

/// Load the configured cursor, trying each path in order.
///
/// Returns `None` if no candidate loads; the overlay then draws without a
/// cursor.
#[must_use]
pub fn load_cursor(config: &OverlayConfig) -> Option<CursorImage> {
    for path in config.cursor_paths() {
        match load_cursor_image(path) {
            Ok(cursor) => {
                tracing::info!(path = %path.display(), size = %cursor.size(), "Cursor loaded");
                return Some(cursor);
            }
            Err(e) => tracing::debug!("Cursor candidate skipped: {e}"),
        }
    }

    tracing::warn!("No cursor image could be loaded");
    None
}

fn to_cursor(width: u32, height: u32, mut pixels: Vec<u8>) -> RenderResult<CursorImage> {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    Ok(CursorImage::new(width, height, pixels)?)
}
