//! Surface dimensions, rectangles and pixel formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel layouts understood by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit BGRA, unsigned normalized. The browser compositor's native layout.
    #[default]
    Bgra8Unorm,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8Unorm => 4,
        }
    }
}

/// Width and height of an overlay surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by this size.
    #[must_use]
    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Number of bytes a tightly packed buffer of this size occupies.
    #[must_use]
    pub fn byte_len(self, format: PixelFormat) -> usize {
        self.pixel_count() * format.bytes_per_pixel()
    }

    /// Bytes per row for a tightly packed buffer.
    #[must_use]
    pub fn row_pitch(self, format: PixelFormat) -> usize {
        (self.width as usize) * format.bytes_per_pixel()
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for SurfaceSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A rectangle in view coordinates.
///
/// Used both for the view rect reported to the browser and for the dirty
/// rectangles it attaches to paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ViewRect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin covering `size`.
    #[must_use]
    pub const fn from_size(size: SurfaceSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Size of the rectangle.
    #[must_use]
    pub const fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// True if this rectangle covers the whole of `size` starting at the origin.
    #[must_use]
    pub fn covers(&self, size: SurfaceSize) -> bool {
        self.x <= 0
            && self.y <= 0
            && i64::from(self.x) + i64::from(self.width) >= i64::from(size.width)
            && i64::from(self.y) + i64::from(self.height) >= i64::from(size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len_bgra() {
        let size = SurfaceSize::new(800, 600);
        assert_eq!(size.pixel_count(), 480_000);
        assert_eq!(size.byte_len(PixelFormat::Bgra8Unorm), 1_920_000);
        assert_eq!(size.row_pitch(PixelFormat::Bgra8Unorm), 3200);
    }

    #[test]
    fn test_empty_size() {
        assert!(SurfaceSize::new(0, 600).is_empty());
        assert!(SurfaceSize::new(800, 0).is_empty());
        assert!(!SurfaceSize::new(1, 1).is_empty());
        assert!(SurfaceSize::default().is_empty());
    }

    #[test]
    fn test_view_rect_from_size() {
        let rect = ViewRect::from_size(SurfaceSize::new(1024, 768));
        assert_eq!(rect, ViewRect::new(0, 0, 1024, 768));
        assert_eq!(rect.size(), SurfaceSize::new(1024, 768));
    }

    #[test]
    fn test_view_rect_covers() {
        let size = SurfaceSize::new(100, 50);
        assert!(ViewRect::new(0, 0, 100, 50).covers(size));
        assert!(ViewRect::new(-10, 0, 120, 60).covers(size));
        assert!(!ViewRect::new(1, 0, 100, 50).covers(size));
        assert!(!ViewRect::new(0, 0, 99, 50).covers(size));
    }

    #[test]
    fn test_display() {
        assert_eq!(SurfaceSize::new(1920, 1080).to_string(), "1920x1080");
    }
}
