//! GPU backend abstraction.
//!
//! The handoff protocol never talks to a graphics API directly. A backend owns
//! the output device and its primary (render-thread) context; the store asks it
//! to allocate textures and views, and the render thread asks it to execute
//! drained writes.

use std::sync::Arc;

use crate::error::OverlayResult;
use crate::geometry::{PixelFormat, SurfaceSize};

/// How a texture will be used once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Rewritten every paint; CPU-writable, GPU-readable.
    Dynamic,
    /// Written once after creation, then only sampled.
    Static,
}

/// Parameters for a texture allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label passed to the graphics API.
    pub label: &'static str,
    /// Dimensions in pixels.
    pub size: SurfaceSize,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Intended usage.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Descriptor for the shared browser surface.
    #[must_use]
    pub const fn shared_surface(size: SurfaceSize) -> Self {
        Self {
            label: "overlay_shared_surface",
            size,
            format: PixelFormat::Bgra8Unorm,
            usage: TextureUsage::Dynamic,
        }
    }

    /// Descriptor for the cursor sprite.
    #[must_use]
    pub const fn cursor(size: SurfaceSize) -> Self {
        Self {
            label: "overlay_cursor",
            size,
            format: PixelFormat::Bgra8Unorm,
            usage: TextureUsage::Static,
        }
    }
}

/// A device capable of backing the overlay.
///
/// Implementations must be shareable between the browser and render threads.
/// Texture and view handles are wrapped in [`Arc`] by the store so that a view
/// borrowed for drawing stays alive even if the store replaces it mid-frame.
pub trait OverlayBackend: Send + Sync + 'static {
    /// GPU texture handle.
    type Texture: Send + Sync + 'static;

    /// Read-only view over a texture, suitable for sampling.
    type View: Send + Sync + 'static;

    /// Allocate a texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot allocate the texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> OverlayResult<Self::Texture>;

    /// Create a view over `texture`. The view keeps the texture alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be created.
    fn create_view(&self, texture: &Arc<Self::Texture>) -> OverlayResult<Self::View>;

    /// Write a tightly packed full-surface pixel buffer into `texture` on the
    /// primary context.
    ///
    /// Only called from the render thread (during drain or asset upload).
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be submitted.
    fn write_texture(
        &self,
        texture: &Self::Texture,
        size: SurfaceSize,
        pixels: &[u8],
    ) -> OverlayResult<()>;
}
