//! Renderer error types.

use overlay_core::OverlayError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// GPU initialization failed.
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    /// Surface/swapchain error.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Rendering frame failed.
    #[error("Frame render failed: {0}")]
    Frame(String),

    /// Texture readback failed.
    #[error("Readback failed: {0}")]
    Readback(String),

    /// Error from the overlay core.
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

impl From<RenderError> for OverlayError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Overlay(inner) => inner,
            RenderError::Resource(msg) => OverlayError::AssetLoad(msg),
            other => OverlayError::Submission(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::SurfaceSize;

    #[test]
    fn test_overlay_error_passes_through() {
        let err = RenderError::from(OverlayError::EmptySurface(SurfaceSize::new(0, 4)));
        assert!(matches!(
            OverlayError::from(err),
            OverlayError::EmptySurface(size) if size == SurfaceSize::new(0, 4)
        ));
    }

    #[test]
    fn test_resource_maps_to_asset_load() {
        let err = OverlayError::from(RenderError::Resource("cursor.png".to_string()));
        assert!(matches!(err, OverlayError::AssetLoad(msg) if msg == "cursor.png"));
    }

    #[test]
    fn test_gpu_errors_map_to_submission() {
        let err = OverlayError::from(RenderError::Frame("lost".to_string()));
        assert!(matches!(err, OverlayError::Submission(msg) if msg.contains("lost")));
    }
}
