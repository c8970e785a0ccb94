//! Error types for overlay operations.

use thiserror::Error;

use crate::geometry::SurfaceSize;

/// Result type for overlay operations.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Errors that can occur in overlay operations.
///
/// None of these are fatal to the host: the handler entry points log them and
/// skip the affected work for the current paint or frame.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// GPU texture allocation failed.
    #[error("Texture allocation failed: {0}")]
    TextureAllocation(String),

    /// Creating a view over a texture failed.
    #[error("Texture view creation failed: {0}")]
    ViewCreation(String),

    /// A surface with zero width or height was requested.
    #[error("Surface has zero area: {0}")]
    EmptySurface(SurfaceSize),

    /// A pixel buffer is smaller than its declared dimensions require.
    #[error("Invalid pixel buffer: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A paint was produced for dimensions other than the current surface.
    #[error("Stale paint: painted at {painted}, surface is {current}")]
    StalePaint {
        /// Dimensions the browser painted at.
        painted: SurfaceSize,
        /// Current overlay dimensions.
        current: SurfaceSize,
    },

    /// Submitting a write to the primary context failed.
    #[error("Command submission failed: {0}")]
    Submission(String),

    /// Asset loading failed.
    #[error("Failed to load asset: {0}")]
    AssetLoad(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
