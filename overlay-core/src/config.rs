//! Overlay configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, OverlayResult};
use crate::geometry::SurfaceSize;

/// Configuration for an overlay instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Cursor image, tried first.
    pub cursor_png_path: PathBuf,
    /// Fallback cursor image, tried when the PNG cannot be loaded.
    pub cursor_dds_path: PathBuf,
    /// Output width at which the cursor is drawn at 1:1 scale.
    pub cursor_reference_width: f32,
    /// Whether the overlay draws before the host toggles it.
    pub start_visible: bool,
    /// Overlay dimensions before the first output measurement.
    pub initial_size: SurfaceSize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            cursor_png_path: PathBuf::from("Data/Online/UI/assets/images/cursor.png"),
            cursor_dds_path: PathBuf::from("Data/Online/UI/assets/images/cursor.dds"),
            cursor_reference_width: 1920.0,
            start_visible: true,
            initial_size: SurfaceSize::new(1280, 720),
        }
    }
}

impl OverlayConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> OverlayResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> OverlayResult<Self> {
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded overlay config from {}", path.display());
        Self::from_json(&json)
    }

    /// Check that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Config`] describing the first invalid value.
    pub fn validate(&self) -> OverlayResult<()> {
        if !(self.cursor_reference_width.is_finite() && self.cursor_reference_width > 0.0) {
            return Err(OverlayError::Config(format!(
                "cursor_reference_width must be positive, got {}",
                self.cursor_reference_width
            )));
        }
        Ok(())
    }

    /// Cursor asset paths in the order they should be tried.
    #[must_use]
    pub fn cursor_paths(&self) -> [&Path; 2] {
        [self.cursor_png_path.as_path(), self.cursor_dds_path.as_path()]
    }

    /// Cursor scale for an overlay of the given width.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Surface widths fit in f32
    pub fn cursor_scale(&self, overlay_width: u32) -> f32 {
        overlay_width as f32 / self.cursor_reference_width
    }
}
