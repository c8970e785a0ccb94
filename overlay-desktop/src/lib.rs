//! # Saorsa Overlay Desktop
//!
//! Demo host for the overlay: a winit window rendered with wgpu, with a
//! simulated browser painting into the overlay from a tokio worker thread.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p overlay-desktop -- --width 1280 --height 720 --paint-fps 30
//! ```
//!
//! Move the mouse to drive the cursor sprite, press Tab to toggle the
//! overlay and F5 to simulate a device reset.
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `DesktopConfig` - Window size, paint rate and overlay configuration
//! - `DemoBrowser` - Paints animated frames through `OverlayRenderHandler::on_paint`
//! - `OverlayDesktopApp` - Main application implementing `ApplicationHandler`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod app;
mod browser;

pub use app::OverlayDesktopApp;
pub use browser::{demo_frame, DemoBrowser};

use std::path::PathBuf;

use clap::Parser;
use overlay_core::{OverlayConfig, OverlayError, SurfaceSize};

/// Command-line arguments for overlay-desktop.
#[derive(Debug, Clone, Parser)]
#[command(name = "overlay-desktop")]
#[command(about = "Saorsa Overlay demo desktop host")]
#[command(version)]
pub struct CliArgs {
    /// Overlay configuration file (JSON)
    #[arg(long, env = "OVERLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Frames per second painted by the demo browser
    #[arg(long, env = "OVERLAY_PAINT_FPS", default_value = "30")]
    pub paint_fps: u32,

    /// Start with the overlay hidden
    #[arg(long)]
    pub hidden: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Desktop application configuration.
#[derive(Debug, Clone)]
pub struct DesktopConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// Demo browser paint rate.
    pub paint_fps: u32,
    /// Overlay settings.
    pub overlay: OverlayConfig,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopConfig {
    /// Create a new desktop configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        let overlay = OverlayConfig::default();
        Self {
            width: overlay.initial_size.width,
            height: overlay.initial_size.height,
            title: "Saorsa Overlay".to_string(),
            paint_fps: 30,
            overlay,
        }
    }

    /// Window size as an overlay surface size.
    #[must_use]
    pub fn window_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

impl TryFrom<CliArgs> for DesktopConfig {
    type Error = OverlayError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mut overlay = match &args.config {
            Some(path) => OverlayConfig::load(path)?,
            None => OverlayConfig::default(),
        };

        if args.width == 0 || args.height == 0 {
            return Err(OverlayError::Config(format!(
                "window size must be non-zero, got {}x{}",
                args.width, args.height
            )));
        }
        if args.paint_fps == 0 {
            return Err(OverlayError::Config("paint rate must be non-zero".to_string()));
        }

        overlay.initial_size = SurfaceSize::new(args.width, args.height);
        if args.hidden {
            overlay.start_visible = false;
        }

        Ok(Self {
            width: args.width,
            height: args.height,
            title: "Saorsa Overlay".to_string(),
            paint_fps: args.paint_fps,
            overlay,
        })
    }
}
