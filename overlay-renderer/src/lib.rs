//! # Saorsa Overlay Renderer
//!
//! wgpu implementation of the overlay backend, plus the sprite compositor a
//! host uses to draw the overlay into its own frame.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  OverlayRenderHandler<WgpuBackend>           │
//! ├───────────────────────┬──────────────────────┤
//! │ WgpuBackend           │ WgpuFrame            │
//! │ textures, views,      │ HostPipeline impl:   │
//! │ queue writes          │ SpritePipeline pass  │
//! └───────────────────────┴──────────────────────┘
//! ```
//!
//! Cursor assets are decoded with the `image` crate and converted to the
//! overlay's BGRA layout before upload.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
#[cfg(feature = "images")]
pub mod cursor;
pub mod error;
#[cfg(feature = "gpu")]
pub mod frame;
#[cfg(feature = "gpu")]
pub mod readback;
#[cfg(feature = "gpu")]
pub mod sprite;

#[cfg(feature = "gpu")]
pub use backend::wgpu::{WgpuBackend, WgpuTexture, WgpuView};
#[cfg(feature = "images")]
pub use cursor::{load_cursor, load_cursor_image, load_cursor_from_memory};
pub use error::{RenderError, RenderResult};
#[cfg(feature = "gpu")]
pub use frame::WgpuFrame;
#[cfg(feature = "gpu")]
pub use readback::read_texture;
#[cfg(feature = "gpu")]
pub use sprite::{SpriteInstance, SpritePipeline, MAX_SPRITES};

/// Render handler backed by wgpu.
#[cfg(feature = "gpu")]
pub type WgpuOverlay = overlay_core::OverlayRenderHandler<WgpuBackend>;
