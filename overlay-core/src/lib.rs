//! # Saorsa Overlay Core
//!
//! Texture handoff protocol between an off-screen browser compositor and a
//! real-time GPU pipeline.
//!
//! ## Architecture
//!
//! ```text
//!  browser thread                         render thread
//! ┌──────────────────┐                  ┌──────────────────────────┐
//! │ on_paint()       │                  │ render()                 │
//! │  - staging copy  │                  │  1. drain recorder       │
//! │  - record write  │──┐            ┌──│  2. reconcile size       │
//! └──────────────────┘  │            │  │  3. draw surface+cursor  │
//!                       ▼            ▼  └──────────────────────────┘
//!               ┌─────────────────────────┐
//!               │   SharedTextureStore    │
//!               │  Mutex<{surface, size,  │
//!               │         recorder}>      │
//!               └─────────────────────────┘
//! ```
//!
//! The store's mutex is the only coordination point between the two threads.
//! GPU work is abstracted behind [`OverlayBackend`]; the [`software`] module
//! provides a CPU implementation used for tests and headless runs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod geometry;
pub mod handler;
pub mod paint;
pub mod recorder;
pub mod render;
pub mod software;
pub mod store;

pub use backend::{OverlayBackend, TextureDescriptor, TextureUsage};
pub use client::{BrowserHost, OverlayClient, ProcessMessage, UiEvent};
pub use config::OverlayConfig;
pub use error::{OverlayError, OverlayResult};
pub use geometry::{PixelFormat, SurfaceSize, ViewRect};
pub use handler::{CursorImage, OverlayRenderHandler};
pub use paint::{PaintElementType, PaintOutcome};
pub use recorder::{CommandBatch, CommandRecorder, DrainReport};
pub use render::{FrameReport, HostPipeline, Sprite};
pub use software::{RecordingPipeline, SoftwareBackend};
pub use store::{SharedSurface, SharedTextureStore, StoreSnapshot, StoreStats, SurfaceInfo};

/// Overlay core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
