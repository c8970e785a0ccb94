//! Overlay backend implementations.

#[cfg(feature = "gpu")]
pub mod wgpu;
