//! Copy texture contents back to the CPU.
//!
//! Used by tests and diagnostics to check what actually reached the GPU.

use std::sync::mpsc;

use overlay_core::SurfaceSize;

use crate::backend::wgpu::WgpuBackend;
use crate::{RenderError, RenderResult};

const BYTES_PER_PIXEL: u32 = 4;

/// Read a 4-byte-per-pixel texture into a tightly packed buffer.
///
/// Submits a copy on the backend's queue and blocks until it completes, so
/// any writes queued before the call are included. The texture must have
/// been created with `COPY_SRC`.
///
/// # Errors
///
/// Returns an error if the staging buffer cannot be mapped.
pub fn read_texture(
    backend: &WgpuBackend,
    texture: &wgpu::Texture,
    size: SurfaceSize,
) -> RenderResult<Vec<u8>> {
    if size.is_empty() {
        return Ok(Vec::new());
    }

    let device = backend.device();
    let unpadded = size.width * BYTES_PER_PIXEL;
    let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("overlay_readback"),
        size: u64::from(padded) * u64::from(size.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("overlay_readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(size.height),
            },
        },
        wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
    );
    backend.queue().submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    let status = device.poll(wgpu::Maintain::Wait);
    tracing::debug!(
        queue_empty = status.is_queue_empty(),
        %size,
        "Readback poll finished"
    );

    rx.recv()
        .map_err(|e| RenderError::Readback(e.to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let mapped = slice.get_mapped_range();
    let row_len = unpadded as usize;
    let mut pixels = Vec::with_capacity(row_len * size.height as usize);
    for row in mapped.chunks_exact(padded as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }
    drop(mapped);
    buffer.unmap();

    Ok(pixels)
}
