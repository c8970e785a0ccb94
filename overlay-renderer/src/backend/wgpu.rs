//! wgpu backend.
//!
//! Textures live on one `wgpu::Device`. The queue plays the primary context:
//! drained writes become `Queue::write_texture` calls, which wgpu orders
//! ahead of the next submission on the render thread.
//!
//! Allocation runs inside validation and out-of-memory error scopes so that
//! an oversized or failed texture surfaces as an [`OverlayError`] instead of
//! reaching the device's uncaptured-error handler.
//!
//! Error scopes belong to the whole device, not to the calling thread. While
//! the browser thread holds an allocation scope open, any invalid call made
//! on the same device by another thread is captured by that scope and
//! reported as an allocation failure. Device calls the overlay itself makes
//! on the render thread, such as bind group creation in
//! [`WgpuFrame`](crate::WgpuFrame), hold [`WgpuBackend::scope_guard`] so they
//! never run inside a foreign scope. Host code sharing the device should do
//! the same for calls that may fail validation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use overlay_core::{
    OverlayBackend, OverlayError, OverlayResult, PixelFormat, SurfaceSize, TextureDescriptor,
    TextureUsage,
};

use crate::{RenderError, RenderResult};

/// A texture allocated by [`WgpuBackend`].
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    size: SurfaceSize,
    format: PixelFormat,
}

impl WgpuTexture {
    /// The underlying wgpu texture.
    #[must_use]
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Texture dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Pixel layout.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

/// A sampling view over a [`WgpuTexture`]. Holds its texture alive.
#[derive(Debug)]
pub struct WgpuView {
    view: wgpu::TextureView,
    texture: Arc<WgpuTexture>,
}

impl WgpuView {
    /// The underlying wgpu view.
    #[must_use]
    pub fn raw(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The texture this view samples.
    #[must_use]
    pub fn texture(&self) -> &Arc<WgpuTexture> {
        &self.texture
    }

    /// View dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.texture.size
    }
}

/// Overlay backend on a wgpu device and queue.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    // Error scopes are a per-device stack; allocations from both threads
    // must not interleave their push/pop pairs.
    scope_lock: Mutex<()>,
}

impl WgpuBackend {
    /// Wrap an existing device and queue, typically the host's own.
    #[must_use]
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            scope_lock: Mutex::new(()),
        }
    }

    /// Request a device from `adapter` with limits sized to the adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter refuses the device request.
    pub async fn from_adapter(adapter: &wgpu::Adapter) -> RenderResult<Self> {
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Saorsa Overlay Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::GpuInit(e.to_string()))?;

        tracing::info!(
            "wgpu overlay backend initialized with adapter: {:?}",
            adapter.get_info()
        );

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Create a backend with no window surface, for tests and offscreen use.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter is available or device creation fails.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::GpuInit("No suitable GPU adapter found".to_string()))?;

        Self::from_adapter(&adapter).await
    }

    /// The wgpu device.
    #[must_use]
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// The wgpu queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Exclude allocations, and therefore their error scopes, while held.
    ///
    /// Errors raised by device calls made under the guard reach the device's
    /// uncaptured-error handler instead of failing an unrelated allocation.
    #[must_use]
    pub fn scope_guard(&self) -> MutexGuard<'_, ()> {
        self.scope_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
        let _guard = self.scope_guard();

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

/// Map an overlay pixel format to its wgpu equivalent.
#[must_use]
pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
    }
}

fn texture_usages(usage: TextureUsage) -> wgpu::TextureUsages {
    match usage {
        TextureUsage::Dynamic => {
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
        }
        TextureUsage::Static => {
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
        }
    }
}

fn extent(size: SurfaceSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

impl OverlayBackend for WgpuBackend {
    type Texture = WgpuTexture;
    type View = WgpuView;

    fn create_texture(&self, desc: &TextureDescriptor) -> OverlayResult<WgpuTexture> {
        if desc.size.is_empty() {
            return Err(OverlayError::EmptySurface(desc.size));
        }

        let max = self.device.limits().max_texture_dimension_2d;
        if desc.size.width > max || desc.size.height > max {
            return Err(OverlayError::TextureAllocation(format!(
                "{} exceeds device limit of {max}",
                desc.size
            )));
        }

        let texture = self
            .scoped(|device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(desc.label),
                    size: extent(desc.size),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: texture_format(desc.format),
                    usage: texture_usages(desc.usage),
                    view_formats: &[],
                })
            })
            .map_err(|e| OverlayError::TextureAllocation(e.to_string()))?;

        tracing::trace!(label = desc.label, size = %desc.size, "wgpu texture allocated");
        Ok(WgpuTexture {
            texture,
            size: desc.size,
            format: desc.format,
        })
    }

    fn create_view(&self, texture: &Arc<WgpuTexture>) -> OverlayResult<WgpuView> {
        let view = self
            .scoped(|_| {
                texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default())
            })
            .map_err(|e| OverlayError::ViewCreation(e.to_string()))?;

        Ok(WgpuView {
            view,
            texture: Arc::clone(texture),
        })
    }

    fn write_texture(
        &self,
        texture: &WgpuTexture,
        size: SurfaceSize,
        pixels: &[u8],
    ) -> OverlayResult<()> {
        if size != texture.size {
            return Err(OverlayError::Submission(format!(
                "write of {size} into texture of {}",
                texture.size
            )));
        }

        let expected = size.byte_len(texture.format);
        if pixels.len() != expected {
            return Err(OverlayError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        let bytes_per_row = u32::try_from(size.row_pitch(texture.format))
            .map_err(|_| OverlayError::Submission(format!("row pitch overflow at {size}")))?;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size.height),
            },
            extent(size),
        );
        Ok(())
    }
}
