//! CPU reference backend.
//!
//! Textures are plain byte vectors. Used by the test-suite and for headless
//! runs where no GPU is available. Allocation and write failures can be
//! injected to exercise the error paths.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::backend::{OverlayBackend, TextureDescriptor, TextureUsage};
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::SurfaceSize;
use crate::render::{HostPipeline, Sprite};

/// A texture stored in system memory.
#[derive(Debug)]
pub struct SoftwareTexture {
    id: u64,
    size: SurfaceSize,
    usage: TextureUsage,
    pixels: Mutex<Vec<u8>>,
}

impl SoftwareTexture {
    /// Unique id assigned at allocation.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Allocated dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Usage the texture was allocated with.
    #[must_use]
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A view over a [`SoftwareTexture`].
#[derive(Debug, Clone)]
pub struct SoftwareView {
    texture: Arc<SoftwareTexture>,
}

impl SoftwareView {
    /// The texture this view reads from.
    #[must_use]
    pub fn texture(&self) -> &Arc<SoftwareTexture> {
        &self.texture
    }

    /// Dimensions of the underlying texture.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.texture.size
    }

    /// Read the underlying pixels.
    #[must_use]
    pub fn read_pixels(&self) -> Vec<u8> {
        self.texture.pixels()
    }
}

/// CPU implementation of [`OverlayBackend`].
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    next_id: AtomicU64,
    textures_created: AtomicU64,
    writes_executed: AtomicU64,
    fail_allocations: AtomicBool,
    fail_writes: AtomicBool,
}

impl SoftwareBackend {
    /// Create a new backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent texture allocations fail (or succeed again).
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent texture writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of textures successfully allocated.
    #[must_use]
    pub fn textures_created(&self) -> u64 {
        self.textures_created.load(Ordering::SeqCst)
    }

    /// Number of writes executed on the primary context.
    #[must_use]
    pub fn writes_executed(&self) -> u64 {
        self.writes_executed.load(Ordering::SeqCst)
    }
}

impl OverlayBackend for SoftwareBackend {
    type Texture = SoftwareTexture;
    type View = SoftwareView;

    fn create_texture(&self, desc: &TextureDescriptor) -> OverlayResult<SoftwareTexture> {
        if self.fail_allocations.load(Ordering::SeqCst) {
            return Err(OverlayError::TextureAllocation(format!(
                "{} ({}) refused",
                desc.label, desc.size
            )));
        }
        if desc.size.is_empty() {
            return Err(OverlayError::EmptySurface(desc.size));
        }

        self.textures_created.fetch_add(1, Ordering::SeqCst);
        Ok(SoftwareTexture {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            size: desc.size,
            usage: desc.usage,
            pixels: Mutex::new(vec![0; desc.size.byte_len(desc.format)]),
        })
    }

    fn create_view(&self, texture: &Arc<SoftwareTexture>) -> OverlayResult<SoftwareView> {
        Ok(SoftwareView {
            texture: Arc::clone(texture),
        })
    }

    fn write_texture(
        &self,
        texture: &SoftwareTexture,
        size: SurfaceSize,
        pixels: &[u8],
    ) -> OverlayResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OverlayError::Submission("write refused".to_string()));
        }
        if size != texture.size {
            return Err(OverlayError::Submission(format!(
                "write of {size} into texture of {}",
                texture.size
            )));
        }

        let mut dest = texture
            .pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if pixels.len() != dest.len() {
            return Err(OverlayError::BufferSize {
                expected: dest.len(),
                actual: pixels.len(),
            });
        }
        dest.copy_from_slice(pixels);
        self.writes_executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A sprite draw captured by [`RecordingPipeline`].
#[derive(Debug, Clone)]
pub struct DrawCall {
    /// Id of the texture that was drawn.
    pub texture_id: u64,
    /// Pixels of the texture at draw time.
    pub pixels: Vec<u8>,
    /// Placement of the sprite.
    pub sprite: Sprite,
}

/// Host pipeline that records sprite draws instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingPipeline {
    output: Option<SurfaceSize>,
    batches_begun: usize,
    batches_ended: usize,
    draws: Vec<DrawCall>,
}

impl RecordingPipeline {
    /// Create a pipeline reporting `output` as its render target size.
    #[must_use]
    pub fn new(output: SurfaceSize) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    /// Change the reported output size; `None` means no render target bound.
    pub fn set_output(&mut self, output: Option<SurfaceSize>) {
        self.output = output;
    }

    /// Draws recorded since the last [`clear`](Self::clear).
    #[must_use]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Number of sprite batches begun.
    #[must_use]
    pub fn batches_begun(&self) -> usize {
        self.batches_begun
    }

    /// Number of sprite batches ended.
    #[must_use]
    pub fn batches_ended(&self) -> usize {
        self.batches_ended
    }

    /// Forget recorded draws.
    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl HostPipeline<SoftwareView> for RecordingPipeline {
    fn output_size(&self) -> Option<SurfaceSize> {
        self.output
    }

    fn begin_sprites(&mut self) {
        self.batches_begun += 1;
    }

    fn draw_sprite(&mut self, view: &SoftwareView, sprite: &Sprite) {
        self.draws.push(DrawCall {
            texture_id: view.texture.id,
            pixels: view.read_pixels(),
            sprite: *sprite,
        });
    }

    fn end_sprites(&mut self) {
        self.batches_ended += 1;
    }
}
