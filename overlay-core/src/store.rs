//! Shared texture store.
//!
//! Owns the browser surface (texture + view), the current overlay dimensions
//! and the deferred recorder, all behind one mutex. This is the only place
//! surfaces are created, destroyed or swapped.
//!
//! Surface lifecycle:
//!
//! ```text
//! Absent ──ensure_created──▶ Ready ──resize / invalidate──▶ Absent
//! ```
//!
//! A surface is never resized in place: a size change destroys it, and the
//! next paint allocates a fresh one at the new size.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{OverlayBackend, TextureDescriptor};
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::{PixelFormat, SurfaceSize, ViewRect};
use crate::recorder::{CommandRecorder, DrainReport};

/// A texture and its view, created and destroyed together.
pub struct SharedSurface<B: OverlayBackend> {
    texture: Arc<B::Texture>,
    view: Arc<B::View>,
    size: SurfaceSize,
    generation: u64,
}

impl<B: OverlayBackend> SharedSurface<B> {
    /// The backing texture.
    #[must_use]
    pub fn texture(&self) -> &Arc<B::Texture> {
        &self.texture
    }

    /// The sampling view.
    #[must_use]
    pub fn view(&self) -> &Arc<B::View> {
        &self.view
    }

    /// Allocated dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Allocation generation; every new surface gets a higher one.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size and generation of this surface.
    #[must_use]
    pub fn info(&self) -> SurfaceInfo {
        SurfaceInfo {
            size: self.size,
            generation: self.generation,
        }
    }
}

impl<B: OverlayBackend> Clone for SharedSurface<B> {
    fn clone(&self) -> Self {
        Self {
            texture: Arc::clone(&self.texture),
            view: Arc::clone(&self.view),
            size: self.size,
            generation: self.generation,
        }
    }
}

/// Identity of an allocated surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    /// Allocated dimensions.
    pub size: SurfaceSize,
    /// Allocation generation.
    pub generation: u64,
}

/// A consistent view of the store taken under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Current overlay dimensions.
    pub size: SurfaceSize,
    /// The allocated surface, if any.
    pub surface: Option<SurfaceInfo>,
    /// Writes recorded but not yet drained.
    pub pending_writes: usize,
}

/// Counters for monitoring the handoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Surfaces allocated.
    pub textures_created: u64,
    /// Surfaces destroyed by resize or invalidation.
    pub textures_destroyed: u64,
    /// Failed surface allocations.
    pub allocation_failures: u64,
    /// Writes recorded by the producer.
    pub writes_recorded: u64,
    /// Writes executed on the primary context.
    pub writes_applied: u64,
    /// Writes dropped because their surface was replaced.
    pub writes_discarded: u64,
    /// Writes replaced by a later paint before they were drained.
    pub writes_coalesced: u64,
    /// Writes the backend failed to execute.
    pub writes_failed: u64,
    /// Non-empty batches drained.
    pub batches_executed: u64,
    /// Paints refused for stale dimensions or short buffers.
    pub paints_rejected: u64,
}

struct StoreState<B: OverlayBackend> {
    surface: Option<SharedSurface<B>>,
    size: SurfaceSize,
    next_generation: u64,
    recorder: CommandRecorder<B::Texture>,
    stats: StoreStats,
}

impl<B: OverlayBackend> StoreState<B> {
    fn destroy_surface(&mut self) -> bool {
        let Some(old) = self.surface.take() else {
            return false;
        };

        let discarded = self.recorder.discard_stale(None);
        self.stats.textures_destroyed += 1;
        self.stats.writes_discarded += discarded as u64;
        tracing::debug!(
            generation = old.generation,
            size = %old.size,
            discarded,
            "Shared surface destroyed"
        );
        true
    }

    fn create_surface(&mut self, backend: &B) -> OverlayResult<SurfaceInfo> {
        self.destroy_surface();

        if self.size.is_empty() {
            return Err(OverlayError::EmptySurface(self.size));
        }

        let result = backend
            .create_texture(&TextureDescriptor::shared_surface(self.size))
            .map(Arc::new)
            .and_then(|texture| {
                let view = backend.create_view(&texture)?;
                Ok((texture, Arc::new(view)))
            });

        let (texture, view) = match result {
            Ok(pair) => pair,
            Err(e) => {
                self.stats.allocation_failures += 1;
                return Err(e);
            }
        };

        self.next_generation += 1;
        let surface = SharedSurface {
            texture,
            view,
            size: self.size,
            generation: self.next_generation,
        };
        let info = surface.info();
        self.surface = Some(surface);
        self.stats.textures_created += 1;

        tracing::debug!(
            generation = info.generation,
            size = %info.size,
            "Shared surface created"
        );
        Ok(info)
    }
}

/// The shared texture store.
///
/// Shared between the browser thread (which records paints) and the render
/// thread (which drains, reconciles size and draws). Every operation takes
/// the lock once and holds it only for a copy, a swap or a batch submission.
pub struct SharedTextureStore<B: OverlayBackend> {
    backend: Arc<B>,
    state: Mutex<StoreState<B>>,
}

impl<B: OverlayBackend> SharedTextureStore<B> {
    /// Create an empty store. No surface is allocated until the first paint.
    #[must_use]
    pub fn new(backend: Arc<B>, size: SurfaceSize) -> Self {
        Self {
            backend,
            state: Mutex::new(StoreState {
                surface: None,
                size,
                next_generation: 0,
                recorder: CommandRecorder::new(),
                stats: StoreStats::default(),
            }),
        }
    }

    /// The backend surfaces are allocated from.
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // The state is consistent at every point a panic could unwind through,
    // so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, StoreState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current overlay dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.lock().size
    }

    /// View rectangle reported to the browser: `(0, 0, width, height)`.
    #[must_use]
    pub fn view_rect(&self) -> ViewRect {
        ViewRect::from_size(self.size())
    }

    /// Make sure a surface of `size` exists, publishing `size` as the
    /// current dimensions.
    ///
    /// Returns `true` if a surface was (re)allocated, `false` if one of the
    /// requested size already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails; the store is left without a
    /// surface in that case.
    pub fn ensure_created(&self, size: SurfaceSize) -> OverlayResult<bool> {
        let mut state = self.lock();

        if state.size == size && state.surface.is_some() {
            return Ok(false);
        }

        state.size = size;
        state.create_surface(&self.backend)?;
        Ok(true)
    }

    /// Record a full-surface write of `pixels`, painted at `size`.
    ///
    /// Allocates the surface first if none exists. Exactly
    /// `size.width * size.height * 4` bytes are copied, verbatim.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::StalePaint`] if `size` is not the current dimensions
    ///   (the browser painted before it saw a resize).
    /// - [`OverlayError::BufferSize`] if `pixels` is too short.
    /// - Allocation errors from the backend.
    pub fn write_frame(&self, pixels: &[u8], size: SurfaceSize) -> OverlayResult<SurfaceInfo> {
        let mut guard = self.lock();
        let state = &mut *guard;

        if size != state.size {
            state.stats.paints_rejected += 1;
            return Err(OverlayError::StalePaint {
                painted: size,
                current: state.size,
            });
        }

        let expected = size.byte_len(PixelFormat::Bgra8Unorm);
        if pixels.len() < expected {
            state.stats.paints_rejected += 1;
            return Err(OverlayError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        if state.surface.is_none() {
            state.create_surface(&self.backend)?;
        }
        let surface = state
            .surface
            .as_ref()
            .ok_or(OverlayError::EmptySurface(size))?;

        let coalesced = state.recorder.record_write(
            &surface.texture,
            surface.generation,
            size,
            &pixels[..expected],
        );
        state.stats.writes_recorded += 1;
        if coalesced {
            state.stats.writes_coalesced += 1;
        }

        Ok(surface.info())
    }

    /// Submit every recorded write to the primary context.
    ///
    /// Must be called from the render thread. A no-op when nothing is pending.
    pub fn drain(&self) -> DrainReport {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(batch) = state.recorder.finish() else {
            return DrainReport::default();
        };

        let live = state.surface.as_ref().map(SharedSurface::generation);
        let report = batch.execute(self.backend.as_ref(), live, &mut state.recorder);

        state.stats.batches_executed += 1;
        state.stats.writes_applied += report.applied as u64;
        state.stats.writes_discarded += report.discarded as u64;
        state.stats.writes_failed += report.failed as u64;

        tracing::trace!(
            applied = report.applied,
            discarded = report.discarded,
            failed = report.failed,
            "Drained surface writes"
        );
        report
    }

    /// Publish new dimensions.
    ///
    /// If `size` differs from the current dimensions, the surface is destroyed
    /// in the same critical section, so the next paint recreates it at the new
    /// size. Returns `true` if the dimensions changed.
    pub fn resize(&self, size: SurfaceSize) -> bool {
        let mut state = self.lock();

        if state.size == size {
            return false;
        }

        let previous = state.size;
        state.size = size;
        state.destroy_surface();
        tracing::debug!(from = %previous, to = %size, "Overlay resized");
        true
    }

    /// Destroy the surface and drop any pending writes, keeping dimensions.
    pub fn invalidate(&self) {
        self.lock().destroy_surface();
    }

    /// Clone of the current surface handles.
    #[must_use]
    pub fn surface(&self) -> Option<SharedSurface<B>> {
        self.lock().surface.clone()
    }

    /// Clone of the current surface handles together with the overlay
    /// dimensions, read under one lock acquisition.
    #[must_use]
    pub fn surface_and_size(&self) -> (Option<SharedSurface<B>>, SurfaceSize) {
        let state = self.lock();
        (state.surface.clone(), state.size)
    }

    /// The current view, if a surface exists.
    #[must_use]
    pub fn view(&self) -> Option<Arc<B::View>> {
        self.lock()
            .surface
            .as_ref()
            .map(|surface| Arc::clone(&surface.view))
    }

    /// Size and generation of the current surface.
    #[must_use]
    pub fn info(&self) -> Option<SurfaceInfo> {
        self.lock().surface.as_ref().map(SharedSurface::info)
    }

    /// Dimensions, surface and pending count, read atomically.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock();
        StoreSnapshot {
            size: state.size,
            surface: state.surface.as_ref().map(SharedSurface::info),
            pending_writes: state.recorder.pending_len(),
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.lock().stats
    }
}
