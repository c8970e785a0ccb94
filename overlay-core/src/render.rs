//! Consumer path: the per-frame render call.
//!
//! Each frame runs three steps in order:
//!
//! 1. **Drain** the writes the browser thread recorded since the last frame.
//! 2. **Reconcile** the overlay size with the host's output size. A mismatch
//!    destroys the surface and tells the browser to repaint at the new size.
//! 3. **Draw** the surface as a full-output sprite, then the cursor.
//!
//! Between a resize and the next paint there is no surface; the main draw is
//! skipped for those frames while the cursor keeps drawing.

use std::sync::{Arc, PoisonError};

use crate::backend::OverlayBackend;
use crate::geometry::SurfaceSize;
use crate::handler::OverlayRenderHandler;
use crate::recorder::DrainReport;

/// Opaque white: draw textures unmodified.
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Placement of a textured quad in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Top-left corner.
    pub position: [f32; 2],
    /// Size of the source texture.
    pub size: SurfaceSize,
    /// Uniform scale applied to `size`.
    pub scale: f32,
    /// Color multiplier (RGBA, non-premultiplied).
    pub tint: [f32; 4],
}

impl Sprite {
    /// A sprite covering `size` at the origin, unscaled.
    #[must_use]
    pub fn full_surface(size: SurfaceSize) -> Self {
        Self {
            position: [0.0, 0.0],
            size,
            scale: 1.0,
            tint: WHITE,
        }
    }

    /// Drawn extent in output pixels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Texture dimensions fit in f32
    pub fn extent(&self) -> [f32; 2] {
        [
            self.size.width as f32 * self.scale,
            self.size.height as f32 * self.scale,
        ]
    }
}

/// The host rendering pipeline, as seen by the overlay.
///
/// `V` is the backend's view type. The host owns the output target; the
/// overlay only measures it and queues sprites into it.
pub trait HostPipeline<V> {
    /// Current output dimensions, or `None` if no render target is bound.
    fn output_size(&self) -> Option<SurfaceSize>;

    /// Start a sprite batch.
    fn begin_sprites(&mut self);

    /// Queue `view` for drawing with the given placement.
    fn draw_sprite(&mut self, view: &V, sprite: &Sprite);

    /// Flush the sprite batch into the output.
    fn end_sprites(&mut self);
}

/// What a single [`render`](OverlayRenderHandler::render) call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Writes drained into the primary context.
    pub drained: DrainReport,
    /// Whether the overlay was resized this frame.
    pub resized: bool,
    /// Whether the browser surface was drawn.
    pub surface_drawn: bool,
    /// Whether the cursor was drawn.
    pub cursor_drawn: bool,
}

impl<B: OverlayBackend> OverlayRenderHandler<B> {
    /// Render one frame into `host`. Call once per output frame from the
    /// render thread.
    pub fn render<H>(&self, host: &mut H) -> FrameReport
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        let drained = self.store.drain();
        let resized = self.reconcile_size(host);
        let mut report = FrameReport {
            drained,
            resized,
            ..FrameReport::default()
        };

        if !self.is_visible() {
            return report;
        }

        let (surface, overlay_size) = self.store.surface_and_size();
        host.begin_sprites();

        if let Some(surface) = surface {
            host.draw_sprite(surface.view(), &Sprite::full_surface(surface.size()));
            report.surface_drawn = true;
        }

        let cursor = self
            .cursor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|sprite| (Arc::clone(&sprite.view), sprite.size));
        if let Some((view, size)) = cursor {
            let sprite = Sprite {
                position: self.cursor_position(),
                size,
                scale: self.config.cursor_scale(overlay_size.width),
                tint: WHITE,
            };
            host.draw_sprite(&view, &sprite);
            report.cursor_drawn = true;
        }

        host.end_sprites();

        tracing::trace!(
            surface = report.surface_drawn,
            cursor = report.cursor_drawn,
            "Overlay frame drawn"
        );
        report
    }

    /// Match the overlay size to the host output.
    ///
    /// Returns `true` if the size changed, in which case the surface has been
    /// destroyed and the browser (if attached) told to repaint.
    pub(crate) fn reconcile_size<H>(&self, host: &H) -> bool
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        let Some(output) = host.output_size().filter(|size| !size.is_empty()) else {
            return false;
        };

        if !self.store.resize(output) {
            return false;
        }

        match self.browser() {
            Some(browser) => browser.was_resized(),
            None => tracing::debug!(size = %output, "Resized with no browser attached"),
        }
        true
    }
}
