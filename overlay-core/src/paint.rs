//! Producer path: browser paint events.

use serde::{Deserialize, Serialize};

use crate::backend::OverlayBackend;
use crate::error::OverlayError;
use crate::geometry::{SurfaceSize, ViewRect};
use crate::handler::OverlayRenderHandler;
use crate::store::SurfaceInfo;

/// What a paint event covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintElementType {
    /// The whole browser view.
    View,
    /// A popup widget drawn over the view (select dropdowns and the like).
    Popup,
}

/// Result of handing a paint to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    /// The frame was staged for the next drain.
    Recorded(SurfaceInfo),
    /// Not a full-view paint; nothing was done.
    Ignored,
    /// The frame was refused (stale size, short buffer or no surface).
    Dropped,
}

impl<B: OverlayBackend> OverlayRenderHandler<B> {
    /// Browser paint callback. Called from the browser compositor thread.
    ///
    /// Only [`PaintElementType::View`] paints are handled. The whole buffer is
    /// copied regardless of `dirty_rects`. This blocks only on the texture
    /// lock, never on the render thread's frame.
    pub fn on_paint(
        &self,
        kind: PaintElementType,
        dirty_rects: &[ViewRect],
        buffer: &[u8],
        width: u32,
        height: u32,
    ) -> PaintOutcome {
        if kind != PaintElementType::View {
            tracing::trace!(?kind, "Ignoring non-view paint");
            return PaintOutcome::Ignored;
        }

        let size = SurfaceSize::new(width, height);
        tracing::trace!(
            %size,
            dirty = dirty_rects.len(),
            full = dirty_rects.iter().any(|rect| rect.covers(size)),
            "Paint received"
        );

        match self.store.write_frame(buffer, size) {
            Ok(info) => PaintOutcome::Recorded(info),
            Err(OverlayError::StalePaint { painted, current }) => {
                // The browser has not caught up with a resize yet; a fresh
                // paint at the new size follows its was_resized notification.
                tracing::debug!(%painted, %current, "Dropping paint for previous size");
                PaintOutcome::Dropped
            }
            Err(e) => {
                tracing::warn!(%size, "Dropping paint: {e}");
                PaintOutcome::Dropped
            }
        }
    }
}
