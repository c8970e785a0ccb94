//! The overlay render handler.
//!
//! One handler is shared between the browser thread, which feeds it paints
//! (see [`crate::paint`]), and the host render thread, which calls
//! [`render`](OverlayRenderHandler::render) once per frame (see
//! [`crate::render`]). Lifecycle entry points live here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::backend::{OverlayBackend, TextureDescriptor};
use crate::client::BrowserHost;
use crate::config::OverlayConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::{PixelFormat, SurfaceSize, ViewRect};
use crate::render::HostPipeline;
use crate::store::SharedTextureStore;

/// A decoded cursor image in BGRA layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    size: SurfaceSize,
    pixels: Vec<u8>,
}

impl CursorImage {
    /// Wrap tightly packed BGRA pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length does not match the dimensions,
    /// or if the image is empty.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> OverlayResult<Self> {
        let size = SurfaceSize::new(width, height);
        if size.is_empty() {
            return Err(OverlayError::EmptySurface(size));
        }
        let expected = size.byte_len(PixelFormat::Bgra8Unorm);
        if pixels.len() != expected {
            return Err(OverlayError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { size, pixels })
    }

    /// Image dimensions.
    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// BGRA pixel data.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Cursor texture uploaded at creation. Immutable afterwards.
pub(crate) struct CursorSprite<B: OverlayBackend> {
    pub(crate) view: Arc<B::View>,
    pub(crate) size: SurfaceSize,
}

/// Bridges browser paints and the host's per-frame render call.
pub struct OverlayRenderHandler<B: OverlayBackend> {
    pub(crate) store: SharedTextureStore<B>,
    pub(crate) config: OverlayConfig,
    pub(crate) visible: AtomicBool,
    pub(crate) cursor_position: Mutex<[f32; 2]>,
    pub(crate) cursor: RwLock<Option<CursorSprite<B>>>,
    pub(crate) browser: RwLock<Option<Arc<dyn BrowserHost>>>,
}

impl<B: OverlayBackend> OverlayRenderHandler<B> {
    /// Create a handler drawing through `backend`.
    #[must_use]
    pub fn new(backend: Arc<B>, config: OverlayConfig) -> Self {
        Self {
            store: SharedTextureStore::new(backend, config.initial_size),
            visible: AtomicBool::new(config.start_visible),
            config,
            cursor_position: Mutex::new([0.0, 0.0]),
            cursor: RwLock::new(None),
            browser: RwLock::new(None),
        }
    }

    /// The shared texture store.
    #[must_use]
    pub fn store(&self) -> &SharedTextureStore<B> {
        &self.store
    }

    /// The handler's configuration.
    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Initialise GPU resources. Call once from the render thread.
    ///
    /// Uploads `cursor` (if any), measures the host output and allocates the
    /// shared surface at that size. Failures are logged; the overlay simply
    /// renders less until a later paint succeeds.
    pub fn create<H>(&self, host: &H, cursor: Option<&CursorImage>)
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        match cursor.map(|image| self.upload_cursor(image)) {
            Some(Ok(sprite)) => {
                tracing::debug!(size = %sprite.size, "Cursor texture uploaded");
                *self.cursor.write().unwrap_or_else(PoisonError::into_inner) = Some(sprite);
            }
            Some(Err(e)) => {
                tracing::warn!("Cursor texture unavailable: {e}");
            }
            None => {
                tracing::debug!("No cursor image supplied");
            }
        }

        self.reconcile_size(host);

        let size = self.store.size();
        if let Err(e) = self.store.ensure_created(size) {
            tracing::warn!(%size, "Deferring shared surface allocation: {e}");
        }
    }

    /// Drop every GPU resource and run [`create`](Self::create) again.
    ///
    /// Call after the host recreated its device or swap chain.
    pub fn reset<H>(&self, host: &H, cursor: Option<&CursorImage>)
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        tracing::info!("Resetting overlay GPU resources");
        self.store.invalidate();
        *self.cursor.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.create(host, cursor);
    }

    fn upload_cursor(&self, image: &CursorImage) -> OverlayResult<CursorSprite<B>> {
        let backend = self.store.backend();
        let texture = Arc::new(backend.create_texture(&TextureDescriptor::cursor(image.size))?);
        backend.write_texture(&texture, image.size, &image.pixels)?;
        let view = Arc::new(backend.create_view(&texture)?);
        Ok(CursorSprite {
            view,
            size: image.size,
        })
    }

    /// View rectangle for the browser's size query: `(0, 0, width, height)`.
    #[must_use]
    pub fn view_rect(&self) -> ViewRect {
        self.store.view_rect()
    }

    /// Whether the overlay is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Show or hide the overlay.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    /// Flip visibility, returning the new state.
    pub fn toggle_visible(&self) -> bool {
        !self.visible.fetch_xor(true, Ordering::AcqRel)
    }

    /// Move the cursor sprite, in output pixels.
    pub fn set_cursor_position(&self, x: f32, y: f32) {
        *self
            .cursor_position
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = [x, y];
    }

    /// Last cursor position.
    #[must_use]
    pub fn cursor_position(&self) -> [f32; 2] {
        *self
            .cursor_position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// True once a cursor texture has been uploaded.
    #[must_use]
    pub fn has_cursor(&self) -> bool {
        self.cursor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Attach the browser to notify on resize.
    pub fn attach_browser(&self, browser: Arc<dyn BrowserHost>) {
        *self.browser.write().unwrap_or_else(PoisonError::into_inner) = Some(browser);
    }

    /// Detach the browser, returning it if one was attached.
    pub fn detach_browser(&self) -> Option<Arc<dyn BrowserHost>> {
        self.browser
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The attached browser, if any.
    #[must_use]
    pub fn browser(&self) -> Option<Arc<dyn BrowserHost>> {
        self.browser
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
