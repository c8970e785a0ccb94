//! Simulated browser engine.
//!
//! Stands in for an off-screen browser: a tokio task paints animated BGRA
//! frames into the overlay at a fixed rate, and repaints immediately when
//! the overlay reports a resize. Painting happens on a runtime worker
//! thread, so the handoff to the render thread is exercised for real.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use overlay_core::client::UI_EVENT_MESSAGE;
use overlay_core::{
    BrowserHost, OverlayBackend, OverlayClient, PaintElementType, PaintOutcome, ProcessMessage,
    SurfaceSize, ViewRect,
};
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];
const BANNER: [u8; 4] = [40, 30, 20, 200];
const BLOCK: [u8; 4] = [0, 160, 255, 255];
const BANNER_HEIGHT: u32 = 40;
const BLOCK_SIZE: u32 = 48;

/// A browser that paints generated frames into an overlay.
pub struct DemoBrowser {
    repaint: Arc<Notify>,
    painted: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl DemoBrowser {
    /// Start painting into `client` at `fps` frames per second and attach the
    /// browser to the client.
    pub fn spawn<B: OverlayBackend>(
        runtime: &Handle,
        client: Arc<OverlayClient<B>>,
        fps: u32,
    ) -> Arc<Self> {
        let repaint = Arc::new(Notify::new());
        let painted = Arc::new(AtomicU64::new(0));
        let period = Duration::from_secs(1) / fps.max(1);

        let task = runtime.spawn(paint_loop(
            Arc::clone(&client),
            Arc::clone(&repaint),
            Arc::clone(&painted),
            period,
        ));

        let browser = Arc::new(Self {
            repaint,
            painted,
            task,
        });
        client.on_after_created(Arc::clone(&browser) as Arc<dyn BrowserHost>);
        tracing::info!(fps, "Demo browser started");
        browser
    }

    /// Frames accepted by the overlay so far.
    #[must_use]
    pub fn frames_painted(&self) -> u64 {
        self.painted.load(Ordering::Acquire)
    }

    /// Stop painting.
    pub fn close(&self) {
        self.task.abort();
        tracing::info!(frames = self.frames_painted(), "Demo browser closed");
    }
}

impl BrowserHost for DemoBrowser {
    fn was_resized(&self) {
        self.repaint.notify_one();
    }
}

impl Drop for DemoBrowser {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn paint_loop<B: OverlayBackend>(
    client: Arc<OverlayClient<B>>,
    repaint: Arc<Notify>,
    painted: Arc<AtomicU64>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = repaint.notified() => tracing::debug!("Repainting after resize"),
        }

        // Ask for the view rect each paint, the way a browser does.
        let handler = client.handler();
        let size = handler.view_rect().size();
        if size.is_empty() {
            continue;
        }

        let frame = demo_frame(size, tick);
        let outcome = handler.on_paint(
            PaintElementType::View,
            &[ViewRect::from_size(size)],
            &frame,
            size.width,
            size.height,
        );
        tick = tick.wrapping_add(1);

        if let PaintOutcome::Recorded(_) = outcome {
            if painted.fetch_add(1, Ordering::AcqRel) == 0 {
                client.set_loaded(true);
                client.on_process_message(&ProcessMessage::new(
                    UI_EVENT_MESSAGE,
                    vec![json!("loaded"), json!([size.width, size.height])],
                ));
            }
        }
    }
}

/// Generate one BGRA frame: a translucent banner along the top and a block
/// sliding across beneath it. Everything else is transparent.
#[must_use]
pub fn demo_frame(size: SurfaceSize, tick: u64) -> Vec<u8> {
    let mut frame = TRANSPARENT.repeat(size.pixel_count());
    let width = size.width as usize;

    let banner_rows = BANNER_HEIGHT.min(size.height) as usize;
    for px in frame[..banner_rows * width * 4].chunks_exact_mut(4) {
        px.copy_from_slice(&BANNER);
    }

    let travel = u64::from(size.width.saturating_sub(BLOCK_SIZE).max(1));
    let block_x = usize::try_from((tick * 4) % travel).unwrap_or(0);
    let block_w = (BLOCK_SIZE as usize).min(width - block_x.min(width));
    let top = (BANNER_HEIGHT + 8) as usize;
    let bottom = (top + BLOCK_SIZE as usize).min(size.height as usize);
    for row in top..bottom {
        let start = (row * width + block_x) * 4;
        for px in frame[start..start + block_w * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&BLOCK);
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use overlay_core::software::{RecordingPipeline, SoftwareBackend};
    use overlay_core::{OverlayConfig, OverlayRenderHandler};

    use super::*;

    fn pixel(frame: &[u8], size: SurfaceSize, x: u32, y: u32) -> &[u8] {
        let index = (y as usize * size.width as usize + x as usize) * 4;
        &frame[index..index + 4]
    }

    #[test]
    fn test_demo_frame_layout() {
        let size = SurfaceSize::new(200, 120);
        let frame = demo_frame(size, 0);

        assert_eq!(frame.len(), size.pixel_count() * 4);
        assert_eq!(pixel(&frame, size, 10, 5), BANNER);
        assert_eq!(pixel(&frame, size, 0, BANNER_HEIGHT + 8), BLOCK);
        assert_eq!(pixel(&frame, size, 199, 119), TRANSPARENT);
    }

    #[test]
    fn test_demo_frame_block_moves() {
        let size = SurfaceSize::new(200, 120);
        let row = BANNER_HEIGHT + 8;
        let later = demo_frame(size, 10);
        assert_eq!(pixel(&later, size, 0, row), TRANSPARENT);
        assert_eq!(pixel(&later, size, 40, row), BLOCK);
    }

    #[test]
    fn test_demo_frame_tiny_surface() {
        let size = SurfaceSize::new(4, 4);
        let frame = demo_frame(size, 123);
        assert!(frame.chunks_exact(4).all(|px| px == BANNER));
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_browser_paints_and_repaints_after_resize() {
        let size = SurfaceSize::new(64, 64);
        let config = OverlayConfig {
            initial_size: size,
            ..OverlayConfig::default()
        };
        let handler = OverlayRenderHandler::new(Arc::new(SoftwareBackend::new()), config);
        let client = Arc::new(OverlayClient::new(Arc::new(handler)));
        let browser = DemoBrowser::spawn(&Handle::current(), Arc::clone(&client), 60);

        wait_for(|| browser.frames_painted() > 0).await;
        assert!(client.is_ready());

        let mut host = RecordingPipeline::new(size);
        let report = client.render(&mut host);
        assert!(report.surface_drawn);

        // Resize: the surface goes away until the browser repaints.
        let larger = SurfaceSize::new(96, 80);
        host.set_output(Some(larger));
        assert!(client.render(&mut host).resized);

        wait_for(|| {
            client
                .handler()
                .store()
                .info()
                .is_some_and(|info| info.size == larger)
        })
        .await;

        host.clear();
        let report = client.render(&mut host);
        assert!(report.surface_drawn);
        assert_eq!(host.draws()[0].sprite.size, larger);

        browser.close();
        client.on_before_close();
        assert!(!client.is_ready());
    }
}
