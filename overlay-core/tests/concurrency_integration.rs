//! Concurrency tests: a browser thread painting while the render thread
//! drains, resizes and draws.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use overlay_core::software::{RecordingPipeline, SoftwareBackend};
use overlay_core::{
    BrowserHost, OverlayConfig, OverlayRenderHandler, PaintElementType, PaintOutcome, SurfaceSize,
};

type Handler = OverlayRenderHandler<SoftwareBackend>;

fn shared_handler(size: SurfaceSize) -> Arc<Handler> {
    let config = OverlayConfig {
        initial_size: size,
        ..OverlayConfig::default()
    };
    Arc::new(OverlayRenderHandler::new(Arc::new(SoftwareBackend::new()), config))
}

/// Paints every frame at whatever size the overlay currently reports, the
/// way a browser answers its view-rect query.
fn paint_current_size(handler: &Handler, value: u8) -> PaintOutcome {
    let size = handler.view_rect().size();
    let buffer = vec![value; size.pixel_count() * 4];
    handler.on_paint(PaintElementType::View, &[], &buffer, size.width, size.height)
}

#[derive(Default)]
struct ResizeCounter {
    count: AtomicUsize,
}

impl BrowserHost for ResizeCounter {
    fn was_resized(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn stress_paint_and_resize_never_tears() {
    let sizes = [
        SurfaceSize::new(32, 16),
        SurfaceSize::new(16, 32),
        SurfaceSize::new(24, 24),
        SurfaceSize::new(8, 8),
    ];
    let handler = shared_handler(sizes[0]);
    let browser = Arc::new(ResizeCounter::default());
    handler.attach_browser(browser.clone());

    let done = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = (0..2u8)
        .map(|id| {
            let handler = Arc::clone(&handler);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut value = id;
                while !done.load(Ordering::Acquire) {
                    value = value.wrapping_add(2).max(1);
                    paint_current_size(&handler, value);
                    thread::yield_now();
                }
            })
        })
        .collect();

    let mut host = RecordingPipeline::new(sizes[0]);
    let mut resizes = 0;
    for frame in 0..2_000usize {
        if frame % 97 == 0 {
            host.set_output(Some(sizes[(frame / 97) % sizes.len()]));
        }

        let report = handler.render(&mut host);
        if report.resized {
            resizes += 1;
        }

        // Surface and dimensions are always published together.
        let snapshot = handler.store().snapshot();
        if let Some(surface) = snapshot.surface {
            assert_eq!(surface.size, snapshot.size, "frame {frame}");
        }

        for draw in host.draws() {
            assert_eq!(draw.pixels.len(), draw.sprite.size.pixel_count() * 4);
            let first = draw.pixels[0];
            assert!(
                draw.pixels.iter().all(|&b| b == first),
                "torn frame at {frame}"
            );
        }
        host.clear();
    }

    done.store(true, Ordering::Release);
    for producer in producers {
        producer.join().expect("producer panicked");
    }

    assert_eq!(browser.count.load(Ordering::SeqCst), resizes);
    let stats = handler.store().stats();
    assert_eq!(
        stats.writes_recorded,
        stats.writes_applied
            + stats.writes_discarded
            + stats.writes_failed
            + stats.writes_coalesced
            + handler.store().snapshot().pending_writes as u64
    );
}

#[test]
fn stress_view_and_texture_stay_paired() {
    let handler = shared_handler(SurfaceSize::new(8, 8));
    let done = Arc::new(AtomicBool::new(false));

    let resizer = {
        let handler = Arc::clone(&handler);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut flip = false;
            while !done.load(Ordering::Acquire) {
                flip = !flip;
                let size = if flip { SurfaceSize::new(4, 4) } else { SurfaceSize::new(8, 8) };
                handler.store().resize(size);
                thread::yield_now();
            }
        })
    };

    let painter = {
        let handler = Arc::clone(&handler);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                paint_current_size(&handler, 0xAB);
            }
        })
    };

    for _ in 0..5_000 {
        if let Some(surface) = handler.store().surface() {
            assert!(Arc::ptr_eq(surface.view().texture(), surface.texture()));
            assert_eq!(surface.view().size(), surface.size());
        }
        handler.store().drain();
    }

    done.store(true, Ordering::Release);
    resizer.join().expect("resizer panicked");
    painter.join().expect("painter panicked");
}

#[test]
fn completed_paint_is_visible_after_next_drain() {
    let size = SurfaceSize::new(16, 16);
    let handler = shared_handler(size);
    let (tx, rx) = mpsc::channel();

    let producer = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || {
            for value in 1..=200u8 {
                let outcome = paint_current_size(&handler, value);
                assert!(matches!(outcome, PaintOutcome::Recorded(_)));
                if tx.send(value).is_err() {
                    break;
                }
            }
        })
    };

    let mut host = RecordingPipeline::new(size);
    for completed in rx {
        let report = handler.render(&mut host);
        assert!(report.surface_drawn);
        let drawn = host.draws()[0].pixels[0];
        assert!(
            drawn >= completed,
            "paint {completed} completed before drain but frame shows {drawn}"
        );
        host.clear();
    }

    producer.join().expect("producer panicked");
}
