//! # Saorsa Overlay Desktop
//!
//! Demo desktop host for the overlay.

use clap::Parser;
use overlay_desktop::{CliArgs, DesktopConfig, OverlayDesktopApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winit::event_loop::EventLoop;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "overlay_desktop=debug,overlay_renderer=debug,overlay_core=debug,wgpu=warn".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Saorsa Overlay Desktop v{}", overlay_core::VERSION);

    let config = DesktopConfig::try_from(args)?;
    tracing::info!(
        "Window config: {}x{} \"{}\", browser painting at {} fps",
        config.width,
        config.height,
        config.title,
        config.paint_fps
    );

    // The demo browser paints from runtime worker threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("overlay-browser")
        .enable_all()
        .build()?;

    let mut app = OverlayDesktopApp::new(config, runtime.handle().clone());

    tracing::debug!("Creating event loop");
    let event_loop = EventLoop::new()?;
    let result = event_loop.run_app(&mut app);
    tracing::debug!("run_app returned: {:?}", result);
    result?;

    drop(app);
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));

    tracing::info!("Saorsa Overlay Desktop exited");
    Ok(())
}
