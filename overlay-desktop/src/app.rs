//! Desktop application using winit 0.30 `ApplicationHandler`.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use overlay_core::{CursorImage, OverlayClient, OverlayRenderHandler, SurfaceSize};
use overlay_renderer::{load_cursor, SpritePipeline, WgpuBackend, WgpuFrame};
use tokio::runtime::Handle;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{DemoBrowser, DesktopConfig};

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.12,
    b: 0.18,
    a: 1.0,
};

/// GPU state tied to one window.
struct GpuState {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    backend: Arc<WgpuBackend>,
    pipeline: SpritePipeline,
    client: Arc<OverlayClient<WgpuBackend>>,
}

impl GpuState {
    fn new(window: Arc<Window>, config: &DesktopConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("No suitable GPU adapter found"))?;
        let backend = Arc::new(pollster::block_on(WgpuBackend::from_adapter(&adapter))?);

        let caps = surface.get_capabilities(&adapter);
        // Browser pixels are stored as-is; composite them without sRGB encoding.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(backend.device(), &surface_config);

        let pipeline = SpritePipeline::new(backend.device(), format);
        let handler = OverlayRenderHandler::new(Arc::clone(&backend), config.overlay.clone());
        let client = Arc::new(OverlayClient::new(Arc::new(handler)));

        tracing::info!(?format, "Surface configured at {}x{}", size.width, size.height);
        Ok(Self {
            surface,
            surface_config,
            backend,
            pipeline,
            client,
        })
    }

    fn output_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.surface_config.width, self.surface_config.height)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(self.backend.device(), &self.surface_config);
    }
}

/// What the next frame must do before rendering the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    NeedsCreate,
    NeedsReset,
    Running,
}

/// Desktop overlay application.
///
/// Manages the winit window, the wgpu surface and the demo browser using the
/// `ApplicationHandler` trait introduced in winit 0.30.
pub struct OverlayDesktopApp {
    config: DesktopConfig,
    runtime: Handle,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    browser: Option<Arc<DemoBrowser>>,
    cursor: Option<CursorImage>,
    lifecycle: Lifecycle,
    frames: u64,
}

impl OverlayDesktopApp {
    /// Create the application. The demo browser runs on `runtime`.
    #[must_use]
    pub fn new(config: DesktopConfig, runtime: Handle) -> Self {
        let cursor = load_cursor(&config.overlay);
        Self {
            config,
            runtime,
            window: None,
            gpu: None,
            browser: None,
            cursor,
            lifecycle: Lifecycle::NeedsCreate,
            frames: 0,
        }
    }

    /// Initialize GPU state and start the browser for `window`.
    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let gpu = GpuState::new(Arc::clone(&window), &self.config)?;
        let browser = DemoBrowser::spawn(&self.runtime, Arc::clone(&gpu.client), self.config.paint_fps);

        self.browser = Some(browser);
        self.gpu = Some(gpu);
        self.window = Some(window);
        self.lifecycle = Lifecycle::NeedsCreate;

        tracing::info!("Renderer initialized successfully");
        Ok(())
    }

    /// Render one frame: clear, then composite the overlay.
    fn render(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                gpu.surface.configure(gpu.backend.device(), &gpu.surface_config);
                gpu.client.handler().store().drain();
                return;
            }
            Err(e) => {
                tracing::error!("Failed to acquire frame: {e}");
                // Writes must not pile up while frames cannot be acquired.
                gpu.client.handler().store().drain();
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .backend
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay_desktop_frame"),
            });

        // The scene the overlay is composited over.
        drop(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay_desktop_clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(BACKGROUND),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        }));

        let output_size = gpu.output_size();
        let report = {
            let mut frame = WgpuFrame::new(
                &gpu.backend,
                &gpu.pipeline,
                &mut encoder,
                &view,
                Some(output_size),
            );
            match self.lifecycle {
                Lifecycle::NeedsCreate => gpu.client.create(&frame, self.cursor.as_ref()),
                Lifecycle::NeedsReset => {
                    tracing::info!("Resetting overlay resources");
                    gpu.client.reset(&frame, self.cursor.as_ref());
                }
                Lifecycle::Running => {}
            }
            self.lifecycle = Lifecycle::Running;
            gpu.client.render(&mut frame)
        };

        gpu.backend.queue().submit(Some(encoder.finish()));
        output.present();

        self.frames += 1;
        if report.resized {
            tracing::debug!(size = %output_size, "Overlay resized to window");
        }
        if self.frames % 600 == 0 {
            let stats = gpu.client.handler().store().stats();
            tracing::debug!(
                frames = self.frames,
                applied = stats.writes_applied,
                discarded = stats.writes_discarded,
                textures = stats.textures_created,
                "Overlay stats"
            );
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(gpu) = &self.gpu else {
            return;
        };

        match &event.logical_key {
            Key::Named(NamedKey::Tab) => {
                let visible = gpu.client.handler().toggle_visible();
                tracing::info!(visible, "Overlay visibility toggled");
            }
            Key::Named(NamedKey::F5) => self.lifecycle = Lifecycle::NeedsReset,
            _ => {}
        }
    }

    fn shutdown(&mut self) {
        if let Some(browser) = self.browser.take() {
            browser.close();
        }
        if let Some(gpu) = &self.gpu {
            gpu.client.on_before_close();
        }
    }
}

impl ApplicationHandler for OverlayDesktopApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        tracing::debug!("ApplicationHandler::resumed called");

        // Only create window if we don't have one
        if self.window.is_some() {
            tracing::debug!("Window already exists, skipping creation");
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                if let Err(e) = self.init_gpu(Arc::clone(&window)) {
                    tracing::error!("Failed to initialize renderer: {e}");
                    event_loop.exit();
                } else {
                    window.request_redraw();
                }
            }
            Err(e) => {
                tracing::error!("Failed to create window: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                tracing::debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(gpu) = &self.gpu {
                    #[allow(clippy::cast_possible_truncation)] // Window coordinates fit in f32
                    gpu.client
                        .handler()
                        .set_cursor_position(position.x as f32, position.y as f32);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
        tracing::info!(frames = self.frames, "Overlay desktop exiting");
    }
}
