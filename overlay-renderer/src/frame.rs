//! Host pipeline over a wgpu command encoder.
//!
//! A [`WgpuFrame`] wraps one frame's encoder and output view. Sprites queued
//! between `begin_sprites` and `end_sprites` are drawn in a single render
//! pass that loads the existing target contents, so the overlay composites
//! over whatever the host has already recorded.

use overlay_core::{HostPipeline, Sprite, SurfaceSize};

use crate::backend::wgpu::{WgpuBackend, WgpuView};
use crate::sprite::{SpriteInstance, SpritePipeline, MAX_SPRITES};

/// One frame of a wgpu host.
pub struct WgpuFrame<'a> {
    backend: &'a WgpuBackend,
    pipeline: &'a SpritePipeline,
    encoder: &'a mut wgpu::CommandEncoder,
    target: &'a wgpu::TextureView,
    output_size: Option<SurfaceSize>,
    bind_groups: Vec<wgpu::BindGroup>,
    instances: Vec<SpriteInstance>,
    in_batch: bool,
    passes: usize,
}

impl<'a> WgpuFrame<'a> {
    /// Wrap `encoder` for drawing into `target`.
    ///
    /// `output_size` is `None` when the host has no render target bound this
    /// frame; the overlay then keeps its current size.
    #[must_use]
    pub fn new(
        backend: &'a WgpuBackend,
        pipeline: &'a SpritePipeline,
        encoder: &'a mut wgpu::CommandEncoder,
        target: &'a wgpu::TextureView,
        output_size: Option<SurfaceSize>,
    ) -> Self {
        Self {
            backend,
            pipeline,
            encoder,
            target,
            output_size,
            bind_groups: Vec::new(),
            instances: Vec::new(),
            in_batch: false,
            passes: 0,
        }
    }

    /// Number of sprite passes recorded so far.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl HostPipeline<WgpuView> for WgpuFrame<'_> {
    fn output_size(&self) -> Option<SurfaceSize> {
        self.output_size
    }

    fn begin_sprites(&mut self) {
        self.bind_groups.clear();
        self.instances.clear();
        self.in_batch = true;
    }

    fn draw_sprite(&mut self, view: &WgpuView, sprite: &Sprite) {
        if !self.in_batch {
            tracing::warn!("Sprite drawn outside a batch, ignoring");
            return;
        }
        if self.instances.len() == MAX_SPRITES {
            tracing::warn!("Sprite batch full ({MAX_SPRITES}), dropping sprite");
            return;
        }

        let bind_group = {
            let _scope = self.backend.scope_guard();
            self.pipeline.bind_view(self.backend.device(), view.raw())
        };
        self.bind_groups.push(bind_group);
        self.instances.push(SpriteInstance::from(sprite));
    }

    fn end_sprites(&mut self) {
        self.in_batch = false;
        let Some(output) = self.output_size.filter(|size| !size.is_empty()) else {
            return;
        };
        if self.instances.is_empty() {
            return;
        }

        let count = self
            .pipeline
            .prepare(self.backend.queue(), output, &self.instances);

        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay_sprite_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.pipeline.draw(&mut pass, &self.bind_groups[..count]);
        drop(pass);

        self.passes += 1;
        tracing::trace!(sprites = count, "Overlay sprite pass recorded");
    }
}
