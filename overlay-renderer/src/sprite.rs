//! Sprite compositor: instanced rendering of textured quads.
//!
//! Each sprite is one instance of a six-vertex quad generated in the vertex
//! shader. Positions are in output pixels with the origin at the top-left.
//! Blending is straight (non-premultiplied) alpha over whatever the host has
//! already drawn.

use bytemuck::{Pod, Zeroable};
use overlay_core::{Sprite, SurfaceSize};
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferAddress, BufferBindingType, BufferDescriptor, BufferUsages, ColorTargetState,
    ColorWrites, Device, FilterMode, FragmentState, FrontFace, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode, PrimitiveState,
    PrimitiveTopology, Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor, Sampler,
    SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderStages, TextureFormat,
    TextureSampleType, TextureView, TextureViewDimension, VertexAttribute, VertexBufferLayout,
    VertexFormat, VertexState, VertexStepMode,
};

/// Maximum sprites per batch.
pub const MAX_SPRITES: usize = 16;

/// Per-instance data for one sprite. 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Top-left corner in output pixels.
    pub position: [f32; 2],
    /// Drawn width and height in output pixels.
    pub extent: [f32; 2],
    /// RGBA multiplier.
    pub tint: [f32; 4],
}

impl SpriteInstance {
    fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            // location(1) = extent
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
            // location(2) = tint
            VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: VertexFormat::Float32x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: ATTRS,
        }
    }
}

impl From<&Sprite> for SpriteInstance {
    fn from(sprite: &Sprite) -> Self {
        Self {
            position: sprite.position,
            extent: sprite.extent(),
            tint: sprite.tint,
        }
    }
}

/// Output dimensions, padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ScreenUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

impl ScreenUniform {
    #[allow(clippy::cast_precision_loss)] // Output dimensions fit in f32
    fn new(size: SurfaceSize) -> Self {
        Self {
            size: [size.width as f32, size.height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Owns the pipeline, buffers and sampler for sprite drawing.
pub struct SpritePipeline {
    pipeline: RenderPipeline,
    instance_buffer: Buffer,
    screen_buffer: Buffer,
    screen_bind_group: BindGroup,
    texture_bgl: BindGroupLayout,
    sampler: Sampler,
    target_format: TextureFormat,
}

impl SpritePipeline {
    /// Create the pipeline for a render target of `target_format`.
    #[must_use]
    pub fn new(device: &Device, target_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("overlay_sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        // Screen uniform (group 0)
        let screen_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("overlay_sprite_screen_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Per-sprite texture (group 1)
        let texture_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("overlay_sprite_texture_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("overlay_sprite_pipeline_layout"),
            bind_group_layouts: &[&screen_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("overlay_sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[SpriteInstance::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: target_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let instance_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("overlay_sprite_instances"),
            size: (MAX_SPRITES * std::mem::size_of::<SpriteInstance>()) as BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let screen_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("overlay_sprite_screen_ub"),
            size: std::mem::size_of::<ScreenUniform>() as BufferAddress,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let screen_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("overlay_sprite_screen_bg"),
            layout: &screen_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("overlay_sprite_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            instance_buffer,
            screen_buffer,
            screen_bind_group,
            texture_bgl,
            sampler,
            target_format,
        }
    }

    /// Format of the render target this pipeline writes.
    #[must_use]
    pub fn target_format(&self) -> TextureFormat {
        self.target_format
    }

    /// Bind a texture view for drawing as a sprite.
    #[must_use]
    pub fn bind_view(&self, device: &Device, view: &TextureView) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("overlay_sprite_texture_bg"),
            layout: &self.texture_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Upload the output size and instance data for this batch.
    ///
    /// Returns the number of instances uploaded, at most [`MAX_SPRITES`].
    /// Uploads land at the next queue submission, so only one batch per
    /// submission may be in flight.
    pub fn prepare(&self, queue: &Queue, output: SurfaceSize, instances: &[SpriteInstance]) -> usize {
        let count = instances.len().min(MAX_SPRITES);
        queue.write_buffer(
            &self.screen_buffer,
            0,
            bytemuck::bytes_of(&ScreenUniform::new(output)),
        );
        if count > 0 {
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instances[..count]),
            );
        }
        count
    }

    /// Record one draw per texture. `textures[i]` pairs with instance `i`
    /// from the last [`prepare`](Self::prepare).
    pub fn draw(&self, pass: &mut RenderPass<'_>, textures: &[BindGroup]) {
        if textures.is_empty() {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.screen_bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        for (index, texture) in (0u32..).zip(textures.iter().take(MAX_SPRITES)) {
            pass.set_bind_group(1, texture, &[]);
            pass.draw(0..6, index..index + 1);
        }
    }
}
