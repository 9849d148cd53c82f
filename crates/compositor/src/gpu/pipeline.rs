use anyhow::{anyhow, Result};
use fxconfig::FeedbackSource;

use crate::compile::{
    compile_fragment_shader, compile_vertex_shader, COMPOSITE_FRAGMENT_GLSL,
    DOWNSAMPLE_FRAGMENT_GLSL, PAINT_FRAGMENT_GLSL, SELECTIVE_FRAGMENT_GLSL,
};
use crate::pingpong::PaintSlot;

use super::targets::{GpuFrameBuffers, FIELD_FORMAT, SCENE_FORMAT};
use super::uniforms::{CompositeUniforms, DownsampleUniforms, PaintUniforms, SelectiveUniforms};

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Builds a pipeline that draws the shared full-screen triangle with `fragment`.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// Runs `build` inside a validation error scope and turns a captured error
/// into an `anyhow` failure instead of a device panic.
pub(crate) fn checked<T>(
    device: &wgpu::Device,
    what: &str,
    build: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(anyhow!("failed to build {what}: {err}")),
        None => Ok(value),
    }
}

pub(crate) struct UniformBuffers {
    pub paint: wgpu::Buffer,
    pub downsample: wgpu::Buffer,
    pub composite: wgpu::Buffer,
    pub selective: wgpu::Buffer,
}

impl UniformBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let buffer = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            paint: buffer("paint uniforms", std::mem::size_of::<PaintUniforms>()),
            downsample: buffer(
                "downsample uniforms",
                std::mem::size_of::<DownsampleUniforms>(),
            ),
            composite: buffer(
                "composite uniforms",
                std::mem::size_of::<CompositeUniforms>(),
            ),
            selective: buffer(
                "selective uniforms",
                std::mem::size_of::<SelectiveUniforms>(),
            ),
        }
    }
}

/// Pipelines, layouts, and uniform buffers for the field, compositing and post
/// passes. Built once per device; only the bind groups depend on the frame
/// buffers.
pub(crate) struct PassPipelines {
    pub paint: wgpu::RenderPipeline,
    pub downsample: wgpu::RenderPipeline,
    pub composite: wgpu::RenderPipeline,
    /// Composite into the offscreen distorted target for the post stage.
    pub composite_offscreen: wgpu::RenderPipeline,
    pub selective: wgpu::RenderPipeline,
    field_layout: wgpu::BindGroupLayout,
    /// Uniform block, two colour textures and a sampler.
    blend_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pub uniforms: UniformBuffers,
}

impl PassPipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self> {
        checked(device, "pass pipelines", || {
            let field_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("field pass layout"),
                entries: &[uniform_entry(0), texture_entry(1), sampler_entry(2)],
            });
            let blend_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("blend layout"),
                    entries: &[
                        uniform_entry(0),
                        texture_entry(1),
                        texture_entry(2),
                        sampler_entry(3),
                    ],
                });

            let vertex = compile_vertex_shader(device);
            let paint_fragment = compile_fragment_shader(device, "paint fragment", PAINT_FRAGMENT_GLSL);
            let downsample_fragment =
                compile_fragment_shader(device, "downsample fragment", DOWNSAMPLE_FRAGMENT_GLSL);
            let composite_fragment =
                compile_fragment_shader(device, "composite fragment", COMPOSITE_FRAGMENT_GLSL);
            let selective_fragment =
                compile_fragment_shader(device, "selective fragment", SELECTIVE_FRAGMENT_GLSL);

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("field sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            });

            Self {
                paint: fullscreen_pipeline(
                    device,
                    "paint pipeline",
                    &field_layout,
                    &vertex,
                    &paint_fragment,
                    FIELD_FORMAT,
                ),
                downsample: fullscreen_pipeline(
                    device,
                    "downsample pipeline",
                    &field_layout,
                    &vertex,
                    &downsample_fragment,
                    FIELD_FORMAT,
                ),
                composite: fullscreen_pipeline(
                    device,
                    "composite pipeline",
                    &blend_layout,
                    &vertex,
                    &composite_fragment,
                    surface_format,
                ),
                composite_offscreen: fullscreen_pipeline(
                    device,
                    "offscreen composite pipeline",
                    &blend_layout,
                    &vertex,
                    &composite_fragment,
                    SCENE_FORMAT,
                ),
                selective: fullscreen_pipeline(
                    device,
                    "selective pipeline",
                    &blend_layout,
                    &vertex,
                    &selective_fragment,
                    surface_format,
                ),
                field_layout,
                blend_layout,
                sampler,
                uniforms: UniformBuffers::new(device),
            }
        })
    }

    fn field_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        uniforms: &wgpu::Buffer,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.field_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn blend_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        uniforms: &wgpu::Buffer,
        first: &wgpu::TextureView,
        second: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.blend_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(first),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(second),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Binds every pass to the given frame buffers.
    pub fn bind(&self, device: &wgpu::Device, buffers: &GpuFrameBuffers) -> PassBindGroups {
        let paint_uniforms = &self.uniforms.paint;
        let downsample_uniforms = &self.uniforms.downsample;
        let composite_uniforms = &self.uniforms.composite;
        let selective_uniforms = &self.uniforms.selective;
        PassBindGroups {
            paint_from_low_res: self.field_group(
                device,
                "paint from low-res",
                paint_uniforms,
                &buffers.low_res.view,
            ),
            paint_from_slot: [
                self.field_group(device, "paint from A", paint_uniforms, &buffers.paint[0].view),
                self.field_group(device, "paint from B", paint_uniforms, &buffers.paint[1].view),
            ],
            downsample_from_slot: [
                self.field_group(
                    device,
                    "downsample from A",
                    downsample_uniforms,
                    &buffers.paint[0].view,
                ),
                self.field_group(
                    device,
                    "downsample from B",
                    downsample_uniforms,
                    &buffers.paint[1].view,
                ),
            ],
            composite_from_scene: [
                self.blend_group(
                    device,
                    "composite scene A",
                    composite_uniforms,
                    &buffers.scene[0].view,
                    &buffers.low_res.view,
                ),
                self.blend_group(
                    device,
                    "composite scene B",
                    composite_uniforms,
                    &buffers.scene[1].view,
                    &buffers.low_res.view,
                ),
            ],
            selective_from_scene: [
                self.blend_group(
                    device,
                    "selective scene A",
                    selective_uniforms,
                    &buffers.distorted.view,
                    &buffers.scene[0].view,
                ),
                self.blend_group(
                    device,
                    "selective scene B",
                    selective_uniforms,
                    &buffers.distorted.view,
                    &buffers.scene[1].view,
                ),
            ],
        }
    }
}

pub(crate) struct PassBindGroups {
    paint_from_low_res: wgpu::BindGroup,
    paint_from_slot: [wgpu::BindGroup; 2],
    downsample_from_slot: [wgpu::BindGroup; 2],
    composite_from_scene: [wgpu::BindGroup; 2],
    selective_from_scene: [wgpu::BindGroup; 2],
}

impl PassBindGroups {
    pub fn paint_seed(&self, feedback: FeedbackSource, previous: PaintSlot) -> &wgpu::BindGroup {
        match feedback {
            FeedbackSource::Blurred => &self.paint_from_low_res,
            FeedbackSource::Working => &self.paint_from_slot[previous.index()],
        }
    }

    pub fn downsample_from(&self, source: PaintSlot) -> &wgpu::BindGroup {
        &self.downsample_from_slot[source.index()]
    }

    pub fn composite_with_scene(&self, scene_index: usize) -> &wgpu::BindGroup {
        &self.composite_from_scene[scene_index]
    }

    pub fn selective_with_scene(&self, scene_index: usize) -> &wgpu::BindGroup {
        &self.selective_from_scene[scene_index]
    }
}
