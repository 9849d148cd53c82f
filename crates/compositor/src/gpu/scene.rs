use crate::backend::SceneError;
use crate::compile::{compile_fragment_shader, compile_vertex_shader, SCENE_FRAGMENT_GLSL};
use crate::scene::DemoScene;
use crate::types::FrameInfo;

use super::backend::{GpuScene, SceneTarget};
use super::pipeline::{checked, fullscreen_pipeline, uniform_entry};
use super::uniforms::SceneUniforms;

struct DemoResources {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
}

impl DemoResources {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        checked(device, "demo scene pipeline", || {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("demo scene layout"),
                entries: &[uniform_entry(0)],
            });
            let vertex = compile_vertex_shader(device);
            let fragment = compile_fragment_shader(device, "demo scene fragment", SCENE_FRAGMENT_GLSL);
            let pipeline =
                fullscreen_pipeline(device, "demo scene pipeline", &layout, &vertex, &fragment, format);
            let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("demo scene uniforms"),
                size: std::mem::size_of::<SceneUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("demo scene bind group"),
                layout: &layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }],
            });
            Self {
                pipeline,
                uniforms,
                bind_group,
                format,
            }
        })
    }
}

/// GPU rendition of [`DemoScene`]. Resources are created on first use.
#[derive(Default)]
pub struct DemoGpuScene {
    timing: DemoScene,
    resources: Option<DemoResources>,
}

impl GpuScene for DemoGpuScene {
    fn render(&mut self, target: SceneTarget<'_>, frame: &FrameInfo) -> Result<(), SceneError> {
        if self
            .resources
            .as_ref()
            .is_none_or(|resources| resources.format != target.format)
        {
            let resources = DemoResources::new(target.device, target.format)
                .map_err(|err| SceneError::new(format!("{err:#}")))?;
            self.resources = Some(resources);
        }
        let Some(resources) = self.resources.as_ref() else {
            return Err(SceneError::new("demo scene resources unavailable"));
        };

        let uniforms = SceneUniforms::new(self.timing.seconds_at(frame.index), target.size);
        target
            .queue
            .write_buffer(&resources.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("demo scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&resources.pipeline);
        pass.set_bind_group(0, &resources.bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
