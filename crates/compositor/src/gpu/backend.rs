use anyhow::Result;
use fxconfig::DistortionParameters;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;

use crate::backend::{FrameBackend, PassError, SceneError};
use crate::pingpong::{PaintSlot, PaintSlots};
use crate::types::{BufferLayout, DisplaySize, FrameInfo, PointerSample};

use super::context::{AdapterProfile, GpuContext};
use super::pipeline::{PassBindGroups, PassPipelines};
use super::targets::{GpuFrameBuffers, SCENE_FORMAT};
use super::uniforms::{CompositeUniforms, DownsampleUniforms, PaintUniforms, SelectiveUniforms};

/// Where a [`GpuScene`] draws this frame. The encoder is private to the scene
/// capture and is discarded if the scene reports an error.
pub struct SceneTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: DisplaySize,
}

/// Scene collaborator for [`GpuBackend`]. Implementations own their camera and
/// any GPU resources they need.
pub trait GpuScene {
    fn render(&mut self, target: SceneTarget<'_>, frame: &FrameInfo) -> Result<(), SceneError>;
}

struct InFlightFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    scene_commands: Option<wgpu::CommandBuffer>,
    /// Scene buffer written this frame, committed on present.
    captured_scene: Option<usize>,
}

/// Runs the pipeline on a wgpu device and presents into a window surface.
pub struct GpuBackend {
    context: GpuContext,
    pipelines: PassPipelines,
    buffers: Option<GpuFrameBuffers>,
    bind_groups: Option<PassBindGroups>,
    current_scene: usize,
    frame: Option<InFlightFrame>,
}

impl GpuBackend {
    pub fn new<T>(target: &T, size: DisplaySize) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size)?;
        let pipelines = PassPipelines::new(&context.device, context.surface_format)?;
        Ok(Self {
            context,
            pipelines,
            buffers: None,
            bind_groups: None,
            current_scene: 0,
            frame: None,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    fn resources(&self) -> Result<(&GpuFrameBuffers, &PassBindGroups), PassError> {
        match (self.buffers.as_ref(), self.bind_groups.as_ref()) {
            (Some(buffers), Some(groups)) => Ok((buffers, groups)),
            _ => Err(PassError::Unallocated),
        }
    }
}

fn field_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    cleared_pass(encoder, label, view, wgpu::Color::TRANSPARENT)
}

fn cleared_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

impl FrameBackend for GpuBackend {
    type Scene = dyn GpuScene;

    fn allocate(&mut self, layout: BufferLayout) -> Result<(), PassError> {
        self.frame = None;
        let buffers = GpuFrameBuffers::allocate(
            &self.context.device,
            &self.context.adapter_profile,
            layout,
        )?;
        self.context.resize(layout.display);
        let groups = self.pipelines.bind(&self.context.device, &buffers);
        debug!(display = %layout.display, "allocated GPU frame buffers");
        self.buffers = Some(buffers);
        self.bind_groups = Some(groups);
        self.current_scene = 0;
        Ok(())
    }

    fn verify_layout(&self, layout: &BufferLayout) -> Result<(), PassError> {
        let (buffers, _) = self.resources()?;
        buffers.verify(layout)?;
        let surface = self.context.size();
        if surface != layout.display {
            return Err(PassError::DimensionMismatch {
                label: "surface",
                expected: layout.display,
                actual: surface,
            });
        }
        Ok(())
    }

    fn begin_frame(&mut self, _frame: &FrameInfo) -> Result<(), PassError> {
        self.resources()?;
        let surface_texture = match self.context.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                if matches!(err, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.context.reconfigure();
                }
                return Err(err.into());
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trailfx passes"),
            });
        self.frame = Some(InFlightFrame {
            surface_texture,
            view,
            encoder,
            scene_commands: None,
            captured_scene: None,
        });
        Ok(())
    }

    fn capture_scene(
        &mut self,
        scene: &mut Self::Scene,
        frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        let (Some(buffers), Some(in_flight)) = (self.buffers.as_ref(), self.frame.as_mut()) else {
            return Err(SceneError::new("no frame in flight"));
        };
        let target_index = 1 - self.current_scene;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scene capture"),
                });
        scene.render(
            SceneTarget {
                device: &self.context.device,
                queue: &self.context.queue,
                encoder: &mut encoder,
                view: &buffers.scene[target_index].view,
                format: SCENE_FORMAT,
                size: buffers.layout.display,
            },
            frame,
        )?;
        in_flight.scene_commands = Some(encoder.finish());
        in_flight.captured_scene = Some(target_index);
        Ok(())
    }

    fn paint(
        &mut self,
        slots: PaintSlots,
        pointer: &PointerSample,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let (buffers, groups) = match (self.buffers.as_ref(), self.bind_groups.as_ref()) {
            (Some(buffers), Some(groups)) => (buffers, groups),
            _ => return Err(PassError::Unallocated),
        };
        let in_flight = self.frame.as_mut().ok_or(PassError::Unallocated)?;

        let uniforms = PaintUniforms::new(
            pointer,
            params,
            frame.layout.display,
            frame.layout.paint,
        );
        self.context.queue.write_buffer(
            &self.pipelines.uniforms.paint,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let target = buffers.paint_target(slots.write);
        let mut pass = field_pass(&mut in_flight.encoder, "paint pass", &target.view);
        pass.set_pipeline(&self.pipelines.paint);
        pass.set_bind_group(0, groups.paint_seed(params.feedback, slots.read), &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn downsample(
        &mut self,
        source: PaintSlot,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let (buffers, groups) = match (self.buffers.as_ref(), self.bind_groups.as_ref()) {
            (Some(buffers), Some(groups)) => (buffers, groups),
            _ => return Err(PassError::Unallocated),
        };
        let in_flight = self.frame.as_mut().ok_or(PassError::Unallocated)?;

        let uniforms = DownsampleUniforms::new(&params.blur_kernel, frame.layout.low_res);
        self.context.queue.write_buffer(
            &self.pipelines.uniforms.downsample,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let mut pass = field_pass(&mut in_flight.encoder, "downsample pass", &buffers.low_res.view);
        pass.set_pipeline(&self.pipelines.downsample);
        pass.set_bind_group(0, groups.downsample_from(source), &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn composite(
        &mut self,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let (buffers, groups) = match (self.buffers.as_ref(), self.bind_groups.as_ref()) {
            (Some(buffers), Some(groups)) => (buffers, groups),
            _ => return Err(PassError::Unallocated),
        };
        let in_flight = self.frame.as_mut().ok_or(PassError::Unallocated)?;
        let scene_index = in_flight.captured_scene.unwrap_or(self.current_scene);

        let uniforms = CompositeUniforms::new(params, frame);
        self.context.queue.write_buffer(
            &self.pipelines.uniforms.composite,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let (view, pipeline) = if params.post_effects_enabled() {
            (&buffers.distorted.view, &self.pipelines.composite_offscreen)
        } else {
            (&in_flight.view, &self.pipelines.composite)
        };
        let mut pass = cleared_pass(
            &mut in_flight.encoder,
            "composite pass",
            view,
            wgpu::Color::BLACK,
        );
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, groups.composite_with_scene(scene_index), &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn post_process(
        &mut self,
        pointer: &PointerSample,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let groups = self.bind_groups.as_ref().ok_or(PassError::Unallocated)?;
        let in_flight = self.frame.as_mut().ok_or(PassError::Unallocated)?;
        let scene_index = in_flight.captured_scene.unwrap_or(self.current_scene);

        let uniforms = SelectiveUniforms::new(pointer, params, frame.layout.display);
        self.context.queue.write_buffer(
            &self.pipelines.uniforms.selective,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let mut pass = cleared_pass(
            &mut in_flight.encoder,
            "selective pass",
            &in_flight.view,
            wgpu::Color::BLACK,
        );
        pass.set_pipeline(&self.pipelines.selective);
        pass.set_bind_group(0, groups.selective_with_scene(scene_index), &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn present(&mut self) -> Result<(), PassError> {
        let in_flight = self.frame.take().ok_or(PassError::Unallocated)?;
        let mut commands = Vec::with_capacity(2);
        if let Some(scene) = in_flight.scene_commands {
            commands.push(scene);
        }
        commands.push(in_flight.encoder.finish());
        self.context.queue.submit(commands);
        in_flight.surface_texture.present();
        if let Some(index) = in_flight.captured_scene {
            self.current_scene = index;
        }
        Ok(())
    }

    fn abandon_frame(&mut self) {
        // Dropping the surface texture without presenting returns it to the swapchain.
        self.frame = None;
    }
}
