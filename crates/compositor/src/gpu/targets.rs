use crate::backend::PassError;
use crate::pingpong::PaintSlot;
use crate::types::{BufferLayout, DisplaySize};

use super::context::AdapterProfile;

/// Velocity fields: two half-float channels, filterable on every adapter.
pub(crate) const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;
/// Captured scene colour.
pub(crate) const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

pub(crate) struct RenderTarget {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: DisplaySize,
    pub label: &'static str,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        size: DisplaySize,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            size,
            label,
        }
    }

    fn verify(&self, expected: DisplaySize) -> Result<(), PassError> {
        if self.size == expected {
            Ok(())
        } else {
            Err(PassError::DimensionMismatch {
                label: self.label,
                expected,
                actual: self.size,
            })
        }
    }
}

/// Every texture the passes read or write. New textures are zero-initialised
/// by wgpu, which gives the cold-start state: zero fields and a transparent
/// black scene.
pub(crate) struct GpuFrameBuffers {
    pub layout: BufferLayout,
    pub paint: [RenderTarget; 2],
    pub low_res: RenderTarget,
    /// Scene captures alternate between these so a failed capture never
    /// touches the colour the compositor reads.
    pub scene: [RenderTarget; 2],
    /// Composite output when the post stage runs.
    pub distorted: RenderTarget,
}

impl GpuFrameBuffers {
    pub fn allocate(
        device: &wgpu::Device,
        profile: &AdapterProfile,
        layout: BufferLayout,
    ) -> Result<Self, PassError> {
        if !profile.fits(layout.display) {
            return Err(PassError::Allocation {
                label: "scene colour",
                width: layout.display.width,
                height: layout.display.height,
                reason: format!(
                    "exceeds the adapter's {}px texture limit",
                    profile.max_texture_dimension
                ),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffers = Self {
            layout,
            paint: [
                RenderTarget::new(device, "paint A", layout.paint, FIELD_FORMAT),
                RenderTarget::new(device, "paint B", layout.paint, FIELD_FORMAT),
            ],
            low_res: RenderTarget::new(device, "low-res field", layout.low_res, FIELD_FORMAT),
            scene: [
                RenderTarget::new(device, "scene colour A", layout.display, SCENE_FORMAT),
                RenderTarget::new(device, "scene colour B", layout.display, SCENE_FORMAT),
            ],
            distorted: RenderTarget::new(device, "distorted colour", layout.display, SCENE_FORMAT),
        };
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = out_of_memory.or(validation) {
            return Err(PassError::Allocation {
                label: "frame buffers",
                width: layout.display.width,
                height: layout.display.height,
                reason: err.to_string(),
            });
        }
        Ok(buffers)
    }

    pub fn verify(&self, layout: &BufferLayout) -> Result<(), PassError> {
        for target in &self.paint {
            target.verify(layout.paint)?;
        }
        self.low_res.verify(layout.low_res)?;
        for target in &self.scene {
            target.verify(layout.display)?;
        }
        self.distorted.verify(layout.display)
    }

    pub fn paint_target(&self, slot: PaintSlot) -> &RenderTarget {
        &self.paint[slot.index()]
    }
}
