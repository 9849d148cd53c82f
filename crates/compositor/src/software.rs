//! CPU backend. Runs the same passes as the GPU pipeline on plain buffers,
//! which makes it the reference for headless rendering and for tests.

use fxconfig::{DistortionParameters, FeedbackSource};
use image::Rgba32FImage;
use tracing::trace;

use crate::backend::{FrameBackend, PassError, SceneError};
use crate::field::VectorField;
use crate::passes;
use crate::pingpong::{split_pair, PaintSlot, PaintSlots};
use crate::types::{BufferLayout, DisplaySize, FrameInfo, PointerSample};

/// Scene collaborator for [`SoftwareBackend`].
pub trait SoftwareScene {
    /// Draws the whole frame into `target`, which is sized to the display.
    fn render(&mut self, target: &mut Rgba32FImage, frame: &FrameInfo) -> Result<(), SceneError>;
}

impl<F> SoftwareScene for F
where
    F: FnMut(&mut Rgba32FImage, &FrameInfo) -> Result<(), SceneError>,
{
    fn render(&mut self, target: &mut Rgba32FImage, frame: &FrameInfo) -> Result<(), SceneError> {
        self(target, frame)
    }
}

struct Buffers {
    layout: BufferLayout,
    paint: [VectorField; 2],
    low_res: VectorField,
    scene: Rgba32FImage,
    scene_scratch: Rgba32FImage,
    output: Rgba32FImage,
    post_scratch: Rgba32FImage,
}

#[derive(Default)]
pub struct SoftwareBackend {
    buffers: Option<Buffers>,
    texel_budget: Option<u64>,
    presented: u64,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses allocations whose combined texel count exceeds `texels`.
    pub fn with_texel_budget(texels: u64) -> Self {
        Self {
            texel_budget: Some(texels),
            ..Self::default()
        }
    }

    /// The most recently composed image.
    pub fn output(&self) -> Option<&Rgba32FImage> {
        self.buffers.as_ref().map(|buffers| &buffers.output)
    }

    pub fn scene_color(&self) -> Option<&Rgba32FImage> {
        self.buffers.as_ref().map(|buffers| &buffers.scene)
    }

    pub fn low_res_field(&self) -> Option<&VectorField> {
        self.buffers.as_ref().map(|buffers| &buffers.low_res)
    }

    pub fn paint_field(&self, slot: PaintSlot) -> Option<&VectorField> {
        self.buffers
            .as_ref()
            .map(|buffers| &buffers.paint[slot.index()])
    }

    fn buffers_mut(&mut self) -> Result<&mut Buffers, PassError> {
        self.buffers.as_mut().ok_or(PassError::Unallocated)
    }
}

fn field(label: &'static str, size: DisplaySize) -> Result<VectorField, PassError> {
    VectorField::try_new(size).map_err(|err| PassError::Allocation {
        label,
        width: size.width,
        height: size.height,
        reason: err.to_string(),
    })
}

fn image(label: &'static str, size: DisplaySize) -> Result<Rgba32FImage, PassError> {
    let len = size.texel_count() as usize * 4;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|err| PassError::Allocation {
            label,
            width: size.width,
            height: size.height,
            reason: err.to_string(),
        })?;
    data.resize(len, 0.0);
    Rgba32FImage::from_raw(size.width, size.height, data).ok_or(PassError::Allocation {
        label,
        width: size.width,
        height: size.height,
        reason: "buffer size does not match dimensions".into(),
    })
}

fn check(label: &'static str, expected: DisplaySize, actual: DisplaySize) -> Result<(), PassError> {
    if expected == actual {
        Ok(())
    } else {
        Err(PassError::DimensionMismatch {
            label,
            expected,
            actual,
        })
    }
}

fn image_size(image: &Rgba32FImage) -> DisplaySize {
    let (width, height) = image.dimensions();
    DisplaySize::new(width, height)
}

impl FrameBackend for SoftwareBackend {
    type Scene = dyn SoftwareScene;

    fn allocate(&mut self, layout: BufferLayout) -> Result<(), PassError> {
        if let Some(budget) = self.texel_budget {
            let needed = layout.display.texel_count() * 4
                + layout.paint.texel_count() * 2
                + layout.low_res.texel_count();
            if needed > budget {
                return Err(PassError::Allocation {
                    label: "frame buffers",
                    width: layout.display.width,
                    height: layout.display.height,
                    reason: format!("{needed} texels exceeds budget of {budget}"),
                });
            }
        }

        let buffers = Buffers {
            layout,
            paint: [field("paint A", layout.paint)?, field("paint B", layout.paint)?],
            low_res: field("low-res field", layout.low_res)?,
            scene: image("scene colour", layout.display)?,
            scene_scratch: image("scene scratch", layout.display)?,
            output: image("output", layout.display)?,
            post_scratch: image("post scratch", layout.display)?,
        };
        self.buffers = Some(buffers);
        Ok(())
    }

    fn verify_layout(&self, layout: &BufferLayout) -> Result<(), PassError> {
        let buffers = self.buffers.as_ref().ok_or(PassError::Unallocated)?;
        check("paint A", layout.paint, buffers.paint[0].size())?;
        check("paint B", layout.paint, buffers.paint[1].size())?;
        check("low-res field", layout.low_res, buffers.low_res.size())?;
        check("scene colour", layout.display, image_size(&buffers.scene))?;
        check("output", layout.display, image_size(&buffers.output))?;
        check("post scratch", layout.display, image_size(&buffers.post_scratch))
    }

    fn begin_frame(&mut self, frame: &FrameInfo) -> Result<(), PassError> {
        let buffers = self.buffers_mut()?;
        check("frame buffers", frame.layout.display, buffers.layout.display)
    }

    fn capture_scene(
        &mut self,
        scene: &mut Self::Scene,
        frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(SceneError::new("frame buffers have not been allocated"));
        };
        buffers
            .scene_scratch
            .copy_from_slice(buffers.scene.as_raw());
        scene.render(&mut buffers.scene_scratch, frame)?;
        std::mem::swap(&mut buffers.scene, &mut buffers.scene_scratch);
        Ok(())
    }

    fn paint(
        &mut self,
        slots: PaintSlots,
        pointer: &PointerSample,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let aspect = frame.layout.display.aspect();
        let buffers = self.buffers_mut()?;
        let (previous, target) = split_pair(&mut buffers.paint, slots);
        let seed = match params.feedback {
            FeedbackSource::Blurred => &buffers.low_res,
            FeedbackSource::Working => previous,
        };
        passes::paint_field(seed, target, pointer, params, aspect);
        Ok(())
    }

    fn downsample(
        &mut self,
        source: PaintSlot,
        params: &DistortionParameters,
        _frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let buffers = self.buffers_mut()?;
        passes::downsample(
            &buffers.paint[source.index()],
            &mut buffers.low_res,
            &params.blur_kernel,
        );
        Ok(())
    }

    fn composite(
        &mut self,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let buffers = self.buffers_mut()?;
        passes::composite(
            &buffers.scene,
            &buffers.low_res,
            &mut buffers.output,
            frame.noise_frame(),
            params,
        );
        Ok(())
    }

    fn post_process(
        &mut self,
        pointer: &PointerSample,
        params: &DistortionParameters,
        _frame: &FrameInfo,
    ) -> Result<(), PassError> {
        let buffers = self.buffers_mut()?;
        passes::selective(
            &buffers.output,
            &buffers.scene,
            &mut buffers.post_scratch,
            pointer.position,
            params,
        );
        std::mem::swap(&mut buffers.output, &mut buffers.post_scratch);
        Ok(())
    }

    fn present(&mut self) -> Result<(), PassError> {
        self.presented += 1;
        trace!(frame = self.presented, "software frame ready");
        Ok(())
    }

    fn abandon_frame(&mut self) {}
}
