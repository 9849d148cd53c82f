//! std140 mirrors of the uniform blocks declared in `compile.rs`. Everything is
//! packed into vec4 slots so the Rust and GLSL layouts agree without padding.

use bytemuck::{Pod, Zeroable};
use fxconfig::{BlurKernel, DistortionParameters};

use crate::types::{DisplaySize, FrameInfo, PointerSample};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct PaintUniforms {
    /// xy position, zw velocity.
    pub pointer: [f32; 4],
    /// x aspect, y decay, z trail radius, w splat gain.
    pub brush: [f32; 4],
    /// xy target texel size, z diffusion.
    pub spread: [f32; 4],
}

impl PaintUniforms {
    pub fn new(
        pointer: &PointerSample,
        params: &DistortionParameters,
        display: DisplaySize,
        target: DisplaySize,
    ) -> Self {
        let aspect = if params.aspect_correct {
            display.aspect()
        } else {
            1.0
        };
        let texel = target.texel();
        Self {
            pointer: [
                pointer.position.x,
                pointer.position.y,
                pointer.velocity.x,
                pointer.velocity.y,
            ],
            brush: [
                aspect,
                params.decay_factor,
                params.trail_radius,
                params.splat_gain,
            ],
            spread: [texel.x, texel.y, params.diffusion, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DownsampleUniforms {
    /// xy target texel size, z radius, w width.
    pub kernel: [f32; 4],
    pub weights: [[f32; 4]; 2],
}

impl DownsampleUniforms {
    pub fn new(kernel: &BlurKernel, target: DisplaySize) -> Self {
        let texel = target.texel();
        let mut weights = [[0.0; 4]; 2];
        for (index, weight) in kernel.weights().into_iter().take(8).enumerate() {
            weights[index / 4][index % 4] = weight;
        }
        Self {
            kernel: [
                texel.x,
                texel.y,
                kernel.radius() as f32,
                kernel.width as f32,
            ],
            weights,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct CompositeUniforms {
    /// x blur extent, y magnitude gain, z chromatic scale, w jitter amplitude.
    pub blur: [f32; 4],
    /// x sample count, y noise seed, z frame.
    pub sampling: [u32; 4],
}

impl CompositeUniforms {
    pub fn new(params: &DistortionParameters, frame: &FrameInfo) -> Self {
        Self {
            blur: [
                params.blur_extent,
                params.magnitude_gain,
                params.chromatic_offset_scale,
                params.jitter_amplitude,
            ],
            sampling: [
                params.motion_blur_samples,
                params.noise_seed,
                frame.noise_frame(),
                0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SelectiveUniforms {
    /// xy position, z aspect.
    pub pointer: [f32; 4],
    /// x blur strength, y blur radius, z colour split (0 or 1).
    pub effect: [f32; 4],
}

impl SelectiveUniforms {
    pub fn new(pointer: &PointerSample, params: &DistortionParameters, display: DisplaySize) -> Self {
        let aspect = if params.aspect_correct {
            display.aspect()
        } else {
            1.0
        };
        Self {
            pointer: [pointer.position.x, pointer.position.y, aspect, 0.0],
            effect: [
                params.selective_blur_strength,
                params.selective_blur_radius,
                if params.selective_chromatic { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SceneUniforms {
    /// x seconds, y aspect.
    pub frame: [f32; 4],
}

impl SceneUniforms {
    pub fn new(seconds: f32, size: DisplaySize) -> Self {
        Self {
            frame: [seconds, size.aspect(), 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BufferLayout;
    use fxconfig::KernelShape;

    #[test]
    fn uniform_sizes_are_vec4_multiples() {
        assert_eq!(std::mem::size_of::<PaintUniforms>(), 48);
        assert_eq!(std::mem::size_of::<DownsampleUniforms>(), 48);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 32);
        assert_eq!(std::mem::size_of::<SelectiveUniforms>(), 32);
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 16);
    }

    #[test]
    fn downsample_packs_weights_in_order() {
        let kernel = BlurKernel {
            width: 5,
            shape: KernelShape::Tent,
        };
        let uniforms = DownsampleUniforms::new(&kernel, DisplaySize::new(10, 20));
        let expected = kernel.weights();
        assert_eq!(&uniforms.weights[0], &expected[..4]);
        assert_eq!(uniforms.weights[1][0], expected[4]);
        assert_eq!(uniforms.weights[1][1], 0.0);
        assert_eq!(uniforms.kernel, [0.1, 0.05, 2.0, 5.0]);
    }

    #[test]
    fn paint_uniforms_honour_aspect_toggle() {
        let pointer = PointerSample::new(0.5, 0.5, 0.1, 0.0, 0);
        let display = DisplaySize::new(200, 100);
        let mut params = DistortionParameters::default();
        let corrected = PaintUniforms::new(&pointer, &params, display, display.scaled_down(4));
        assert_eq!(corrected.brush[0], 2.0);
        params.aspect_correct = false;
        let flat = PaintUniforms::new(&pointer, &params, display, display.scaled_down(4));
        assert_eq!(flat.brush[0], 1.0);
    }

    #[test]
    fn selective_uniforms_pack_switches() {
        let pointer = PointerSample::new(0.25, 0.75, 0.0, 0.0, 3);
        let params = fxconfig::Preset::Frosted.parameters();
        let uniforms = SelectiveUniforms::new(&pointer, &params, DisplaySize::new(300, 100));
        assert_eq!(uniforms.pointer, [0.25, 0.75, 3.0, 0.0]);
        assert_eq!(uniforms.effect, [10.0, 0.3, 1.0, 0.0]);

        let plain = SelectiveUniforms::new(
            &pointer,
            &DistortionParameters::default(),
            DisplaySize::new(300, 100),
        );
        assert_eq!(plain.effect[0], 0.0);
        assert_eq!(plain.effect[2], 0.0);
    }

    #[test]
    fn composite_uniforms_carry_frame_and_seed() {
        let params = DistortionParameters {
            noise_seed: 77,
            ..Default::default()
        };
        let frame = FrameInfo {
            index: 12,
            layout: BufferLayout::for_display(DisplaySize::new(8, 8)),
        };
        let uniforms = CompositeUniforms::new(&params, &frame);
        assert_eq!(uniforms.sampling, [16, 77, 12, 0]);
    }
}
