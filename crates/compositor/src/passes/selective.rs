//! Selective post stage. Near the pointer, wherever the composed image departs
//! from the clean scene, it is spiral-blurred with a frosted grain and then
//! colour-split in proportion to how far it departs.

use std::f32::consts::TAU;

use fxconfig::DistortionParameters;
use glam::{Vec2, Vec4};
use image::{Rgba, Rgba32FImage};

use super::composite::{sample_rgba, texel};
use super::paint::smoothstep;

/// Taps along the blur spiral.
pub const SPIRAL_TAPS: u32 = 16;
/// Spiral reach per unit of blur strength at full mask.
pub const SPIRAL_SCALE: f32 = 0.008;
/// Peak-to-peak amplitude of the frosted grain.
pub const FROST_AMPLITUDE: f32 = 0.03;
/// Red/blue offset at full colour-split mask.
pub const FRINGE_OFFSET: f32 = 0.005;
/// Blur masks at or below this leave the pixel alone.
const BLUR_CUTOFF: f32 = 0.01;

/// Sine hash in `[0, 1)`, the GLSL `fract(sin(dot(..)) * 43758.5453)` idiom.
pub fn frost(uv: Vec2) -> f32 {
    let h = uv.dot(Vec2::new(12.9898, 78.233)).sin() * 43758.5453;
    h - h.floor()
}

struct PostInputs<'a> {
    distorted: &'a Rgba32FImage,
    clean: &'a Rgba32FImage,
    pointer: Vec2,
    aspect: f32,
    params: &'a DistortionParameters,
}

impl PostInputs<'_> {
    fn blur_mask(&self, uv: Vec2, distorted: Vec4, clean: Vec4) -> f32 {
        let scale = Vec2::new(self.aspect, 1.0);
        let distance = ((uv - self.pointer) * scale).length();
        let radial = 1.0 - smoothstep(0.0, self.params.selective_blur_radius, distance);
        let departure = (distorted.truncate() - clean.truncate()).length();
        (radial * smoothstep(0.01, 0.1, departure)).clamp(0.0, 1.0)
    }

    /// Selective blur at `uv` given the distorted and clean colours there.
    fn frosted(&self, uv: Vec2, distorted: Vec4, clean: Vec4) -> Vec4 {
        let strength = self.params.selective_blur_strength;
        if strength <= 0.0 {
            return distorted;
        }
        let mask = self.blur_mask(uv, distorted, clean);
        if mask <= BLUR_CUTOFF {
            return distorted;
        }

        let reach = strength * mask * SPIRAL_SCALE;
        let mut acc = Vec4::ZERO;
        for i in 0..SPIRAL_TAPS {
            let f = i as f32 / SPIRAL_TAPS as f32;
            let angle = f * TAU;
            let offset = Vec2::new(angle.cos(), angle.sin()) * f * reach;
            acc += sample_rgba(self.distorted, uv + offset);
        }
        let grain = (frost(uv) - 0.5) * FROST_AMPLITUDE;
        let blurred = acc / SPIRAL_TAPS as f32 + Vec4::new(grain, grain, grain, 0.0);
        distorted.lerp(blurred, mask)
    }

    fn frosted_at(&self, uv: Vec2) -> Vec4 {
        self.frosted(
            uv,
            sample_rgba(self.distorted, uv),
            sample_rgba(self.clean, uv),
        )
    }
}

/// Post-stage colour of output pixel `(x, y)`. `distorted` is the composed
/// image, `clean` the captured scene, `pointer` the normalized pointer position.
pub fn selective_pixel(
    distorted: &Rgba32FImage,
    clean: &Rgba32FImage,
    x: u32,
    y: u32,
    pointer: Vec2,
    params: &DistortionParameters,
) -> Vec4 {
    let (width, height) = distorted.dimensions();
    let uv = Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    );
    let inputs = PostInputs {
        distorted,
        clean,
        pointer,
        aspect: if params.aspect_correct {
            width as f32 / height as f32
        } else {
            1.0
        },
        params,
    };

    let clean_here = texel(clean, x, y);
    let base = inputs.frosted(uv, texel(distorted, x, y), clean_here);
    if !params.selective_chromatic {
        return base;
    }
    let departure = (base.truncate() - clean_here.truncate()).length();
    let mask = smoothstep(0.01, 0.5, departure);
    if mask <= 0.0 {
        return base;
    }
    let offset = Vec2::splat(FRINGE_OFFSET * mask);
    Vec4::new(
        inputs.frosted_at(uv + offset).x,
        base.y,
        inputs.frosted_at(uv - offset).z,
        base.w,
    )
}

/// Runs the post stage over the whole image. All three images share dimensions.
pub fn selective(
    distorted: &Rgba32FImage,
    clean: &Rgba32FImage,
    output: &mut Rgba32FImage,
    pointer: Vec2,
    params: &DistortionParameters,
) {
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        *pixel = Rgba(selective_pixel(distorted, clean, x, y, pointer, params).to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frosted_params() -> DistortionParameters {
        DistortionParameters {
            selective_blur_strength: 10.0,
            selective_blur_radius: 0.3,
            selective_chromatic: true,
            ..Default::default()
        }
    }

    fn checker(width: u32, height: u32) -> Rgba32FImage {
        Rgba32FImage::from_fn(width, height, |x, y| {
            let v = if (x / 2 + y / 2) % 2 == 0 { 0.9 } else { 0.1 };
            Rgba([v, 0.5, 1.0 - v, 1.0])
        })
    }

    #[test]
    fn frost_stays_in_unit_interval() {
        for i in 0..64 {
            let uv = Vec2::new(i as f32 / 64.0, 1.0 - i as f32 / 97.0);
            let value = frost(uv);
            assert!((0.0..1.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn undistorted_image_passes_through_exactly() {
        let scene = checker(32, 32);
        let mut output = Rgba32FImage::new(32, 32);
        selective(&scene, &scene, &mut output, Vec2::splat(0.5), &frosted_params());
        assert_eq!(output, scene);
    }

    #[test]
    fn blur_stays_inside_the_pointer_radius() {
        let distorted = checker(32, 32);
        let clean = Rgba32FImage::from_pixel(32, 32, Rgba([0.5, 0.5, 0.5, 1.0]));
        let params = DistortionParameters {
            selective_blur_strength: 10.0,
            selective_blur_radius: 0.1,
            ..Default::default()
        };
        let pointer = Vec2::new(0.25, 0.25);
        let mut output = Rgba32FImage::new(32, 32);
        selective(&distorted, &clean, &mut output, pointer, &params);

        // (0.25, 0.25) sits between texels 7 and 8; texel 24 is half a viewport away
        assert_eq!(output.get_pixel(24, 24), distorted.get_pixel(24, 24));
        assert_eq!(output.get_pixel(31, 0), distorted.get_pixel(31, 0));
        assert_ne!(output.get_pixel(7, 7), distorted.get_pixel(7, 7));
    }

    #[test]
    fn blur_keeps_alpha() {
        let distorted = checker(16, 16);
        let clean = Rgba32FImage::new(16, 16);
        let mut output = Rgba32FImage::new(16, 16);
        selective(&distorted, &clean, &mut output, Vec2::splat(0.5), &frosted_params());
        assert!(output.pixels().all(|pixel| pixel.0[3] == 1.0));
        assert_ne!(output, distorted);
    }

    #[test]
    fn colour_split_offsets_red_and_blue() {
        let (width, height) = (200, 20);
        let distorted = Rgba32FImage::from_fn(width, height, |x, _| {
            let u = (x as f32 + 0.5) / width as f32;
            Rgba([u, 0.5, 1.0 - u, 1.0])
        });
        let clean = Rgba32FImage::new(width, height);
        let params = DistortionParameters {
            selective_chromatic: true,
            ..Default::default()
        };

        // far from the scene everywhere, so the split mask saturates
        let pixel = selective_pixel(&distorted, &clean, 100, 10, Vec2::splat(0.5), &params);
        let base = Vec4::from_array(distorted.get_pixel(100, 10).0);
        assert!((pixel.x - (base.x + FRINGE_OFFSET)).abs() < 1e-4, "{pixel:?}");
        assert_eq!(pixel.y, base.y);
        assert!((pixel.z - (base.z + FRINGE_OFFSET)).abs() < 1e-4, "{pixel:?}");
        assert_eq!(pixel.w, 1.0);
    }

    #[test]
    fn spiral_matches_shader_constants() {
        assert_eq!(SPIRAL_TAPS, 16);
        assert_eq!(SPIRAL_SCALE, 0.008);
        assert_eq!(FRINGE_OFFSET, 0.005);
    }
}
