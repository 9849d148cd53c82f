//! Distortion compositor: warps, motion-blurs, and colour-fringes the scene
//! along the low-resolution velocity field.

use fxconfig::DistortionParameters;
use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, Rgba32FImage};

use crate::field::VectorField;
use crate::noise::jitter;

/// Field magnitudes below this leave the scene texel untouched.
pub const MOTION_EPSILON: f32 = 0.001;
/// Fraction of the motion vector used as the base offset for the colour fringe.
pub const CHROMATIC_SHIFT: f32 = 0.025;

pub(crate) fn texel(image: &Rgba32FImage, x: u32, y: u32) -> Vec4 {
    Vec4::from_array(image.get_pixel(x, y).0)
}

/// Bilinear lookup with clamp-to-edge addressing.
pub fn sample_rgba(image: &Rgba32FImage, uv: Vec2) -> Vec4 {
    let (width, height) = image.dimensions();
    let px = uv.x * width as f32 - 0.5;
    let py = uv.y * height as f32 - 0.5;
    let x0 = px.floor();
    let y0 = py.floor();
    let fx = px - x0;
    let fy = py - y0;

    let clamp_x = |x: f32| (x as i64).clamp(0, i64::from(width) - 1) as u32;
    let clamp_y = |y: f32| (y as i64).clamp(0, i64::from(height) - 1) as u32;
    let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
    let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

    let top = texel(image, xa, ya).lerp(texel(image, xb, ya), fx);
    let bottom = texel(image, xa, yb).lerp(texel(image, xb, yb), fx);
    top.lerp(bottom, fy)
}

/// Final colour of output pixel `(x, y)`.
pub fn composite_pixel(
    scene: &Rgba32FImage,
    field: &VectorField,
    x: u32,
    y: u32,
    frame: u32,
    params: &DistortionParameters,
) -> Vec4 {
    let direct = texel(scene, x, y);
    let (width, height) = scene.dimensions();
    let uv = Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    );

    let motion = field.sample(uv);
    let magnitude = motion.length();
    if magnitude < MOTION_EPSILON {
        return direct;
    }

    let samples = params.motion_blur_samples.max(1);
    let mut acc = Vec4::ZERO;
    let mut total = 0.0;
    for i in 0..samples {
        let t = if samples == 1 {
            0.0
        } else {
            i as f32 / (samples - 1) as f32
        };
        let weight = 1.0 - 0.5 * t;
        let offset = motion * t * params.blur_extent
            + jitter(params.noise_seed, frame, i, params.jitter_amplitude);
        acc += sample_rgba(scene, uv - offset) * weight;
        total += weight;
    }
    let blurred = acc / total;

    let blend = (magnitude * params.magnitude_gain).clamp(0.0, 1.0);
    let base = direct.lerp(blurred, blend);

    let shift = motion * CHROMATIC_SHIFT;
    let chroma = motion / magnitude * params.chromatic_offset_scale * blend;
    let fringe = Vec3::new(
        sample_rgba(scene, uv - shift - chroma).x,
        sample_rgba(scene, uv - shift).y,
        sample_rgba(scene, uv - shift + chroma).z,
    );

    base.truncate().lerp(fringe, blend).extend(direct.w)
}

/// Composes the whole output image. `output` must match the scene dimensions.
pub fn composite(
    scene: &Rgba32FImage,
    field: &VectorField,
    output: &mut Rgba32FImage,
    frame: u32,
    params: &DistortionParameters,
) {
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        *pixel = Rgba(composite_pixel(scene, field, x, y, frame, params).to_array());
    }
}
