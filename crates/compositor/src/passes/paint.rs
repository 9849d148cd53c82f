//! Velocity painter: decays the seed field and splats pointer motion into it.

use fxconfig::DistortionParameters;
use glam::Vec2;

use crate::field::VectorField;
use crate::types::PointerSample;

/// Hermite interpolation between `edge0` and `edge1`, matching GLSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Brush weight at `distance` from the stroke: 1 on the stroke, 0 at `radius` and beyond.
pub fn falloff(distance: f32, radius: f32) -> f32 {
    1.0 - smoothstep(0.0, radius, distance)
}

/// Distance from `uv` to the segment the pointer swept during the last frame.
///
/// Horizontal offsets are multiplied by `aspect` so the brush stays round on
/// non-square viewports.
pub fn stroke_distance(uv: Vec2, pointer: &PointerSample, aspect: f32) -> f32 {
    let scale = Vec2::new(aspect, 1.0);
    let end = pointer.position * scale;
    let start = pointer.previous_position() * scale;
    let point = uv * scale;

    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq == 0.0 {
        return point.distance(end);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// The painter equation for a single texel given its already-decayed seed.
pub fn paint_value(
    decayed: Vec2,
    uv: Vec2,
    pointer: &PointerSample,
    params: &DistortionParameters,
    aspect: f32,
) -> Vec2 {
    if !pointer.is_moving() {
        return decayed;
    }
    let influence = falloff(stroke_distance(uv, pointer, aspect), params.trail_radius);
    decayed + pointer.velocity * influence * params.splat_gain
}

/// Writes one frame of the velocity field into `target`.
///
/// `seed` may be at a different resolution than `target`; it is read with
/// bilinear filtering at each target texel centre. `aspect` is the display
/// width over height.
pub fn paint_field(
    seed: &VectorField,
    target: &mut VectorField,
    pointer: &PointerSample,
    params: &DistortionParameters,
    aspect: f32,
) {
    let aspect = if params.aspect_correct { aspect } else { 1.0 };
    let texel = target.size().texel();
    let diffusion = params.diffusion;

    for y in 0..target.height() {
        for x in 0..target.width() {
            let uv = target.uv_of(x, y);
            let mut seeded = seed.sample(uv);
            if diffusion > 0.0 {
                let neighbours = (seed.sample(uv + Vec2::new(texel.x, 0.0))
                    + seed.sample(uv - Vec2::new(texel.x, 0.0))
                    + seed.sample(uv + Vec2::new(0.0, texel.y))
                    + seed.sample(uv - Vec2::new(0.0, texel.y)))
                    * 0.25;
                seeded = seeded.lerp(neighbours, diffusion);
            }
            let decayed = seeded * params.decay_factor;
            target.set(x, y, paint_value(decayed, uv, pointer, params, aspect));
        }
    }
}
