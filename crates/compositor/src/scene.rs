//! Procedural demo scene used by the preview window and headless renders.
//!
//! A dim checkerboard with three discs orbiting the centre. The GLSL version in
//! `compile.rs` draws the same picture on the GPU.

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, Rgba32FImage};

use crate::backend::SceneError;
use crate::passes::smoothstep;
use crate::software::SoftwareScene;
use crate::types::FrameInfo;

const CHECKER_CELLS: f32 = 12.0;
const ORBIT_RADIUS: f32 = 0.28;
const DISC_RADIUS: f32 = 0.1;

const PALETTE: [Vec3; 3] = [
    Vec3::new(0.95, 0.36, 0.31),
    Vec3::new(0.29, 0.82, 0.62),
    Vec3::new(0.36, 0.52, 0.98),
];

/// Colour of the demo scene at `uv` after `seconds` of animation.
pub fn demo_colour(uv: Vec2, aspect: f32, seconds: f32) -> Vec4 {
    let cell = (uv * CHECKER_CELLS).floor();
    let checker = (cell.x + cell.y).rem_euclid(2.0);
    let mut colour = Vec3::new(0.08, 0.09, 0.14).lerp(Vec3::new(0.16, 0.18, 0.26), checker);

    let point = Vec2::new((uv.x - 0.5) * aspect, uv.y - 0.5);
    for (k, tint) in PALETTE.iter().enumerate() {
        let angle = seconds * 0.6 + k as f32 * std::f32::consts::TAU / 3.0;
        let centre = Vec2::new(angle.cos(), angle.sin()) * ORBIT_RADIUS;
        let d = point.distance(centre);
        let disc = 1.0 - smoothstep(DISC_RADIUS - 0.01, DISC_RADIUS, d);
        colour = colour.lerp(*tint, disc);
    }
    colour.extend(1.0)
}

/// Animated demo scene for the software backend.
#[derive(Debug, Clone)]
pub struct DemoScene {
    frames_per_second: f32,
}

impl DemoScene {
    pub fn new(frames_per_second: f32) -> Self {
        Self { frames_per_second }
    }

    pub fn seconds_at(&self, frame: u64) -> f32 {
        frame as f32 / self.frames_per_second.max(1.0)
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl SoftwareScene for DemoScene {
    fn render(&mut self, target: &mut Rgba32FImage, frame: &FrameInfo) -> Result<(), SceneError> {
        let (width, height) = target.dimensions();
        if width == 0 || height == 0 {
            return Err(SceneError::new("empty scene target"));
        }
        let aspect = width as f32 / height as f32;
        let seconds = self.seconds_at(frame.index);
        for (x, y, pixel) in target.enumerate_pixels_mut() {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            *pixel = Rgba(demo_colour(uv, aspect, seconds).to_array());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferLayout, DisplaySize};

    #[test]
    fn discs_cover_their_orbit_points() {
        let centre = Vec2::new(0.5 + ORBIT_RADIUS, 0.5);
        let colour = demo_colour(centre, 1.0, 0.0);
        assert!((colour.truncate() - PALETTE[0]).length() < 1e-5);
        assert_eq!(colour.w, 1.0);
    }

    #[test]
    fn scene_animates_over_frames() {
        let mut scene = DemoScene::default();
        let layout = BufferLayout::for_display(DisplaySize::new(32, 32));
        let mut first = Rgba32FImage::new(32, 32);
        let mut later = Rgba32FImage::new(32, 32);
        scene
            .render(&mut first, &FrameInfo { index: 0, layout })
            .unwrap();
        scene
            .render(&mut later, &FrameInfo { index: 90, layout })
            .unwrap();
        assert_ne!(first, later);
        assert!(first.pixels().all(|p| p.0[3] == 1.0));
    }
}
