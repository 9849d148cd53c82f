//! Deterministic pointer paths for headless renders.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::cli::PathKind;

const CIRCLE_RADIUS: f32 = 0.25;
const SWEEP_START: f32 = 0.15;
const SWEEP_END: f32 = 0.85;

/// Normalized pointer position at `frame` of a `total`-frame render.
pub fn position(kind: PathKind, frame: u32, total: u32) -> Vec2 {
    let t = if total > 1 {
        frame.min(total - 1) as f32 / (total - 1) as f32
    } else {
        0.0
    };
    let centre = Vec2::splat(0.5);
    match kind {
        PathKind::Circle => {
            let angle = t * TAU;
            centre + Vec2::new(angle.cos(), angle.sin()) * CIRCLE_RADIUS
        }
        PathKind::Sweep => Vec2::new(SWEEP_START + (SWEEP_END - SWEEP_START) * t, 0.5),
        PathKind::Still => centre,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_spans_the_middle_row() {
        assert_eq!(position(PathKind::Sweep, 0, 10), Vec2::new(0.15, 0.5));
        let last = position(PathKind::Sweep, 9, 10);
        assert!((last.x - 0.85).abs() < 1e-6);
        assert_eq!(last.y, 0.5);
    }

    #[test]
    fn circle_keeps_its_radius() {
        for frame in 0..16 {
            let p = position(PathKind::Circle, frame, 16);
            assert!((p.distance(Vec2::splat(0.5)) - 0.25).abs() < 1e-5);
        }
    }

    #[test]
    fn still_never_moves() {
        assert_eq!(position(PathKind::Still, 0, 5), position(PathKind::Still, 4, 5));
    }

    #[test]
    fn single_frame_sits_at_the_start() {
        assert_eq!(position(PathKind::Sweep, 0, 1), Vec2::new(0.15, 0.5));
    }
}
