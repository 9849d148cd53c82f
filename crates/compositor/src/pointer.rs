use glam::Vec2;

use crate::types::PointerSample;

/// Turns raw cursor positions into one [`PointerSample`] per frame.
///
/// Positions may arrive many times between frames; only the most recent one is
/// kept. Velocity is the displacement between two consecutive latches, so the
/// first latch after construction or [`PointerTracker::reset`] always reports a
/// pointer at rest.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pending: Option<Vec2>,
    last_latched: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a position in normalized viewport coordinates (top-left origin).
    pub fn move_to(&mut self, position: Vec2) {
        self.pending = Some(position);
    }

    /// Records a position in physical pixels for a viewport of the given size.
    pub fn move_to_pixels(&mut self, x: f64, y: f64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.move_to(Vec2::new(
            (x / f64::from(width)) as f32,
            (y / f64::from(height)) as f32,
        ));
    }

    /// Forgets the velocity history; the pointer keeps its last position.
    pub fn reset(&mut self) {
        if self.pending.is_none() {
            self.pending = self.last_latched;
        }
        self.last_latched = None;
    }

    /// Called when the cursor leaves the viewport.
    pub fn leave(&mut self) {
        self.reset();
    }

    /// Produces the sample for `frame`.
    pub fn latch(&mut self, frame: u64) -> PointerSample {
        let current = self
            .pending
            .take()
            .or(self.last_latched)
            .unwrap_or(Vec2::splat(0.5));
        let velocity = match self.last_latched {
            Some(previous) => current - previous,
            None => Vec2::ZERO,
        };
        self.last_latched = Some(current);
        PointerSample {
            position: current,
            velocity,
            frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-6
    }

    #[test]
    fn first_latch_is_at_rest() {
        let mut tracker = PointerTracker::new();
        tracker.move_to(Vec2::new(0.3, 0.4));
        let sample = tracker.latch(0);
        assert!(close(sample.position, Vec2::new(0.3, 0.4)));
        assert_eq!(sample.velocity, Vec2::ZERO);
    }

    #[test]
    fn velocity_is_delta_between_latches() {
        let mut tracker = PointerTracker::new();
        tracker.move_to(Vec2::new(0.5, 0.5));
        tracker.latch(0);
        tracker.move_to(Vec2::new(0.55, 0.5));
        tracker.move_to(Vec2::new(0.6, 0.5));
        let sample = tracker.latch(1);
        assert!(close(sample.velocity, Vec2::new(0.1, 0.0)));
        assert_eq!(sample.frame, 1);

        let idle = tracker.latch(2);
        assert_eq!(idle.velocity, Vec2::ZERO);
        assert!(close(idle.position, Vec2::new(0.6, 0.5)));
    }

    #[test]
    fn reset_drops_velocity_history() {
        let mut tracker = PointerTracker::new();
        tracker.move_to(Vec2::new(0.1, 0.1));
        tracker.latch(0);
        tracker.move_to(Vec2::new(0.9, 0.9));
        tracker.reset();
        let sample = tracker.latch(1);
        assert_eq!(sample.velocity, Vec2::ZERO);
        assert!(close(sample.position, Vec2::new(0.9, 0.9)));
    }

    #[test]
    fn pixel_positions_normalise_by_viewport() {
        let mut tracker = PointerTracker::new();
        tracker.move_to_pixels(320.0, 120.0, 640, 480);
        assert!(close(tracker.latch(0).position, Vec2::new(0.5, 0.25)));
    }
}
