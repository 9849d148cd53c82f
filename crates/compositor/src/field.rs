use std::collections::TryReserveError;

use glam::Vec2;

use crate::types::DisplaySize;

/// Two-channel field stored row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    size: DisplaySize,
    data: Vec<Vec2>,
}

impl VectorField {
    /// Allocates a zeroed field, reporting allocator failure instead of aborting.
    pub fn try_new(size: DisplaySize) -> Result<Self, TryReserveError> {
        let len = size.texel_count() as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, Vec2::ZERO);
        Ok(Self { size, data })
    }

    pub fn size(&self) -> DisplaySize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn get(&self, x: u32, y: u32) -> Vec2 {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Vec2) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub fn texels(&self) -> &[Vec2] {
        &self.data
    }

    /// Normalized coordinate of the centre of texel `(x, y)`.
    pub fn uv_of(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.size.width as f32,
            (y as f32 + 0.5) / self.size.height as f32,
        )
    }

    /// Bilinear lookup with clamp-to-edge addressing.
    pub fn sample(&self, uv: Vec2) -> Vec2 {
        let px = uv.x * self.size.width as f32 - 0.5;
        let py = uv.y * self.size.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self
            .clamped(x0, y0)
            .lerp(self.clamped(x0 + 1, y0), fx);
        let bottom = self
            .clamped(x0, y0 + 1)
            .lerp(self.clamped(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    pub fn max_magnitude(&self) -> f32 {
        self.data
            .iter()
            .map(|value| value.length())
            .fold(0.0, f32::max)
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|value| *value == Vec2::ZERO)
    }

    pub fn clear(&mut self) {
        self.data.fill(Vec2::ZERO);
    }

    fn clamped(&self, x: i64, y: i64) -> Vec2 {
        let x = x.clamp(0, i64::from(self.size.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.size.height) - 1) as u32;
        self.get(x, y)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> VectorField {
        let mut field = VectorField::try_new(DisplaySize::new(width, height)).unwrap();
        for y in 0..height {
            for x in 0..width {
                field.set(x, y, Vec2::new(x as f32, y as f32));
            }
        }
        field
    }

    #[test]
    fn new_field_is_zero() {
        let field = VectorField::try_new(DisplaySize::new(7, 3)).unwrap();
        assert_eq!(field.texels().len(), 21);
        assert!(field.is_zero());
        assert_eq!(field.max_magnitude(), 0.0);
    }

    #[test]
    fn sampling_texel_centres_returns_texel() {
        let field = ramp(5, 3);
        for y in 0..3 {
            for x in 0..5 {
                let value = field.sample(field.uv_of(x, y));
                assert!((value - field.get(x, y)).length() < 1e-4);
            }
        }
    }

    #[test]
    fn sampling_between_texels_interpolates() {
        let field = ramp(4, 4);
        let value = field.sample(Vec2::new(0.25, 0.5));
        assert!((value - Vec2::new(0.5, 1.5)).length() < 1e-5);
    }

    #[test]
    fn sampling_clamps_to_edges() {
        let field = ramp(4, 4);
        assert_eq!(field.sample(Vec2::new(-1.0, -1.0)), Vec2::ZERO);
        assert_eq!(field.sample(Vec2::new(2.0, 2.0)), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn clear_zeroes_every_texel() {
        let mut field = ramp(3, 2);
        assert!(!field.is_zero());
        field.clear();
        assert!(field.is_zero());
    }
}
