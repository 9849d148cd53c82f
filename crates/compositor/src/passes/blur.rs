//! Separable-weight box/tent filter that resamples the working field into the
//! low-resolution driving field.

use fxconfig::BlurKernel;
use glam::Vec2;

use crate::field::VectorField;

/// Filters `source` into `target`, one kernel centred on every target texel.
///
/// Taps are spaced one target texel apart and read bilinearly, so the kernel
/// covers the same normalized footprint regardless of the source resolution.
pub fn downsample(source: &VectorField, target: &mut VectorField, kernel: &BlurKernel) {
    let weights = kernel.weights();
    let radius = kernel.radius();
    let texel = target.size().texel();

    for y in 0..target.height() {
        for x in 0..target.width() {
            let centre = target.uv_of(x, y);
            let mut acc = Vec2::ZERO;
            for (j, wy) in weights.iter().enumerate() {
                let dy = (j as i32 - radius) as f32 * texel.y;
                for (i, wx) in weights.iter().enumerate() {
                    let dx = (i as i32 - radius) as f32 * texel.x;
                    acc += source.sample(centre + Vec2::new(dx, dy)) * (wx * wy);
                }
            }
            target.set(x, y, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DisplaySize;
    use fxconfig::KernelShape;

    fn uniform(size: DisplaySize, value: Vec2) -> VectorField {
        let mut field = VectorField::try_new(size).unwrap();
        for y in 0..size.height {
            for x in 0..size.width {
                field.set(x, y, value);
            }
        }
        field
    }

    #[test]
    fn uniform_field_is_preserved() {
        let source = uniform(DisplaySize::new(16, 12), Vec2::new(0.3, -0.2));
        for width in [1, 3, 5, 7] {
            for shape in [KernelShape::Box, KernelShape::Tent] {
                let mut target = VectorField::try_new(DisplaySize::new(8, 6)).unwrap();
                downsample(&source, &mut target, &BlurKernel { width, shape });
                for value in target.texels() {
                    assert!((*value - Vec2::new(0.3, -0.2)).length() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn zero_source_gives_zero_target() {
        let source = VectorField::try_new(DisplaySize::new(16, 16)).unwrap();
        let mut target = uniform(DisplaySize::new(8, 8), Vec2::ONE);
        downsample(&source, &mut target, &BlurKernel::default());
        assert!(target.is_zero());
    }

    #[test]
    fn box_kernel_spreads_a_spike_to_neighbours() {
        let size = DisplaySize::new(5, 5);
        let mut source = VectorField::try_new(size).unwrap();
        source.set(2, 2, Vec2::new(9.0, 0.0));
        let mut target = VectorField::try_new(size).unwrap();
        downsample(
            &source,
            &mut target,
            &BlurKernel {
                width: 3,
                shape: KernelShape::Box,
            },
        );
        assert!((target.get(2, 2).x - 1.0).abs() < 1e-4);
        assert!((target.get(1, 1).x - 1.0).abs() < 1e-4);
        assert!(target.get(0, 0).x.abs() < 1e-4);
    }
}
