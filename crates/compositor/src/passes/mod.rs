//! CPU renditions of the field, compositing and post passes. The GLSL shaders
//! in `compile.rs` implement the same equations for the GPU backend.

pub mod blur;
pub mod composite;
pub mod paint;
pub mod selective;

pub use blur::downsample;
pub use composite::{composite, composite_pixel, sample_rgba, CHROMATIC_SHIFT, MOTION_EPSILON};
pub use paint::{falloff, paint_field, paint_value, smoothstep, stroke_distance};
pub use selective::{selective, selective_pixel, SPIRAL_TAPS};
