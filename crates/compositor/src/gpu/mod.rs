//! wgpu backend for the frame pipeline.
//!
//! - `context` owns the instance, adapter, device, and window surface.
//! - `targets` allocates the paint, low-res, scene and post textures for a layout.
//! - `pipeline` builds the pass pipelines and their bind groups.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `backend` implements `FrameBackend` by recording every pass into one
//!   encoder per frame, submitted together with the scene's commands.
//! - `scene` is the GPU demo scene.

mod backend;
mod context;
mod pipeline;
mod scene;
mod targets;
mod uniforms;

pub use backend::{GpuBackend, GpuScene, SceneTarget};
pub use context::AdapterProfile;
pub use scene::DemoGpuScene;
