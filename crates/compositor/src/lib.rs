//! Pointer-reactive distortion compositor.
//!
//! Each frame the pointer paints a velocity field, the field is blurred into a
//! low-resolution copy, and that copy displaces, smears, and colour-splits the
//! captured scene. The overall flow is:
//!
//! ```text
//!   PointerTracker ──▶ PointerSample
//!                           │
//!                           ▼
//!   FrameOrchestrator::render_frame
//!          │  resize? ──▶ allocate(BufferLayout)
//!          │  capture_scene ──▶ sceneColor (kept on failure)
//!          ▼
//!   paint ──▶ paint[write] ──▶ downsample ──▶ lowRes ──▶ composite ──▶ [selective] ──▶ present
//!     ▲                                         │
//!     └──────────── feedback (next frame) ◀─────┘
//! ```
//!
//! The bracketed selective stage only runs when its parameters switch it on.
//!
//! The passes run against a [`FrameBackend`]. [`SoftwareBackend`] evaluates them
//! on the CPU with `image` buffers and is what the headless renderer and the
//! tests use; [`gpu::GpuBackend`] records the same passes as `wgpu` render
//! passes compiled from the GLSL in `compile`, and drives the preview window.

pub mod backend;
pub mod compile;
pub mod field;
pub mod gpu;
pub mod noise;
pub mod orchestrator;
pub mod passes;
pub mod pingpong;
pub mod pointer;
pub mod scene;
pub mod software;
pub mod types;
pub mod window;

pub use backend::{FrameBackend, PassError, SceneError};
pub use field::VectorField;
pub use orchestrator::{FrameOrchestrator, FrameOutcome, FrameStats, SkipReason};
pub use pingpong::{PaintSlot, PaintSlots, PingPong};
pub use pointer::PointerTracker;
pub use scene::{demo_colour, DemoScene};
pub use software::{SoftwareBackend, SoftwareScene};
pub use types::{BufferLayout, DisplaySize, FrameInfo, PointerSample};
pub use window::{run_preview, PreviewConfig};
