use fxconfig::DistortionParameters;
use thiserror::Error;

use crate::pingpong::{PaintSlot, PaintSlots};
use crate::types::{BufferLayout, DisplaySize, FrameInfo, PointerSample};

/// Failure of a buffer operation or render pass. The frame it happens in is
/// dropped; the previously presented image stays on screen.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("failed to allocate {label} ({width}x{height}): {reason}")]
    Allocation {
        label: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("{label} is {actual} but the frame expects {expected}")]
    DimensionMismatch {
        label: &'static str,
        expected: DisplaySize,
        actual: DisplaySize,
    },
    #[error("frame buffers have not been allocated")]
    Unallocated,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("device error: {0}")]
    Device(String),
}

impl PassError {
    /// Whether the buffers must be rebuilt before the next frame can run.
    pub fn requires_reallocation(&self) -> bool {
        match self {
            PassError::Allocation { .. }
            | PassError::DimensionMismatch { .. }
            | PassError::Unallocated => true,
            PassError::Surface(err) => matches!(
                err,
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated
            ),
            PassError::Device(_) => false,
        }
    }
}

/// Raised by a scene collaborator that could not draw this frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("scene render failed: {message}")]
pub struct SceneError {
    pub message: String,
}

impl SceneError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A place the frame pipeline can run: owns the frame buffers and executes the
/// passes in the order the orchestrator calls them.
///
/// Buffers are `paint[2]` and `low_res` for the velocity field, `scene` for the
/// captured colour, and the presentation target. The post stage adds one
/// display-sized intermediate.
pub trait FrameBackend {
    /// Scene collaborator this backend knows how to capture.
    type Scene: ?Sized;

    /// (Re)creates every buffer for `layout`, all fields zeroed. On failure the
    /// previous buffers must remain usable.
    fn allocate(&mut self, layout: BufferLayout) -> Result<(), PassError>;

    /// Checks that every live buffer matches `layout`.
    fn verify_layout(&self, layout: &BufferLayout) -> Result<(), PassError>;

    fn begin_frame(&mut self, frame: &FrameInfo) -> Result<(), PassError>;

    /// Renders the scene. On error the previous scene colour must be kept intact.
    fn capture_scene(
        &mut self,
        scene: &mut Self::Scene,
        frame: &FrameInfo,
    ) -> Result<(), SceneError>;

    /// Writes `slots.write` from the configured feedback seed and the pointer.
    fn paint(
        &mut self,
        slots: PaintSlots,
        pointer: &PointerSample,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError>;

    /// Filters the given paint buffer into the low-resolution field.
    fn downsample(
        &mut self,
        source: PaintSlot,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError>;

    /// Composes the scene through the low-res field. When the parameters enable
    /// the post stage the result goes to an intermediate image for it.
    fn composite(
        &mut self,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError>;

    /// Selective blur and colour split over the composed image. Only called
    /// when [`DistortionParameters::post_effects_enabled`] holds.
    fn post_process(
        &mut self,
        pointer: &PointerSample,
        params: &DistortionParameters,
        frame: &FrameInfo,
    ) -> Result<(), PassError>;

    fn present(&mut self) -> Result<(), PassError>;

    /// Drops any partially recorded work for the current frame.
    fn abandon_frame(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reallocation_follows_error_kind() {
        let alloc = PassError::Allocation {
            label: "paint A",
            width: 4,
            height: 4,
            reason: "out of memory".into(),
        };
        assert!(alloc.requires_reallocation());
        assert!(PassError::Surface(wgpu::SurfaceError::Outdated).requires_reallocation());
        assert!(!PassError::Surface(wgpu::SurfaceError::Timeout).requires_reallocation());
        assert!(!PassError::Device("validation".into()).requires_reallocation());
    }

    #[test]
    fn mismatch_message_names_sizes() {
        let err = PassError::DimensionMismatch {
            label: "low-res field",
            expected: DisplaySize::new(8, 8),
            actual: DisplaySize::new(4, 4),
        };
        assert_eq!(
            err.to_string(),
            "low-res field is 4x4 but the frame expects 8x8"
        );
    }
}
