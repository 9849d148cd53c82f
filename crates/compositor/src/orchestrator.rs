use fxconfig::{DistortionParameters, ParameterError};
use tracing::{debug, warn};

use crate::backend::{FrameBackend, PassError};
use crate::pingpong::PingPong;
use crate::types::{BufferLayout, DisplaySize, FrameInfo, PointerSample};

/// Why a frame was dropped without presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Buffers could not be (re)allocated; retried next frame.
    Allocation,
    /// Live buffers disagree with the display size; reallocated next frame.
    DimensionMismatch,
    /// A pass failed after the frame began.
    PassFailure,
    /// The display has zero area.
    EmptyDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Presented, but over the previous frame's scene because capture failed.
    PresentedStale,
    Skipped(SkipReason),
}

impl FrameOutcome {
    pub fn presented(&self) -> bool {
        matches!(self, FrameOutcome::Presented | FrameOutcome::PresentedStale)
    }
}

/// Running totals since the orchestrator was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub stale: u64,
    pub skipped: u64,
    pub allocations: u64,
}

/// Drives one backend through scene capture, painting, blurring, compositing
/// and presentation, once per host frame.
///
/// The orchestrator owns every piece of per-frame state: the parameter set,
/// the ping-pong roles, the frame counter, and the display size. Resizes are
/// queued and take effect at the start of the next frame.
pub struct FrameOrchestrator<B: FrameBackend> {
    backend: B,
    params: DistortionParameters,
    display: DisplaySize,
    pending_display: Option<DisplaySize>,
    layout: Option<BufferLayout>,
    needs_allocation: bool,
    ping_pong: PingPong,
    frame_index: u64,
    stats: FrameStats,
}

impl<B: FrameBackend> FrameOrchestrator<B> {
    pub fn new(
        backend: B,
        params: DistortionParameters,
        display: DisplaySize,
    ) -> Result<Self, ParameterError> {
        params.validate()?;
        Ok(Self {
            backend,
            params,
            display,
            pending_display: None,
            layout: None,
            needs_allocation: true,
            ping_pong: PingPong::default(),
            frame_index: 0,
            stats: FrameStats::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn parameters(&self) -> &DistortionParameters {
        &self.params
    }

    /// Replaces the parameter set. Invalid sets are rejected and the current
    /// one stays in effect.
    pub fn set_parameters(&mut self, params: DistortionParameters) -> Result<(), ParameterError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    /// Queues a display size change for the next frame. Zero-area sizes (a
    /// minimised window) are ignored.
    pub fn request_resize(&mut self, size: DisplaySize) {
        if size.is_empty() {
            debug!(%size, "ignoring zero-area resize");
            return;
        }
        self.pending_display = Some(size);
    }

    /// Index of the next frame to render; hosts stamp pointer samples with it.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn render_frame(&mut self, pointer: &PointerSample, scene: &mut B::Scene) -> FrameOutcome {
        if let Some(size) = self.pending_display.take() {
            if size != self.display {
                debug!(from = %self.display, to = %size, "applying resize");
                self.display = size;
                self.needs_allocation = true;
            }
        }

        if self.display.is_empty() {
            return self.skip(SkipReason::EmptyDisplay);
        }

        let layout = BufferLayout::for_display(self.display);
        if self.needs_allocation || self.layout != Some(layout) {
            match self.backend.allocate(layout) {
                Ok(()) => {
                    debug!(
                        display = %layout.display,
                        paint = %layout.paint,
                        low_res = %layout.low_res,
                        "allocated frame buffers"
                    );
                    self.layout = Some(layout);
                    self.needs_allocation = false;
                    self.ping_pong.reset();
                    self.stats.allocations += 1;
                }
                Err(err) => {
                    warn!(%err, "frame buffer allocation failed; skipping frame");
                    self.needs_allocation = true;
                    return self.skip(SkipReason::Allocation);
                }
            }
        }

        if let Err(err) = self.backend.verify_layout(&layout) {
            warn!(%err, "stale frame buffers; reallocating next frame");
            self.needs_allocation = true;
            return self.skip(SkipReason::DimensionMismatch);
        }

        let frame = FrameInfo {
            index: self.frame_index,
            layout,
        };
        if let Err(err) = self.backend.begin_frame(&frame) {
            return self.fail(err);
        }

        let stale = match self.backend.capture_scene(scene, &frame) {
            Ok(()) => false,
            Err(err) => {
                warn!(frame = frame.index, %err, "scene capture failed; reusing previous scene");
                true
            }
        };

        if let Err(err) = self.run_passes(pointer, &frame) {
            return self.fail(err);
        }

        self.ping_pong.swap();
        self.frame_index += 1;
        self.stats.presented += 1;
        if stale {
            self.stats.stale += 1;
            FrameOutcome::PresentedStale
        } else {
            FrameOutcome::Presented
        }
    }

    fn run_passes(&mut self, pointer: &PointerSample, frame: &FrameInfo) -> Result<(), PassError> {
        let slots = self.ping_pong.slots();
        self.backend.paint(slots, pointer, &self.params, frame)?;
        self.backend.downsample(slots.write, &self.params, frame)?;
        self.backend.composite(&self.params, frame)?;
        if self.params.post_effects_enabled() {
            self.backend.post_process(pointer, &self.params, frame)?;
        }
        self.backend.present()
    }

    fn fail(&mut self, err: PassError) -> FrameOutcome {
        self.backend.abandon_frame();
        let reason = match err {
            PassError::Allocation { .. } => SkipReason::Allocation,
            PassError::DimensionMismatch { .. } => SkipReason::DimensionMismatch,
            _ => SkipReason::PassFailure,
        };
        if err.requires_reallocation() {
            self.needs_allocation = true;
        }
        warn!(frame = self.frame_index, %err, "frame dropped");
        self.skip(reason)
    }

    fn skip(&mut self, reason: SkipReason) -> FrameOutcome {
        self.stats.skipped += 1;
        FrameOutcome::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SceneError;
    use crate::pingpong::{PaintSlot, PaintSlots};
    use glam::Vec2;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Allocate(DisplaySize),
        Begin(u64),
        Scene,
        Paint(PaintSlots),
        Downsample(PaintSlot),
        Composite,
        Post,
        Present,
        Abandon,
    }

    #[derive(Default)]
    struct MockBackend {
        calls: Vec<Call>,
        fail_allocations: u32,
        fail_composite: bool,
        shrink_after_allocate: bool,
        live: Option<BufferLayout>,
    }

    struct MockScene {
        fail: bool,
    }

    impl FrameBackend for MockBackend {
        type Scene = MockScene;

        fn allocate(&mut self, layout: BufferLayout) -> Result<(), PassError> {
            self.calls.push(Call::Allocate(layout.display));
            if self.fail_allocations > 0 {
                self.fail_allocations -= 1;
                return Err(PassError::Allocation {
                    label: "paint A",
                    width: layout.paint.width,
                    height: layout.paint.height,
                    reason: "test".into(),
                });
            }
            let mut live = layout;
            if self.shrink_after_allocate {
                self.shrink_after_allocate = false;
                live.low_res = DisplaySize::new(1, 1);
            }
            self.live = Some(live);
            Ok(())
        }

        fn verify_layout(&self, layout: &BufferLayout) -> Result<(), PassError> {
            match self.live {
                Some(live) if live == *layout => Ok(()),
                Some(live) => Err(PassError::DimensionMismatch {
                    label: "low-res field",
                    expected: layout.low_res,
                    actual: live.low_res,
                }),
                None => Err(PassError::Unallocated),
            }
        }

        fn begin_frame(&mut self, frame: &FrameInfo) -> Result<(), PassError> {
            self.calls.push(Call::Begin(frame.index));
            Ok(())
        }

        fn capture_scene(
            &mut self,
            scene: &mut MockScene,
            _frame: &FrameInfo,
        ) -> Result<(), SceneError> {
            self.calls.push(Call::Scene);
            if scene.fail {
                Err(SceneError::new("offline"))
            } else {
                Ok(())
            }
        }

        fn paint(
            &mut self,
            slots: PaintSlots,
            _pointer: &PointerSample,
            _params: &DistortionParameters,
            _frame: &FrameInfo,
        ) -> Result<(), PassError> {
            self.calls.push(Call::Paint(slots));
            Ok(())
        }

        fn downsample(
            &mut self,
            source: PaintSlot,
            _params: &DistortionParameters,
            _frame: &FrameInfo,
        ) -> Result<(), PassError> {
            self.calls.push(Call::Downsample(source));
            Ok(())
        }

        fn composite(
            &mut self,
            _params: &DistortionParameters,
            _frame: &FrameInfo,
        ) -> Result<(), PassError> {
            self.calls.push(Call::Composite);
            if self.fail_composite {
                return Err(PassError::Device("lost".into()));
            }
            Ok(())
        }

        fn post_process(
            &mut self,
            _pointer: &PointerSample,
            _params: &DistortionParameters,
            _frame: &FrameInfo,
        ) -> Result<(), PassError> {
            self.calls.push(Call::Post);
            Ok(())
        }

        fn present(&mut self) -> Result<(), PassError> {
            self.calls.push(Call::Present);
            Ok(())
        }

        fn abandon_frame(&mut self) {
            self.calls.push(Call::Abandon);
        }
    }

    fn orchestrator(backend: MockBackend) -> FrameOrchestrator<MockBackend> {
        FrameOrchestrator::new(
            backend,
            DistortionParameters::default(),
            DisplaySize::new(64, 32),
        )
        .unwrap()
    }

    fn pointer(frame: u64) -> PointerSample {
        PointerSample::at_rest(Vec2::splat(0.5), frame)
    }

    #[test]
    fn passes_run_in_order() {
        let mut orch = orchestrator(MockBackend::default());
        let outcome = orch.render_frame(&pointer(0), &mut MockScene { fail: false });
        assert_eq!(outcome, FrameOutcome::Presented);
        let slots = PaintSlots {
            read: PaintSlot::B,
            write: PaintSlot::A,
        };
        assert_eq!(
            orch.backend().calls,
            vec![
                Call::Allocate(DisplaySize::new(64, 32)),
                Call::Begin(0),
                Call::Scene,
                Call::Paint(slots),
                Call::Downsample(PaintSlot::A),
                Call::Composite,
                Call::Present,
            ]
        );
        assert_eq!(orch.frame_index(), 1);
    }

    #[test]
    fn post_stage_runs_between_composite_and_present_when_enabled() {
        let params = DistortionParameters {
            selective_chromatic: true,
            ..Default::default()
        };
        let mut orch =
            FrameOrchestrator::new(MockBackend::default(), params, DisplaySize::new(64, 32))
                .unwrap();
        orch.render_frame(&pointer(0), &mut MockScene { fail: false });
        assert!(orch
            .backend()
            .calls
            .ends_with(&[Call::Composite, Call::Post, Call::Present]));

        orch.set_parameters(DistortionParameters::default()).unwrap();
        orch.render_frame(&pointer(1), &mut MockScene { fail: false });
        let posts = orch
            .backend()
            .calls
            .iter()
            .filter(|call| **call == Call::Post)
            .count();
        assert_eq!(posts, 1);
    }

    #[test]
    fn paint_buffers_swap_every_frame() {
        let mut orch = orchestrator(MockBackend::default());
        let mut scene = MockScene { fail: false };
        for frame in 0..4 {
            orch.render_frame(&pointer(frame), &mut scene);
        }
        let writes: Vec<PaintSlot> = orch
            .backend()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Paint(slots) => Some(slots.write),
                _ => None,
            })
            .collect();
        assert_eq!(
            writes,
            vec![PaintSlot::A, PaintSlot::B, PaintSlot::A, PaintSlot::B]
        );
    }

    #[test]
    fn resize_applies_at_next_frame() {
        let mut orch = orchestrator(MockBackend::default());
        let mut scene = MockScene { fail: false };
        orch.render_frame(&pointer(0), &mut scene);
        orch.request_resize(DisplaySize::new(100, 50));
        assert_eq!(orch.display(), DisplaySize::new(64, 32));
        orch.render_frame(&pointer(1), &mut scene);
        assert_eq!(orch.display(), DisplaySize::new(100, 50));
        assert!(orch
            .backend()
            .calls
            .contains(&Call::Allocate(DisplaySize::new(100, 50))));
        assert_eq!(orch.stats().allocations, 2);
    }

    #[test]
    fn resize_restarts_ping_pong() {
        let mut orch = orchestrator(MockBackend::default());
        let mut scene = MockScene { fail: false };
        orch.render_frame(&pointer(0), &mut scene);
        orch.request_resize(DisplaySize::new(10, 10));
        orch.render_frame(&pointer(1), &mut scene);
        let last_paint = orch.backend().calls.iter().rev().find_map(|call| match call {
            Call::Paint(slots) => Some(slots.write),
            _ => None,
        });
        assert_eq!(last_paint, Some(PaintSlot::A));
    }

    #[test]
    fn zero_resize_is_ignored() {
        let mut orch = orchestrator(MockBackend::default());
        orch.request_resize(DisplaySize::new(0, 720));
        let outcome = orch.render_frame(&pointer(0), &mut MockScene { fail: false });
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(orch.display(), DisplaySize::new(64, 32));
    }

    #[test]
    fn allocation_failure_skips_and_retries() {
        let mut orch = orchestrator(MockBackend {
            fail_allocations: 1,
            ..Default::default()
        });
        let mut scene = MockScene { fail: false };
        let first = orch.render_frame(&pointer(0), &mut scene);
        assert_eq!(first, FrameOutcome::Skipped(SkipReason::Allocation));
        assert_eq!(orch.frame_index(), 0);
        let second = orch.render_frame(&pointer(0), &mut scene);
        assert_eq!(second, FrameOutcome::Presented);
        assert_eq!(orch.stats().skipped, 1);
    }

    #[test]
    fn scene_failure_still_presents() {
        let mut orch = orchestrator(MockBackend::default());
        let outcome = orch.render_frame(&pointer(0), &mut MockScene { fail: true });
        assert_eq!(outcome, FrameOutcome::PresentedStale);
        assert!(outcome.presented());
        assert!(orch.backend().calls.contains(&Call::Present));
        assert_eq!(orch.stats().stale, 1);
    }

    #[test]
    fn dimension_mismatch_forces_reallocation() {
        let mut orch = orchestrator(MockBackend {
            shrink_after_allocate: true,
            ..Default::default()
        });
        let mut scene = MockScene { fail: false };
        let first = orch.render_frame(&pointer(0), &mut scene);
        assert_eq!(first, FrameOutcome::Skipped(SkipReason::DimensionMismatch));
        let second = orch.render_frame(&pointer(0), &mut scene);
        assert_eq!(second, FrameOutcome::Presented);
        assert_eq!(orch.stats().allocations, 2);
    }

    #[test]
    fn pass_failure_abandons_frame_without_swapping() {
        let mut orch = orchestrator(MockBackend {
            fail_composite: true,
            ..Default::default()
        });
        let mut scene = MockScene { fail: false };
        let outcome = orch.render_frame(&pointer(0), &mut scene);
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::PassFailure));
        assert_eq!(orch.backend().calls.last(), Some(&Call::Abandon));
        assert!(!orch.backend().calls.contains(&Call::Present));

        orch.backend_mut().fail_composite = false;
        orch.render_frame(&pointer(0), &mut scene);
        let writes: Vec<PaintSlot> = orch
            .backend()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Paint(slots) => Some(slots.write),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![PaintSlot::A, PaintSlot::A]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let bad = DistortionParameters {
            decay_factor: 1.5,
            ..Default::default()
        };
        assert!(FrameOrchestrator::new(MockBackend::default(), bad, DisplaySize::new(4, 4)).is_err());

        let mut orch = orchestrator(MockBackend::default());
        assert!(orch.set_parameters(bad).is_err());
        assert_eq!(orch.parameters(), &DistortionParameters::default());
    }

    #[test]
    fn empty_display_skips() {
        let mut orch = FrameOrchestrator::new(
            MockBackend::default(),
            DistortionParameters::default(),
            DisplaySize::new(0, 0),
        )
        .unwrap();
        let outcome = orch.render_frame(&pointer(0), &mut MockScene { fail: false });
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::EmptyDisplay));
        assert!(orch.backend().calls.is_empty());
    }
}
