//! Interactive preview: a winit window showing the demo scene through the
//! distortion pipeline, driven by the real cursor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use fxconfig::DistortionParameters;
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{DemoGpuScene, GpuBackend};
use crate::orchestrator::{FrameOrchestrator, FrameOutcome};
use crate::pointer::PointerTracker;
use crate::types::DisplaySize;

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub size: DisplaySize,
    pub params: DistortionParameters,
    pub title: String,
}

struct PreviewState {
    orchestrator: FrameOrchestrator<GpuBackend>,
    tracker: PointerTracker,
    scene: DemoGpuScene,
    frames_since_last_update: u32,
    last_fps_update: Instant,
    // Declared last so the surface inside the backend is dropped first.
    window: Arc<Window>,
}

impl PreviewState {
    fn new(window: Arc<Window>, params: DistortionParameters) -> Result<Self> {
        let inner = window.inner_size();
        let size = DisplaySize::new(inner.width.max(1), inner.height.max(1));
        let backend = GpuBackend::new(window.as_ref(), size)?;
        let profile = backend.adapter_profile();
        info!(adapter = %profile.name, backend = ?profile.backend, %size, "preview ready");
        let orchestrator = FrameOrchestrator::new(backend, params, size)?;
        Ok(Self {
            orchestrator,
            tracker: PointerTracker::new(),
            scene: DemoGpuScene::default(),
            frames_since_last_update: 0,
            last_fps_update: Instant::now(),
            window,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.orchestrator
            .request_resize(DisplaySize::new(size.width, size.height));
        self.tracker.reset();
    }

    fn render(&mut self) -> FrameOutcome {
        let pointer = self.tracker.latch(self.orchestrator.frame_index());
        let outcome = self.orchestrator.render_frame(&pointer, &mut self.scene);

        let now = Instant::now();
        if outcome.presented() {
            self.frames_since_last_update += 1;
        }
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            let stats = self.orchestrator.stats();
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = fps.round(),
                frame = self.orchestrator.frame_index(),
                stale = stats.stale,
                skipped = stats.skipped,
                "render stats"
            );
        }
        outcome
    }
}

/// Opens the preview window and blocks until it is closed.
pub fn run_preview(config: PreviewConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.size.width, config.size.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut state = PreviewState::new(window, config.params)
        .map_err(|err| anyhow!("failed to initialise preview renderer: {err:#}"))?;
    state.window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed
                            && event.logical_key == Key::Named(NamedKey::Escape)
                        {
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let size = state.window.inner_size();
                        state
                            .tracker
                            .move_to_pixels(position.x, position.y, size.width, size.height);
                    }
                    WindowEvent::CursorLeft { .. } => state.tracker.leave(),
                    WindowEvent::Resized(size) => state.resize(size),
                    WindowEvent::RedrawRequested => {
                        if let FrameOutcome::Skipped(reason) = state.render() {
                            tracing::trace!(?reason, "frame skipped");
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
