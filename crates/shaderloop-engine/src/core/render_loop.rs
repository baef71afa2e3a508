use std::ops::Range;
use std::time::Duration;

use crate::coords::{SurfaceMetrics, SurfaceTarget, Viewport, ViewportConfig, ViewportRect};
use crate::render::QUAD_VERTEX_COUNT;

use super::RenderError;

/// Clear color for every frame: fully transparent black.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::TRANSPARENT;

/// Converts a scheduler timestamp (milliseconds) into elapsed seconds.
#[inline]
pub fn elapsed_seconds(timestamp_ms: f64) -> f64 {
    timestamp_ms * 0.001
}

/// Per-tick values, recomputed every frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameState {
    pub width_px: u32,
    pub height_px: u32,
    pub elapsed_seconds: f64,
}

impl FrameState {
    /// Value of the `resolution` uniform.
    #[inline]
    pub fn resolution(&self) -> [f32; 2] {
        [self.width_px as f32, self.height_px as f32]
    }

    /// Value of the `time` uniform.
    #[inline]
    pub fn time(&self) -> f32 {
        self.elapsed_seconds as f32
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommand {
    pub clear: wgpu::Color,
    pub viewport: ViewportRect,
    pub resolution: [f32; 2],
    pub time: f32,
    pub vertices: Range<u32>,
}

/// What happened to a frame that did not fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Drawn,
    /// Nothing was presented (zero-area surface, or a recoverable surface error).
    Skipped,
}

/// Executes frame commands: clear, bind program and quad, upload uniforms, draw.
pub trait FrameBackend: SurfaceTarget {
    fn draw_frame(&mut self, command: &FrameCommand) -> Result<FrameOutcome, RenderError>;
}

/// Re-arm delay after a tick that presented nothing.
pub const IDLE_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Host primitive that arranges for the next tick.
///
/// Implementations must coalesce requests so at most one tick is pending.
pub trait FrameScheduler {
    /// Next tick at the next display refresh. Presenting paces this.
    fn request_frame(&self);

    /// Next tick no sooner than [`IDLE_FRAME_INTERVAL`] from now.
    ///
    /// Requested after a skipped frame: with no present to block on, an
    /// immediate redraw would spin.
    fn request_idle_frame(&self);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    /// Constructed; no tick has run yet.
    Idle,
    /// At least one tick has completed.
    Running,
}

/// The per-frame driver.
///
/// Owns the backend (and through it the program and quad buffer) and the
/// viewport. Each [`tick`](Self::tick) runs one full frame and re-arms the
/// scheduler; there is no stop state.
pub struct RenderLoop<B> {
    backend: B,
    viewport: Viewport,
    state: LoopState,
    last_timestamp_ms: f64,
    ticks: u64,
    frames_drawn: u64,
}

impl<B: FrameBackend> RenderLoop<B> {
    pub fn new(backend: B, config: ViewportConfig) -> Self {
        Self {
            backend,
            viewport: Viewport::new(config),
            state: LoopState::Idle,
            last_timestamp_ms: 0.0,
            ticks: 0,
            frames_drawn: 0,
        }
    }

    /// Runs one frame at `timestamp_ms` and schedules the next one.
    ///
    /// A drawn frame re-arms for the next refresh; a skipped one re-arms
    /// through [`FrameScheduler::request_idle_frame`].
    ///
    /// On error the scheduler is left alone, so the loop stops unless the host
    /// re-arms it.
    pub fn tick<S>(
        &mut self,
        timestamp_ms: f64,
        metrics: SurfaceMetrics,
        scheduler: &S,
    ) -> Result<FrameState, RenderError>
    where
        S: FrameScheduler + ?Sized,
    {
        // `max` also discards NaN.
        let timestamp_ms = timestamp_ms.max(self.last_timestamp_ms);
        self.last_timestamp_ms = timestamp_ms;

        let sync = self.viewport.sync(&mut self.backend, metrics);
        let frame = FrameState {
            width_px: sync.width,
            height_px: sync.height,
            elapsed_seconds: elapsed_seconds(timestamp_ms),
        };

        let command = FrameCommand {
            clear: CLEAR_COLOR,
            viewport: self.viewport.transform(),
            resolution: frame.resolution(),
            time: frame.time(),
            vertices: 0..QUAD_VERTEX_COUNT,
        };

        let outcome = self.backend.draw_frame(&command)?;

        self.ticks += 1;
        self.state = LoopState::Running;

        match outcome {
            FrameOutcome::Drawn => {
                self.frames_drawn += 1;
                scheduler.request_frame();
            }
            FrameOutcome::Skipped => {
                log::trace!("frame {} skipped", self.ticks);
                scheduler.request_idle_frame();
            }
        }

        Ok(frame)
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Completed ticks, drawn or skipped.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
