use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::{SurfaceMetrics, ViewportConfig, DEFAULT_DEVICE_PIXEL_RATIO_CAP};
use crate::core::{FrameScheduler, RenderLoop, IDLE_FRAME_INTERVAL};
use crate::device::{Gpu, GpuInit};
use crate::presets::Preset;
use crate::render::WgpuBackend;
use crate::shader::ShaderSource;
use crate::time::{FrameClock, FrameTime};

/// Frames between periodic debug summaries.
const FRAME_LOG_INTERVAL: u64 = 600;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,

    /// Upper bound applied to the window scale factor when sizing the surface.
    pub device_pixel_ratio_cap: f64,

    /// Vertex and fragment WGSL for the full-screen program.
    pub shaders: ShaderSource<'static>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "shaderloop".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            device_pixel_ratio_cap: DEFAULT_DEVICE_PIXEL_RATIO_CAP,
            shaders: Preset::Gradient.source(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and renders the configured program until the window
    /// closes or a frame fails fatally.
    ///
    /// Startup failures (no graphics support, shader compile/link errors) and
    /// fatal frame errors are returned after the event loop has stopped.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        // Frames are driven by the render loop's scheduler only.
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut state = AppState::new(config, gpu_init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Schedules ticks for one window.
///
/// Refresh-paced frames go through `request_redraw`. Idle frames arm a
/// wake-up timer instead; the redraw is requested from `new_events` once it
/// fires.
struct RedrawScheduler<'a> {
    window: &'a Window,
    event_loop: &'a ActiveEventLoop,
}

impl FrameScheduler for RedrawScheduler<'_> {
    fn request_frame(&self) {
        self.window.request_redraw();
    }

    fn request_idle_frame(&self) {
        self.event_loop
            .set_control_flow(ControlFlow::wait_duration(IDLE_FRAME_INTERVAL));
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    render_loop: RenderLoop<WgpuBackend<'this>>,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,

    entry: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            entry: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.entry = None;
        event_loop.exit();
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let shaders = self.config.shaders;
        let viewport = ViewportConfig::new(self.config.device_pixel_ratio_cap);

        WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            render_loop_builder: |w| build_render_loop(w, gpu_init, shaders, viewport),
        }
        .try_build()
    }
}

fn build_render_loop<'w>(
    window: &'w Window,
    gpu_init: GpuInit,
    shaders: ShaderSource<'_>,
    viewport: ViewportConfig,
) -> Result<RenderLoop<WgpuBackend<'w>>> {
    let gpu = pollster::block_on(Gpu::new(window, gpu_init))
        .context("failed to initialize graphics context")?;
    let backend =
        WgpuBackend::new(window, gpu, &shaders).context("failed to build shader program")?;

    Ok(RenderLoop::new(backend, viewport))
}

/// Logical surface size and scale factor, read fresh every frame.
fn surface_metrics(window: &Window) -> SurfaceMetrics {
    let scale = window.scale_factor();
    let logical: LogicalSize<f64> = window.inner_size().to_logical(scale);
    SurfaceMetrics::new(logical.width, logical.height, scale)
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(mut entry) => {
                // Elapsed time counts from the first frame, not from device startup.
                entry.with_clock_mut(FrameClock::restart);
                // First tick; every later one is requested by the loop itself.
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(err) => self.fail(event_loop, err.context("startup failed")),
        }
    }

    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if !matches!(cause, StartCause::ResumeTimeReached { .. }) {
            return;
        }

        // Idle wake-up from `request_idle_frame`; back to waiting on redraws.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping render loop");
                self.entry = None;
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                let result = entry.with_mut(|fields| {
                    let ft: FrameTime = fields.clock.tick();
                    let metrics = surface_metrics(fields.window);
                    let scheduler = RedrawScheduler {
                        window: fields.window,
                        event_loop,
                    };
                    let result = fields.render_loop.tick(ft.timestamp_ms, metrics, &scheduler);

                    if ft.frame_index > 0 && ft.frame_index % FRAME_LOG_INTERVAL == 0 {
                        let (w, h) = fields.render_loop.viewport().size();
                        log::debug!(
                            "t={:.1}s ticks={} drawn={} surface={w}x{h}",
                            ft.timestamp_ms * 0.001,
                            fields.render_loop.ticks(),
                            fields.render_loop.frames_drawn(),
                        );
                    }

                    result
                });

                if let Err(err) = result {
                    self.fail(event_loop, anyhow::Error::new(err).context("frame failed"));
                }
            }

            // Size and scale changes are polled at the start of every tick.
            _ => {}
        }
    }
}
