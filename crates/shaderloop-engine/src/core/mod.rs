//! The render loop.
//!
//! [`RenderLoop`] is the only per-frame driver. It talks to the GPU through
//! [`FrameBackend`] and to the host through [`FrameScheduler`], so the whole
//! per-tick contract can run without a window or a device.

mod error;
mod render_loop;

pub use error::RenderError;
pub use render_loop::{
    elapsed_seconds, FrameBackend, FrameCommand, FrameOutcome, FrameScheduler, FrameState,
    LoopState, RenderLoop, CLEAR_COLOR, IDLE_FRAME_INTERVAL,
};
