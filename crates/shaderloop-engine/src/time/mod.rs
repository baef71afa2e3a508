//! Time subsystem.
//!
//! Provides the frame timestamp source without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per render loop
//! - call `tick()` once per redraw to obtain `FrameTime`

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
