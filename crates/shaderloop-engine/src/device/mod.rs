//! GPU device + surface management.
//!
//! This module is responsible for:
//! - acquiring an adapter (primary backends, then the fallback set)
//! - creating the wgpu Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::{GraphicsError, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use init::GpuInit;
