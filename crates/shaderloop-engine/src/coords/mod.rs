//! Surface sizing.
//!
//! Two spaces are involved:
//! - logical pixels, as reported by the windowing layer
//! - physical pixels, which size the swapchain and the GPU viewport transform
//!
//! [`Viewport`] converts between them, capping oversampling at a configured
//! device pixel ratio.

mod viewport;

pub use viewport::{
    effective_pixel_ratio, target_size, SurfaceMetrics, SurfaceTarget, Viewport, ViewportConfig,
    ViewportRect, ViewportSync, DEFAULT_DEVICE_PIXEL_RATIO_CAP,
};
