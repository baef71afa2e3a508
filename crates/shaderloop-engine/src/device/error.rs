/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Failures while acquiring the graphics context.
#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    #[error("window has zero size")]
    ZeroSize,

    /// Neither the primary nor the fallback backend set produced a usable adapter.
    #[error("no graphics support (primary: {primary}; fallback: {fallback})")]
    NoGraphicsSupport { primary: String, fallback: String },

    #[error("failed to create wgpu device/queue: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
