/// Failure inside a tick. The loop does not re-arm after one.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface failed beyond recovery: {0}")]
    Surface(wgpu::SurfaceError),
}
