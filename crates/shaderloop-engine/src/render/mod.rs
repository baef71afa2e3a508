//! GPU rendering.
//!
//! - [`QuadGeometry`]: the static full-screen quad
//! - [`WgpuBackend`]: executes the render loop's frame commands with wgpu

mod backend;
mod quad;

pub use backend::WgpuBackend;
pub use quad::{rectangle_vertices, QuadGeometry, QuadVertex, FULLSCREEN_QUAD, QUAD_VERTEX_COUNT};
