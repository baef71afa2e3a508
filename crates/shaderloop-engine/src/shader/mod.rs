//! Shader programs.
//!
//! A program is built in two steps:
//! - compile: parse + validate one WGSL stage and reflect its interface
//! - link: match the vertex and fragment interfaces, resolve attribute and
//!   uniform locations, and create the render pipeline
//!
//! [`reflect`] holds the GPU-free half of both steps.

mod error;
mod program;
pub mod reflect;
mod source;

pub use error::ShaderError;
pub use program::{CompiledProgram, CompiledShader, ProgramBuilder, UniformValue};
pub use reflect::{ProgramLayout, UniformKind, UniformLocation};
pub use source::{ShaderSource, Stage};

/// Vertex attribute fed from the quad buffer.
pub const POSITION: &str = "position";

/// Uniform receiving the drawable size in physical pixels (`vec2<f32>`).
pub const RESOLUTION: &str = "resolution";

/// Uniform receiving elapsed seconds (`f32`).
pub const TIME: &str = "time";
