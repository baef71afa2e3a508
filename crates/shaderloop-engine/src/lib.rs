//! Shaderloop engine crate.
//!
//! Renders a full-screen fragment shader into a window, once per display
//! refresh, with `resolution` and `time` uniforms kept current.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod shader;
pub mod presets;
