//! Built-in shader programs.
//!
//! Each preset pairs the shared full-screen vertex stage with its own
//! fragment stage. The CPU functions in the submodules evaluate the same
//! math as the WGSL and are what the tests check against.

pub mod gradient;
pub mod metaballs;

use crate::shader::ShaderSource;

/// Vertex stage shared by every preset.
pub const FULLSCREEN_VERTEX_WGSL: &str = include_str!("shaders/fullscreen.wgsl");

pub const GRADIENT_FRAGMENT_WGSL: &str = include_str!("shaders/gradient.wgsl");

pub const METABALLS_FRAGMENT_WGSL: &str = include_str!("shaders/metaballs.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Preset {
    /// Time-animated cosine palette across the screen.
    Gradient,
    /// Five orbiting blobs with a soft threshold edge.
    Metaballs,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Gradient, Preset::Metaballs];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Gradient => "gradient",
            Preset::Metaballs => "metaballs",
        }
    }

    pub fn source(self) -> ShaderSource<'static> {
        let fragment = match self {
            Preset::Gradient => GRADIENT_FRAGMENT_WGSL,
            Preset::Metaballs => METABALLS_FRAGMENT_WGSL,
        };
        ShaderSource::new(FULLSCREEN_VERTEX_WGSL, fragment)
    }
}

/// Maps a framebuffer pixel coordinate (top-left origin) to `[0, 1]` uv with
/// a bottom-left origin.
pub fn frag_coord_to_uv(frag_coord: [f32; 2], resolution: [f32; 2]) -> [f32; 2] {
    [
        frag_coord[0] / resolution[0],
        (resolution[1] - frag_coord[1]) / resolution[1],
    ]
}

/// Numeric value of the module-scope `const` `name` in `source`, as naga
/// evaluated it, flattened to `f32`s.
#[cfg(test)]
pub(crate) fn wgsl_const(source: &str, name: &str) -> Vec<f32> {
    fn flatten(module: &naga::Module, expr: naga::Handle<naga::Expression>, out: &mut Vec<f32>) {
        match &module.global_expressions[expr] {
            naga::Expression::Literal(naga::Literal::F32(v)) => out.push(*v),
            naga::Expression::Literal(naga::Literal::I32(v)) => out.push(*v as f32),
            naga::Expression::Compose { components, .. } => {
                for c in components {
                    flatten(module, *c, out);
                }
            }
            naga::Expression::Constant(c) => flatten(module, module.constants[*c].init, out),
            other => panic!("unexpected constant expression {other:?}"),
        }
    }

    let module = naga::front::wgsl::parse_str(source).expect("preset parses");
    let (_, constant) = module
        .constants
        .iter()
        .find(|(_, c)| c.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("no const `{name}`"));

    let mut out = Vec::new();
    flatten(&module, constant.init, &mut out);
    out
}
