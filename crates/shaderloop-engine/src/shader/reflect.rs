//! GPU-free half of program building.
//!
//! Parses and validates WGSL with naga and extracts the stage interface the
//! pipeline is assembled from: entry point, `@location` inputs/outputs and the
//! uniforms the entry point actually uses. Linking matches two interfaces and
//! resolves attribute and uniform locations.

use std::collections::BTreeMap;
use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    AddressSpace, Binding, Interpolation, ResourceBinding, Sampling, ScalarKind, TypeInner,
    VectorSize,
};

use super::{ShaderError, Stage, POSITION};

/// Declared type of a uniform, as far as per-frame uploads are concerned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    Float,
    Vec2,
    Other,
}

impl UniformKind {
    fn of(ty: &TypeInner) -> Self {
        match ty {
            TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => Self::Float,
            TypeInner::Vector {
                size: VectorSize::Bi,
                scalar,
            } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Self::Vec2,
            _ => Self::Other,
        }
    }
}

/// A `@location` input or output of an entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceVar {
    pub name: Option<String>,
    pub location: u32,
    pub ty: TypeInner,
    pub interpolation: Option<Interpolation>,
    pub sampling: Option<Sampling>,
}

/// A `var<uniform>` used by an entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDecl {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u64,
    pub kind: UniformKind,
}

/// Kind of a bound global that is not a `var<uniform>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Storage,
    Texture,
    Sampler,
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Storage => "storage buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Sampler => "sampler",
            ResourceKind::Other => "resource",
        })
    }
}

/// A used binding the program cannot feed. Kept so linking can reject it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundResource {
    pub name: Option<String>,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

/// What one compiled stage exposes to the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct StageInterface {
    pub stage: Stage,
    pub entry_point: String,
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
    pub uniforms: Vec<UniformDecl>,
    pub resources: Vec<BoundResource>,
}

/// Parses and validates `source`, then extracts the interface of its `stage`
/// entry point. Diagnostics are naga's rendered reports.
pub fn compile_stage(stage: Stage, source: &str) -> Result<StageInterface, ShaderError> {
    let fail = |log: String| ShaderError::Compile { stage, log };

    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| fail(e.emit_to_string(source)))?;

    let (index, entry) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.stage == stage.naga())
        .ok_or_else(|| fail(format!("no @{stage} entry point found")))?;

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    // Bindings the entry point never touches are left out, like a GL linker
    // dropping inactive uniforms.
    let usage = info.get_entry_point(index);
    let mut uniforms = Vec::new();
    let mut resources = Vec::new();
    for (handle, var) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let Some(ResourceBinding { group, binding }) = var.binding.as_ref() else {
            continue;
        };
        let inner = &module.types[var.ty].inner;

        let kind = match var.space {
            AddressSpace::Uniform => match &var.name {
                Some(name) => {
                    uniforms.push(UniformDecl {
                        name: name.clone(),
                        group: *group,
                        binding: *binding,
                        size: u64::from(inner.size(module.to_ctx())),
                        kind: UniformKind::of(inner),
                    });
                    continue;
                }
                None => ResourceKind::Other,
            },
            AddressSpace::Storage { .. } => ResourceKind::Storage,
            AddressSpace::Handle => match inner {
                TypeInner::Image { .. } => ResourceKind::Texture,
                TypeInner::Sampler { .. } => ResourceKind::Sampler,
                _ => ResourceKind::Other,
            },
            _ => ResourceKind::Other,
        };

        resources.push(BoundResource {
            name: var.name.clone(),
            group: *group,
            binding: *binding,
            kind,
        });
    }

    Ok(StageInterface {
        stage,
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        uniforms,
        resources,
    })
}

fn collect_locations(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<InterfaceVar>,
) {
    match binding {
        Some(Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => out.push(InterfaceVar {
            name: name.map(str::to_owned),
            location: *location,
            ty: module.types[ty].inner.clone(),
            interpolation: *interpolation,
            sampling: *sampling,
        }),
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

/// Resolved binding of a uniform in the linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    /// Size of the declared type in bytes.
    pub size: u64,
    pub kind: UniformKind,
    /// Stages that read the uniform.
    pub visibility: wgpu::ShaderStages,
}

/// Why a uniform upload did not happen.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UploadSkip {
    /// No active uniform with that name.
    Missing,
    /// The shader declares a different type than the value supplied.
    KindMismatch { declared: UniformKind },
}

/// Locations resolved when two stages are linked.
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub attributes: BTreeMap<String, u32>,
    pub uniforms: BTreeMap<String, UniformLocation>,
}

impl ProgramLayout {
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    #[inline]
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Decides whether a value of `kind` can be uploaded to `name`.
    pub fn resolve_upload(&self, name: &str, kind: UniformKind) -> Result<UniformLocation, UploadSkip> {
        let location = self.uniform(name).ok_or(UploadSkip::Missing)?;
        if location.kind != kind {
            return Err(UploadSkip::KindMismatch {
                declared: location.kind,
            });
        }
        Ok(location)
    }
}

/// Matches a vertex interface against a fragment interface.
///
/// Rules:
/// - the only vertex input that can be fed is the float `position` attribute
/// - every fragment `@location` input needs a vertex output of the same type
/// - the fragment stage writes exactly color target 0
/// - matching locations agree on interpolation and sampling
/// - no storage buffers, textures or samplers are used
/// - uniforms live in group 0; a name maps to one binding and a binding to one name
pub fn link_interfaces(
    vertex: &StageInterface,
    fragment: &StageInterface,
) -> Result<ProgramLayout, ShaderError> {
    let fail = |log: String| ShaderError::Link { log };

    if vertex.stage != Stage::Vertex || fragment.stage != Stage::Fragment {
        return Err(fail(format!(
            "expected a vertex and a fragment stage, got {} and {}",
            vertex.stage, fragment.stage
        )));
    }

    let mut attributes = BTreeMap::new();
    for input in &vertex.inputs {
        match input.name.as_deref() {
            Some(POSITION) if is_float_attribute(&input.ty) => {
                attributes.insert(POSITION.to_string(), input.location);
            }
            Some(POSITION) => {
                return Err(fail(format!(
                    "attribute `{POSITION}` must be a float scalar or vector, found {:?}",
                    input.ty
                )));
            }
            other => {
                return Err(fail(format!(
                    "vertex input `{}` at location {} is not fed by any vertex buffer",
                    other.unwrap_or("<unnamed>"),
                    input.location
                )));
            }
        }
    }

    for input in &fragment.inputs {
        let Some(output) = vertex.outputs.iter().find(|o| o.location == input.location) else {
            return Err(fail(format!(
                "fragment input at location {} is not written by the vertex stage",
                input.location
            )));
        };
        if output.ty != input.ty {
            return Err(fail(format!(
                "location {} type mismatch: vertex writes {:?}, fragment reads {:?}",
                input.location, output.ty, input.ty
            )));
        }
        if (output.interpolation, output.sampling) != (input.interpolation, input.sampling) {
            return Err(fail(format!(
                "location {} interpolation mismatch: vertex uses {:?}/{:?}, fragment uses {:?}/{:?}",
                input.location,
                output.interpolation,
                output.sampling,
                input.interpolation,
                input.sampling
            )));
        }
    }

    for iface in [vertex, fragment] {
        if let Some(res) = iface.resources.first() {
            return Err(fail(format!(
                "{} stage uses {} `{}` at @group({}) @binding({}); only var<uniform> bindings can be fed",
                iface.stage,
                res.kind,
                res.name.as_deref().unwrap_or("<unnamed>"),
                res.group,
                res.binding
            )));
        }
    }

    if let Some(extra) = fragment.outputs.iter().find(|o| o.location != 0) {
        return Err(fail(format!(
            "fragment output at location {} has no color target",
            extra.location
        )));
    }
    if fragment.outputs.is_empty() {
        return Err(fail("fragment stage writes no color at location 0".to_string()));
    }

    let mut uniforms: BTreeMap<String, UniformLocation> = BTreeMap::new();
    for iface in [vertex, fragment] {
        for decl in &iface.uniforms {
            if decl.group != 0 {
                return Err(fail(format!(
                    "uniform `{}` is in @group({}); only group 0 is supported",
                    decl.name, decl.group
                )));
            }

            if let Some(existing) = uniforms.get_mut(&decl.name) {
                if existing.binding != decl.binding
                    || existing.size != decl.size
                    || existing.kind != decl.kind
                {
                    return Err(fail(format!(
                        "uniform `{}` is declared differently in the vertex and fragment stages",
                        decl.name
                    )));
                }
                existing.visibility |= iface.stage.visibility();
                continue;
            }

            if let Some((other, _)) = uniforms.iter().find(|(_, loc)| loc.binding == decl.binding) {
                return Err(fail(format!(
                    "uniforms `{other}` and `{}` share @group(0) @binding({})",
                    decl.name, decl.binding
                )));
            }

            uniforms.insert(
                decl.name.clone(),
                UniformLocation {
                    group: decl.group,
                    binding: decl.binding,
                    size: decl.size,
                    kind: decl.kind,
                    visibility: iface.stage.visibility(),
                },
            );
        }
    }

    Ok(ProgramLayout {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        attributes,
        uniforms,
    })
}

fn is_float_attribute(ty: &TypeInner) -> bool {
    matches!(
        ty,
        TypeInner::Scalar(s) | TypeInner::Vector { scalar: s, .. } if s.kind == ScalarKind::Float
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{RESOLUTION, TIME};

    const VS: &str = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}
"#;

    const FS: &str = r#"
@group(0) @binding(0) var<uniform> resolution: vec2<f32>;
@group(0) @binding(1) var<uniform> time: f32;

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = frag_coord.xy / resolution;
    return vec4<f32>(uv, 0.5 + 0.5 * sin(time), 1.0);
}
"#;

    const VS_UV: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = vec4<f32>(position, 0.0, 1.0);
    out.uv = position * 0.5 + 0.5;
    return out;
}
"#;

    fn link(vs: &str, fs: &str) -> Result<ProgramLayout, ShaderError> {
        let v = compile_stage(Stage::Vertex, vs)?;
        let f = compile_stage(Stage::Fragment, fs)?;
        link_interfaces(&v, &f)
    }

    fn link_log(vs: &str, fs: &str) -> String {
        match link(vs, fs) {
            Err(ShaderError::Link { log }) => log,
            other => panic!("expected link error, got {other:?}"),
        }
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn vertex_interface_is_reflected() {
        let iface = compile_stage(Stage::Vertex, VS).unwrap();
        assert_eq!(iface.entry_point, "vs_main");
        assert_eq!(iface.inputs.len(), 1);
        assert_eq!(iface.inputs[0].name.as_deref(), Some("position"));
        assert_eq!(iface.inputs[0].location, 0);
        assert!(iface.outputs.is_empty());
        assert!(iface.uniforms.is_empty());
    }

    #[test]
    fn struct_outputs_are_flattened() {
        let iface = compile_stage(Stage::Vertex, VS_UV).unwrap();
        assert_eq!(iface.outputs.len(), 1);
        assert_eq!(iface.outputs[0].name.as_deref(), Some("uv"));
        assert_eq!(iface.outputs[0].location, 0);
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let err = compile_stage(Stage::Fragment, "@fragment fn fs_main( -> {").unwrap_err();
        match &err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(*stage, Stage::Fragment);
                assert!(!log.trim().is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_error_reports_diagnostic() {
        let src = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f32 = vec2<f32>(1.0, 2.0);
    return vec4<f32>(x);
}
"#;
        let err = compile_stage(Stage::Fragment, src).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert!(!err.log().is_empty());
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let err = compile_stage(Stage::Fragment, VS).unwrap_err();
        assert!(err.log().contains("entry point"));
    }

    #[test]
    fn unused_uniform_is_not_reflected() {
        let src = r#"
@group(0) @binding(0) var<uniform> resolution: vec2<f32>;
@group(0) @binding(1) var<uniform> time: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.5 + 0.5 * sin(time), 0.0, 0.0, 1.0);
}
"#;
        let iface = compile_stage(Stage::Fragment, src).unwrap();
        let names: Vec<_> = iface.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["time"]);
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_resolves_all_locations() {
        let layout = link(VS, FS).unwrap();

        assert_eq!(layout.vertex_entry, "vs_main");
        assert_eq!(layout.fragment_entry, "fs_main");
        assert_eq!(layout.attribute(POSITION), Some(0));

        let res = layout.uniform(RESOLUTION).unwrap();
        assert_eq!((res.group, res.binding, res.size), (0, 0, 8));
        assert_eq!(res.kind, UniformKind::Vec2);
        assert_eq!(res.visibility, wgpu::ShaderStages::FRAGMENT);

        let time = layout.uniform(TIME).unwrap();
        assert_eq!((time.binding, time.size, time.kind), (1, 4, UniformKind::Float));
    }

    #[test]
    fn matching_varyings_link() {
        let fs = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
        assert!(link(VS_UV, fs).is_ok());
    }

    #[test]
    fn unwritten_varying_fails_to_link() {
        let fs = r#"
@fragment
fn fs_main(@location(1) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;
        assert!(link_log(VS_UV, fs).contains("location 1"));
    }

    #[test]
    fn varying_type_mismatch_fails_to_link() {
        let fs = r#"
@fragment
fn fs_main(@location(0) uv: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0);
}
"#;
        assert!(link_log(VS_UV, fs).contains("mismatch"));
    }

    #[test]
    fn unfed_vertex_input_fails_to_link() {
        let vs = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position + color.xy, 0.0, 1.0);
}
"#;
        assert!(link_log(vs, FS).contains("color"));
    }

    #[test]
    fn non_zero_group_fails_to_link() {
        let fs = r#"
@group(1) @binding(0) var<uniform> time: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(time, 0.0, 0.0, 1.0);
}
"#;
        assert!(link_log(VS, fs).contains("group"));
    }

    #[test]
    fn shared_binding_fails_to_link() {
        let vs = r#"
@group(0) @binding(0) var<uniform> scale: f32;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position * scale, 0.0, 1.0);
}
"#;
        let fs = r#"
@group(0) @binding(0) var<uniform> time: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(time, 0.0, 0.0, 1.0);
}
"#;
        assert!(link_log(vs, fs).contains("share"));
    }

    #[test]
    fn uniform_shared_by_both_stages_is_visible_to_both() {
        let vs = r#"
@group(0) @binding(1) var<uniform> time: f32;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position * (1.0 + 0.0 * time), 0.0, 1.0);
}
"#;
        let layout = link(vs, FS).unwrap();
        assert_eq!(
            layout.uniform(TIME).unwrap().visibility,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let v = compile_stage(Stage::Vertex, VS).unwrap();
        let f = compile_stage(Stage::Fragment, FS).unwrap();
        assert!(matches!(link_interfaces(&f, &v), Err(ShaderError::Link { .. })));
    }

    // ── uploads ───────────────────────────────────────────────────────────

    #[test]
    fn storage_buffer_fails_to_link() {
        let fs = r#"
@group(0) @binding(1) var<uniform> time: f32;
@group(0) @binding(2) var<storage, read> data: array<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(data[0] + time);
}
"#;
        let iface = compile_stage(Stage::Fragment, fs).unwrap();
        assert_eq!(iface.uniforms.len(), 1);
        assert_eq!(iface.resources.len(), 1);
        assert_eq!(iface.resources[0].kind, ResourceKind::Storage);

        let log = link_log(VS, fs);
        assert!(log.contains("storage buffer `data`"), "{log}");
    }

    #[test]
    fn texture_and_sampler_fail_to_link() {
        let fs = r#"
@group(0) @binding(0) var tex: texture_2d<f32>;
@group(0) @binding(1) var samp: sampler;

@fragment
fn fs_main(@builtin(position) p: vec4<f32>) -> @location(0) vec4<f32> {
    return textureSample(tex, samp, p.xy);
}
"#;
        let iface = compile_stage(Stage::Fragment, fs).unwrap();
        let kinds: Vec<ResourceKind> = iface.resources.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&ResourceKind::Texture));
        assert!(kinds.contains(&ResourceKind::Sampler));

        let log = link_log(VS, fs);
        assert!(log.contains("only var<uniform>"), "{log}");
    }

    const VS_FLAT: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) @interpolate(flat) shade: f32,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = vec4<f32>(position, 0.0, 1.0);
    out.shade = position.x;
    return out;
}
"#;

    #[test]
    fn interpolation_mismatch_fails_to_link() {
        let fs = r#"
@fragment
fn fs_main(@location(0) shade: f32) -> @location(0) vec4<f32> {
    return vec4<f32>(shade);
}
"#;
        let log = link_log(VS_FLAT, fs);
        assert!(log.contains("interpolation mismatch"), "{log}");
    }

    #[test]
    fn matching_flat_varyings_link() {
        let fs = r#"
@fragment
fn fs_main(@location(0) @interpolate(flat) shade: f32) -> @location(0) vec4<f32> {
    return vec4<f32>(shade);
}
"#;
        assert!(link(VS_FLAT, fs).is_ok());
    }

    #[test]
    fn upload_to_missing_uniform_is_skipped() {
        let fs = r#"
@group(0) @binding(1) var<uniform> time: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(fract(time), 0.0, 0.0, 1.0);
}
"#;
        let layout = link(VS, fs).unwrap();
        assert_eq!(
            layout.resolve_upload(RESOLUTION, UniformKind::Vec2),
            Err(UploadSkip::Missing)
        );
        assert!(layout.resolve_upload(TIME, UniformKind::Float).is_ok());
    }

    #[test]
    fn upload_of_wrong_kind_is_skipped() {
        let layout = link(VS, FS).unwrap();
        assert_eq!(
            layout.resolve_upload(TIME, UniformKind::Vec2),
            Err(UploadSkip::KindMismatch {
                declared: UniformKind::Float
            })
        );
    }
}
