use std::collections::BTreeMap;

use crate::render::{QuadGeometry, QuadVertex};

use super::reflect::{self, ProgramLayout, StageInterface, UniformKind, UniformLocation, UploadSkip};
use super::{ShaderError, ShaderSource, Stage, POSITION};

/// A value for a per-frame uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::cast_slice(v),
        }
    }
}

/// A validated stage and its GPU shader module.
///
/// Only needed until linking; dropping it releases the module.
pub struct CompiledShader {
    interface: StageInterface,
    module: wgpu::ShaderModule,
}

impl CompiledShader {
    #[inline]
    pub fn stage(&self) -> Stage {
        self.interface.stage
    }

    #[inline]
    pub fn interface(&self) -> &StageInterface {
        &self.interface
    }
}

struct UniformSlot {
    location: UniformLocation,
    buffer: wgpu::Buffer,
    warned_kind_mismatch: bool,
}

/// A linked render pipeline plus its resolved attribute and uniform locations.
///
/// Only constructed by [`ProgramBuilder::link`], so every instance is fully usable.
pub struct CompiledProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: Option<wgpu::BindGroup>,
    uniforms: BTreeMap<String, UniformSlot>,
    layout: ProgramLayout,
}

impl CompiledProgram {
    #[inline]
    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    #[inline]
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.layout.attribute(name)
    }

    #[inline]
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.layout.uniform(name)
    }

    /// Uploads `value` to the uniform `name`.
    ///
    /// Returns `false` without uploading if the program has no active uniform of
    /// that name or declares it with a different type.
    pub fn write_uniform(&mut self, queue: &wgpu::Queue, name: &str, value: UniformValue) -> bool {
        match self.layout.resolve_upload(name, value.kind()) {
            Ok(_) => {}
            Err(UploadSkip::Missing) => {
                log::trace!("uniform `{name}` not active; upload skipped");
                return false;
            }
            Err(UploadSkip::KindMismatch { declared }) => {
                if let Some(slot) = self.uniforms.get_mut(name) {
                    if !slot.warned_kind_mismatch {
                        log::warn!(
                            "uniform `{name}` is declared as {declared:?}, got {:?}; upload skipped",
                            value.kind()
                        );
                        slot.warned_kind_mismatch = true;
                    }
                }
                return false;
            }
        }

        let Some(slot) = self.uniforms.get(name) else { return false };
        queue.write_buffer(&slot.buffer, 0, value.as_bytes());
        true
    }

    /// Binds the pipeline and its uniform bind group.
    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline);
        if let Some(bind_group) = &self.bind_group {
            rpass.set_bind_group(0, bind_group, &[]);
        }
    }
}

/// Compiles WGSL stages and links them into a [`CompiledProgram`] targeting
/// one surface format.
///
/// Failures are logged with their full diagnostic and returned as
/// [`ShaderError`]; no GPU object outlives a failed build.
pub struct ProgramBuilder<'a> {
    device: &'a wgpu::Device,
    target_format: wgpu::TextureFormat,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(device: &'a wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            target_format,
        }
    }

    /// Compiles one stage.
    ///
    /// The source is validated before a shader module is created, so a failed
    /// compile leaves nothing behind on the device.
    pub fn compile(&self, stage: Stage, source: &str) -> Result<CompiledShader, ShaderError> {
        let interface = reflect::compile_stage(stage, source).inspect_err(log_failure)?;

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    Stage::Vertex => "shaderloop vertex shader",
                    Stage::Fragment => "shaderloop fragment shader",
                }),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(err) = pollster::block_on(scope.pop()) {
            let err = ShaderError::Compile {
                stage,
                log: err.to_string(),
            };
            log_failure(&err);
            return Err(err);
        }

        log::debug!("compiled {stage} shader (entry `{}`)", interface.entry_point);
        Ok(CompiledShader { interface, module })
    }

    /// Links a vertex and a fragment shader and allocates one uniform buffer per
    /// active uniform.
    pub fn link(
        &self,
        vertex: &CompiledShader,
        fragment: &CompiledShader,
    ) -> Result<CompiledProgram, ShaderError> {
        let layout = reflect::link_interfaces(&vertex.interface, &fragment.interface)
            .inspect_err(log_failure)?;

        // Reflection covers what linking checks; anything else wgpu rejects is
        // caught here instead of reaching the uncaptured-error handler.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = layout
            .uniforms
            .values()
            .map(|loc| wgpu::BindGroupLayoutEntry {
                binding: loc.binding,
                visibility: loc.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(loc.size),
                },
                count: None,
            })
            .collect();
        entries.sort_by_key(|e| e.binding);

        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shaderloop uniforms bgl"),
                entries: &entries,
            });

        let uniforms: BTreeMap<String, UniformSlot> = layout
            .uniforms
            .iter()
            .map(|(name, loc)| {
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(name.as_str()),
                    size: wgpu::util::align_to(loc.size, 16),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let slot = UniformSlot {
                    location: *loc,
                    buffer,
                    warned_kind_mismatch: false,
                };
                (name.clone(), slot)
            })
            .collect();

        let bind_group = (!uniforms.is_empty()).then(|| {
            let bind_entries: Vec<wgpu::BindGroupEntry<'_>> = uniforms
                .values()
                .map(|slot| wgpu::BindGroupEntry {
                    binding: slot.location.binding,
                    resource: slot.buffer.as_entire_binding(),
                })
                .collect();
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("shaderloop uniforms bind group"),
                layout: &bind_group_layout,
                entries: &bind_entries,
            })
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if uniforms.is_empty() {
            Vec::new()
        } else {
            vec![&bind_group_layout]
        };

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shaderloop pipeline layout"),
                bind_group_layouts: &bind_group_layouts,
                immediate_size: 0,
            });

        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attribute(POSITION)
            .map(QuadVertex::attribute)
            .into_iter()
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("shaderloop pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(layout.vertex_entry.as_str()),
                    compilation_options: Default::default(),
                    buffers: &[QuadGeometry::vertex_layout(&attributes)],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(layout.fragment_entry.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(scope.pop()) {
            let err = ShaderError::Link {
                log: err.to_string(),
            };
            log_failure(&err);
            return Err(err);
        }

        log::info!(
            "linked program: attributes {:?}, uniforms {:?}",
            layout.attributes,
            layout.uniforms.keys().collect::<Vec<_>>()
        );

        Ok(CompiledProgram {
            pipeline,
            bind_group,
            uniforms,
            layout,
        })
    }

    /// Compiles both stages of `source` and links them.
    pub fn build(&self, source: &ShaderSource<'_>) -> Result<CompiledProgram, ShaderError> {
        let vertex = self.compile(Stage::Vertex, source.vertex)?;
        let fragment = self.compile(Stage::Fragment, source.fragment)?;
        self.link(&vertex, &fragment)
    }
}

fn log_failure(err: &ShaderError) {
    log::error!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_kinds() {
        assert_eq!(UniformValue::Float(1.0).kind(), UniformKind::Float);
        assert_eq!(UniformValue::Vec2([1.0, 2.0]).kind(), UniformKind::Vec2);
    }

    #[test]
    fn value_bytes_are_tightly_packed() {
        assert_eq!(UniformValue::Float(1.0).as_bytes(), 1.0f32.to_ne_bytes());
        let v = UniformValue::Vec2([100.0, 50.0]);
        let bytes = v.as_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], 100.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..], 50.0f32.to_ne_bytes());
    }
}
