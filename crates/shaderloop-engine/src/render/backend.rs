use winit::window::Window;

use crate::coords::SurfaceTarget;
use crate::core::{FrameBackend, FrameCommand, FrameOutcome, RenderError};
use crate::device::{Gpu, SurfaceErrorAction};
use crate::shader::{CompiledProgram, ProgramBuilder, ShaderError, ShaderSource, UniformValue};
use crate::shader::{RESOLUTION, TIME};

use super::QuadGeometry;

/// Frame backend drawing through wgpu into the window surface.
///
/// Owns the graphics context, the linked program and the quad buffer for the
/// lifetime of the render loop.
pub struct WgpuBackend<'w> {
    window: &'w Window,
    gpu: Gpu<'w>,
    program: CompiledProgram,
    quad: QuadGeometry,
}

impl<'w> WgpuBackend<'w> {
    /// Builds the program from `shaders` and uploads the quad.
    pub fn new(
        window: &'w Window,
        gpu: Gpu<'w>,
        shaders: &ShaderSource<'_>,
    ) -> Result<Self, ShaderError> {
        let program = ProgramBuilder::new(gpu.device(), gpu.surface_format()).build(shaders)?;
        let quad = QuadGeometry::new(gpu.device());

        Ok(Self {
            window,
            gpu,
            program,
            quad,
        })
    }
}

impl SurfaceTarget for WgpuBackend<'_> {
    fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize_surface(width, height);
    }
}

impl FrameBackend for WgpuBackend<'_> {
    fn draw_frame(&mut self, command: &FrameCommand) -> Result<FrameOutcome, RenderError> {
        // Minimized: the surface keeps its last configuration, nothing to draw into.
        if command.viewport.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(&err) {
                    SurfaceErrorAction::Fatal => Err(RenderError::Surface(err)),
                    action => {
                        log::debug!("surface error ({err}); {action:?}");
                        Ok(FrameOutcome::Skipped)
                    }
                };
            }
        };

        let queue = self.gpu.queue();
        self.program
            .write_uniform(queue, RESOLUTION, UniformValue::Vec2(command.resolution));
        self.program
            .write_uniform(queue, TIME, UniformValue::Float(command.time));

        let (texture_width, texture_height) = frame.texture_size();
        let viewport = command.viewport.clamped_to(texture_width, texture_height);

        // Render pass borrows frame.encoder; dropped before submit() takes frame.
        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shaderloop frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(command.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );

            // Pipeline, bind group and vertex buffer are rebound every frame;
            // no state carries over between passes.
            self.program.bind(&mut rpass);
            self.quad.bind(&mut rpass);
            rpass.draw(command.vertices.clone(), 0..1);
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        Ok(FrameOutcome::Drawn)
    }
}
