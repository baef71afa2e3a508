use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Vertices drawn per frame: two triangles.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// A clip-space position. Two tightly packed `f32`s.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
}

impl QuadVertex {
    pub const STRIDE: wgpu::BufferAddress = std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress;

    /// The position attribute: `Float32x2` at offset 0, not normalized.
    pub const fn attribute(shader_location: u32) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location,
        }
    }
}

/// Two triangles covering the rectangle from `(x, y)` to `(x + width, y + height)`.
///
/// Order: (x1,y1) (x2,y1) (x1,y2) | (x1,y2) (x2,y1) (x2,y2).
pub const fn rectangle_vertices(x: f32, y: f32, width: f32, height: f32) -> [QuadVertex; 6] {
    let (x1, x2) = (x, x + width);
    let (y1, y2) = (y, y + height);
    [
        QuadVertex { pos: [x1, y1] },
        QuadVertex { pos: [x2, y1] },
        QuadVertex { pos: [x1, y2] },
        QuadVertex { pos: [x1, y2] },
        QuadVertex { pos: [x2, y1] },
        QuadVertex { pos: [x2, y2] },
    ]
}

/// The whole clip-space square `[-1, 1] x [-1, 1]`.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = rectangle_vertices(-1.0, -1.0, 2.0, 2.0);

/// Static vertex buffer holding [`FULLSCREEN_QUAD`].
///
/// Created with `VERTEX` usage only, so its contents cannot change after upload.
pub struct QuadGeometry {
    buffer: wgpu::Buffer,
}

impl QuadGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shaderloop quad vbo"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    /// Buffer layout for the quad, feeding `attributes` (empty when the vertex
    /// stage reads no position).
    pub fn vertex_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: QuadVertex::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Binds the buffer to vertex slot 0.
    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.buffer.slice(..));
    }
}
