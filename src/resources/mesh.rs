//! Mesh data structures and generation

use crate::backend::types::Vertex;
use glam::{Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub base_color: Vec4,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            base_color: Vec4::ONE,
            name: name.to_string(),
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.min(v.position), max.max(v.position))
        }))
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces = [
            // Front face
            (Vec3::new(-0.5, -0.5, 0.5), Vec3::new(0.5, -0.5, 0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::new(-0.5, 0.5, 0.5), Vec3::Z),
            // Back face
            (Vec3::new(0.5, -0.5, -0.5), Vec3::new(-0.5, -0.5, -0.5), Vec3::new(-0.5, 0.5, -0.5), Vec3::new(0.5, 0.5, -0.5), Vec3::NEG_Z),
            // Right face
            (Vec3::new(0.5, -0.5, 0.5), Vec3::new(0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, -0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::X),
            // Left face
            (Vec3::new(-0.5, -0.5, -0.5), Vec3::new(-0.5, -0.5, 0.5), Vec3::new(-0.5, 0.5, 0.5), Vec3::new(-0.5, 0.5, -0.5), Vec3::NEG_X),
            // Top face
            (Vec3::new(-0.5, 0.5, 0.5), Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.5, 0.5, -0.5), Vec3::new(-0.5, 0.5, -0.5), Vec3::Y),
            // Bottom face
            (Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, -0.5, -0.5), Vec3::new(0.5, -0.5, 0.5), Vec3::new(-0.5, -0.5, 0.5), Vec3::NEG_Y),
        ];
        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        for (a, b, c, d, normal) in faces {
            let base = mesh.vertices.len() as u32;
            for (position, uv) in [a, b, c, d].into_iter().zip(uvs) {
                mesh.vertices.push(Vertex::new(position, normal, uv));
            }
            // Two counter-clockwise triangles per face
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a UV sphere of radius 0.5
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut mesh = Mesh::new("sphere");

        let segment_angle = std::f32::consts::TAU / segments as f32;
        let ring_angle = std::f32::consts::PI / rings as f32;

        for ring in 0..=rings {
            let phi = ring as f32 * ring_angle;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                let theta = segment as f32 * segment_angle;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                let uv = Vec2::new(segment as f32 / segments as f32, ring as f32 / rings as f32);
                mesh.vertices
                    .push(Vertex::new(normal * 0.5, normal.normalize_or_zero(), uv));
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;

                mesh.indices.extend_from_slice(&[
                    current,
                    current + 1,
                    next,
                    current + 1,
                    next + 1,
                    next,
                ]);
            }
        }

        mesh
    }
}

/// 36 position-only vertices of the cube spanning [-1, 1], for the skybox and
/// the cubemap converter (drawn with culling disabled)
pub fn skybox_cube() -> Vec<Vec3> {
    let corners = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];
    const FACES: [[usize; 4]; 6] = [
        [1, 5, 6, 2], // +X
        [4, 0, 3, 7], // -X
        [3, 2, 6, 7], // +Y
        [4, 5, 1, 0], // -Y
        [5, 4, 7, 6], // +Z
        [0, 1, 2, 3], // -Z
    ];

    FACES
        .iter()
        .flat_map(|[a, b, c, d]| [*a, *b, *c, *a, *c, *d])
        .map(|i| corners[i])
        .collect()
}

/// Vertex and index buffers of an uploaded mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub base_color: Vec4,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} vertices", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} indices", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            base_color: mesh.base_color,
        }
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle's winding agrees with its vertex normals (counter-clockwise from outside)
    fn assert_outward_winding(mesh: &Mesh) {
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.vertices[tri[i] as usize]);
            let face = (b.position - a.position).cross(c.position - a.position);
            if face.length_squared() < 1e-12 {
                continue;
            }
            let normal = a.normal + b.normal + c.normal;
            assert!(face.dot(normal) > 0.0, "triangle {:?} is wound inward", tri);
        }
    }

    #[test]
    fn cube_is_closed_and_outward() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_outward_winding(&cube);
        assert_eq!(cube.bounds(), Some((Vec3::splat(-0.5), Vec3::splat(0.5))));
    }

    #[test]
    fn sphere_normals_are_unit_and_outward() {
        let sphere = Mesh::sphere(16, 8);
        assert_eq!(sphere.vertex_count(), 17 * 9);
        assert_eq!(sphere.index_count(), 16 * 8 * 6);
        assert_outward_winding(&sphere);
        for v in &sphere.vertices {
            assert!((v.normal.length() - 1.0).abs() < 1e-5);
            assert!((v.position.length() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn skybox_cube_spans_unit_range() {
        let cube = skybox_cube();
        assert_eq!(cube.len(), 36);
        assert!(cube.iter().all(|p| p.abs() == Vec3::ONE));
        // Each face's six vertices share one fixed coordinate
        for face in cube.chunks(6) {
            let shared = (0..3).filter(|&axis| face.iter().all(|p| p[axis] == face[0][axis]));
            assert_eq!(shared.count(), 1);
        }
    }
}
