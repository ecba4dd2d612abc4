//! glTF / GLB model import
//!
//! Flattens the default scene into world-space meshes, one per triangle
//! primitive. Node transforms are baked into the vertices.

use super::{GpuMesh, Mesh, ResourceError, ResourceResult};
use crate::backend::Vertex;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::path::Path;

/// CPU-side model: a list of meshes in model space
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

impl Model {
    /// Load a `.gltf` (with external or embedded buffers) or `.glb` file
    pub fn load<P: AsRef<Path>>(path: P) -> ResourceResult<Self> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path)?;
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("model")
            .to_string();

        let model = Self::from_document(&name, &document, &buffers)?;
        log::info!(
            "Loaded model {}: {} meshes, {} triangles",
            path.display(),
            model.meshes.len(),
            model.triangle_count()
        );
        Ok(model)
    }

    /// Import from in-memory GLB (or self-contained glTF JSON) bytes
    pub fn from_glb_slice(name: &str, bytes: &[u8]) -> ResourceResult<Self> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        Self::from_document(name, &document, &buffers)
    }

    /// Wrap a generated mesh
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            name: mesh.name.clone(),
            meshes: vec![mesh],
        }
    }

    fn from_document(
        name: &str,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> ResourceResult<Self> {
        let mut meshes = Vec::new();

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());

        match scene {
            Some(scene) => {
                for node in scene.nodes() {
                    visit_node(&node, Mat4::IDENTITY, buffers, &mut meshes);
                }
            }
            None => {
                // No scene graph: import every mesh untransformed
                for mesh in document.meshes() {
                    import_mesh(&mesh, Mat4::IDENTITY, buffers, &mut meshes);
                }
            }
        }

        if meshes.is_empty() {
            return Err(ResourceError::EmptyModel);
        }

        Ok(Self {
            name: name.to_string(),
            meshes,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Bounds over all meshes as (min, max)
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.meshes
            .iter()
            .filter_map(Mesh::bounds)
            .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
    }
}

/// Depth-first walk accumulating world transforms
fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<Mesh>,
) {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        import_mesh(&mesh, world, buffers, out);
    }

    for child in node.children() {
        visit_node(&child, world, buffers, out);
    }
}

fn import_mesh(
    mesh: &gltf::Mesh,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<Mesh>,
) {
    let mesh_name = mesh.name().unwrap_or("mesh");

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive {} of mesh '{}': only triangles are imported",
                primitive.mode(),
                primitive.index(),
                mesh_name
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d[..]));

        let Some(positions) = reader.read_positions() else {
            log::warn!(
                "Skipping primitive {} of mesh '{}': no positions",
                primitive.index(),
                mesh_name
            );
            continue;
        };
        let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
        if positions.is_empty() {
            continue;
        }

        let normals: Option<Vec<Vec3>> = reader
            .read_normals()
            .map(|iter| iter.map(Vec3::from).collect());

        let uvs: Vec<Vec2> = match reader.read_tex_coords(0) {
            Some(coords) => coords.into_f32().map(Vec2::from).collect(),
            None => {
                log::warn!(
                    "Mesh '{}' has no texture coordinates, using zero",
                    mesh_name
                );
                vec![Vec2::ZERO; positions.len()]
            }
        };

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let base_color = Vec4::from(
            primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor(),
        );

        let name = match mesh.primitives().len() {
            1 => mesh_name.to_string(),
            _ => format!("{}#{}", mesh_name, primitive.index()),
        };

        let local = match normals {
            Some(normals) if normals.len() == positions.len() => {
                build_smooth(&name, &positions, &normals, &uvs, &indices)
            }
            _ => build_flat(&name, &positions, &uvs, &indices),
        };

        out.push(transform_mesh(local, world).with_base_color(base_color));
    }
}

fn build_smooth(
    name: &str,
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    indices: &[u32],
) -> Mesh {
    let mut mesh = Mesh::new(name);
    mesh.vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let uv = uvs.get(i).copied().unwrap_or(Vec2::ZERO);
            Vertex::new(p, normals[i].normalize_or_zero(), uv)
        })
        .collect();
    mesh.indices = indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| (i as usize) < positions.len()))
        .flatten()
        .copied()
        .collect();
    mesh
}

/// One vertex per triangle corner, each carrying its face normal
fn build_flat(name: &str, positions: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> Mesh {
    let mut mesh = Mesh::new(name);

    for tri in indices.chunks_exact(3) {
        if tri.iter().any(|&i| i as usize >= positions.len()) {
            continue;
        }
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| positions[i as usize]);
        let normal = (b - a).cross(c - a).normalize_or_zero();

        for &i in tri {
            let uv = uvs.get(i as usize).copied().unwrap_or(Vec2::ZERO);
            mesh.indices.push(mesh.vertices.len() as u32);
            mesh.vertices
                .push(Vertex::new(positions[i as usize], normal, uv));
        }
    }

    mesh
}

/// Bake a node transform into positions and normals
fn transform_mesh(mut mesh: Mesh, world: Mat4) -> Mesh {
    if world == Mat4::IDENTITY {
        return mesh;
    }

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    for vertex in &mut mesh.vertices {
        vertex.position = world.transform_point3(vertex.position);
        vertex.normal = (normal_matrix * vertex.normal).normalize_or_zero();
    }

    // Mirroring transforms flip triangle winding
    if world.determinant() < 0.0 {
        for tri in mesh.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    mesh
}

/// Uploaded model, one GPU mesh per primitive
pub struct GpuModel {
    pub meshes: Vec<GpuMesh>,
}

impl GpuModel {
    pub fn upload(device: &wgpu::Device, model: &Model) -> Self {
        Self {
            meshes: model
                .meshes
                .iter()
                .map(|mesh| GpuMesh::upload(device, mesh))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        (
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn flat_normals_follow_winding() {
        let (positions, indices) = quad();
        let mesh = build_flat("quad", &positions, &[], &indices);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, (0..6u32).collect::<Vec<_>>());
        assert!(mesh.vertices.iter().all(|v| v.normal == Vec3::Z));
        assert!(mesh.vertices.iter().all(|v| v.uv == Vec2::ZERO));
    }

    #[test]
    fn out_of_range_triangles_are_dropped() {
        let (positions, mut indices) = quad();
        indices.extend_from_slice(&[0, 1, 9]);
        let flat = build_flat("quad", &positions, &[], &indices);
        assert_eq!(flat.triangle_count(), 2);
        let smooth = build_smooth("quad", &positions, &[Vec3::Z; 4], &[], &indices);
        assert_eq!(smooth.triangle_count(), 2);
    }

    #[test]
    fn smooth_normals_are_normalized() {
        let (positions, indices) = quad();
        let mesh = build_smooth("quad", &positions, &[Vec3::new(0.0, 0.0, 3.0); 4], &[], &indices);
        assert!(mesh.vertices.iter().all(|v| v.normal == Vec3::Z));
    }

    #[test]
    fn mirror_transform_keeps_outward_winding() {
        let (positions, indices) = quad();
        let mesh = build_flat("quad", &positions, &[], &indices);
        let mirrored = transform_mesh(mesh, Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0)));

        for tri in mirrored.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| mirrored.vertices[tri[i] as usize]);
            let face = (b.position - a.position).cross(c.position - a.position);
            assert!(face.dot(a.normal) > 0.0);
        }
        assert_eq!(mirrored.vertices[0].normal, Vec3::NEG_Z);
    }
}
