//! glTF import from in-memory GLB files

use glam::{Vec2, Vec3, Vec4};
use reflectance_lab::resources::{Model, ResourceError};

/// Assemble a GLB container from a JSON document and a binary chunk
fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin = Vec::new();
    for p in positions {
        bin.extend_from_slice(&p.to_le_bytes());
    }
    for i in indices {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin
}

fn triangle_json(mode: u32) -> String {
    format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [
    {{"translation": [1.0, 0.0, 0.0], "children": [1]}},
    {{"mesh": 0, "translation": [0.0, 2.0, 3.0]}}
  ],
  "meshes": [{{"name": "tri", "primitives": [
    {{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0, "mode": {mode}}}
  ]}}],
  "materials": [{{"pbrMetallicRoughness": {{"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}}}}],
  "buffers": [{{"byteLength": 42}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#
    )
}

#[test]
fn imports_triangle_with_node_transforms() {
    let bytes = glb(&triangle_json(4), &triangle_bin());
    let model = Model::from_glb_slice("tri", &bytes).expect("valid GLB");

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.triangle_count(), 1);

    let mesh = &model.meshes[0];
    assert_eq!(mesh.name, "tri");
    assert_eq!(mesh.base_color, Vec4::new(1.0, 0.0, 0.0, 1.0));

    // Parent and child translations are both applied
    let positions: Vec<Vec3> = mesh.vertices.iter().map(|v| v.position).collect();
    assert!(positions.contains(&Vec3::new(1.0, 2.0, 3.0)));
    assert!(positions.contains(&Vec3::new(2.0, 2.0, 3.0)));
    assert!(positions.contains(&Vec3::new(1.0, 3.0, 3.0)));

    // No normals in the file: flat normals from the winding
    assert!(mesh.vertices.iter().all(|v| (v.normal - Vec3::Z).length() < 1e-6));
    // No texture coordinates: zero
    assert!(mesh.vertices.iter().all(|v| v.uv == Vec2::ZERO));

    let (min, max) = model.bounds().expect("non-empty");
    assert_eq!(min, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(max, Vec3::new(2.0, 3.0, 3.0));
}

#[test]
fn non_triangle_primitives_are_skipped() {
    // Mode 0 is POINTS
    let bytes = glb(&triangle_json(0), &triangle_bin());
    let result = Model::from_glb_slice("points", &bytes);
    assert!(matches!(result, Err(ResourceError::EmptyModel)));
}

#[test]
fn garbage_is_an_import_error() {
    let result = Model::from_glb_slice("junk", b"definitely not a model");
    assert!(matches!(result, Err(ResourceError::ModelImport(_))));
}

#[test]
fn missing_file_is_an_import_error() {
    let result = Model::load("does/not/exist.glb");
    assert!(result.is_err());
}
