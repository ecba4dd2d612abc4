//! Cube textures: render targets for the HDR converter and LDR skybox faces

use super::{mip_level_count, ResourceError, ResourceResult, TextureData};
use glam::{Vec3, Vec4};
use std::path::{Path, PathBuf};

/// Format of every converted environment cubemap
pub const CUBEMAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Face names in layer order, used for `--skybox-faces` file lookup
pub const FACE_NAMES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

/// Check a cubemap edge length: a power of two in 16..=4096
pub fn validate_cubemap_size(size: u32) -> ResourceResult<u32> {
    if size.is_power_of_two() && (16..=4096).contains(&size) {
        Ok(size)
    } else {
        Err(ResourceError::InvalidCubemapSize(size))
    }
}

const FACE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn find_face_file(dir: &Path, name: &str) -> ResourceResult<PathBuf> {
    FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| ResourceError::Io {
            path: dir.join(name),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no {}.png/.jpg face image", name),
            ),
        })
}

/// Load the six skybox face images named after [`FACE_NAMES`] from `dir`
pub fn load_face_images(dir: &Path) -> ResourceResult<[TextureData; 6]> {
    let mut faces = Vec::with_capacity(6);
    for name in FACE_NAMES {
        faces.push(TextureData::from_file(find_face_file(dir, name)?)?);
    }
    faces.try_into().map_err(|_| ResourceError::EmptyImage)
}

/// Check that all six faces are square and share one edge length, returning it
pub fn validate_faces(faces: &[TextureData; 6]) -> ResourceResult<u32> {
    let size = faces[0].width;
    match faces
        .iter()
        .find(|face| face.width != face.height || face.width != size)
    {
        Some(face) => Err(ResourceError::FaceSizeMismatch {
            expected: size,
            width: face.width,
            height: face.height,
        }),
        None => Ok(size),
    }
}

/// Direction through a face texel. `u`, `v` are in [-1, 1] with `v` growing
/// downwards in the image. Faces are ordered +X, -X, +Y, -Y, +Z, -Z.
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Cube texture with a full-cube view and a trilinear sampler
pub struct Cubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
    pub mip_levels: u32,
    pub format: wgpu::TextureFormat,
}

impl Cubemap {
    /// Number of mip levels for an edge length
    pub fn mip_levels(size: u32) -> u32 {
        mip_level_count(size)
    }

    /// Empty HDR cubemap that can be rendered into layer by layer
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        Self::create(
            device,
            size,
            Self::mip_levels(size),
            CUBEMAP_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            "Environment Cubemap",
        )
    }

    /// LDR skybox from six square faces, mips built on the CPU
    pub fn from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[TextureData; 6],
    ) -> ResourceResult<Self> {
        let edge = validate_faces(faces)?;
        let max = device.limits().max_texture_dimension_2d;
        let resized: Option<Vec<TextureData>> = (edge > max).then(|| {
            log::warn!(
                "Skybox faces {}x{} exceed the {} texel limit, downscaling",
                edge,
                edge,
                max
            );
            faces.iter().map(|face| face.resized(max, max)).collect()
        });
        let size = edge.min(max);
        let faces = resized.as_deref().unwrap_or(faces.as_slice());

        let cubemap = Self::create(
            device,
            size,
            Self::mip_levels(size),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "Skybox Cubemap",
        );

        for (layer, face) in faces.iter().enumerate() {
            for (level, mip) in face.mip_chain().iter().enumerate() {
                cubemap.write_layer(queue, layer as u32, level as u32, mip.width, &mip.data, 4);
            }
        }

        Ok(cubemap)
    }

    /// HDR cubemap from six CPU-baked faces; only level 0 is written
    pub fn from_hdr_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        faces: &[Vec<Vec4>],
    ) -> ResourceResult<Self> {
        let expected = (size * size) as usize;
        if faces.len() != 6 {
            return Err(ResourceError::EmptyImage);
        }
        if let Some(face) = faces.iter().find(|f| f.len() != expected) {
            let side = (face.len() as f32).sqrt() as u32;
            return Err(ResourceError::FaceSizeMismatch {
                expected: size,
                width: side,
                height: side,
            });
        }

        let cubemap = Self::new(device, size);
        for (layer, face) in faces.iter().enumerate() {
            let data: Vec<half::f16> = face
                .iter()
                .flat_map(|p| p.to_array())
                .map(half::f16::from_f32)
                .collect();
            cubemap.write_layer(queue, layer as u32, 0, size, bytemuck::cast_slice(&data), 8);
        }
        Ok(cubemap)
    }

    fn create(
        device: &wgpu::Device,
        size: u32,
        mip_levels: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Cubemap Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
            mip_levels,
            format,
        }
    }

    fn write_layer(
        &self,
        queue: &wgpu::Queue,
        layer: u32,
        level: u32,
        edge: u32,
        data: &[u8],
        bytes_per_pixel: u32,
    ) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(edge * bytes_per_pixel),
                rows_per_image: Some(edge),
            },
            wgpu::Extent3d {
                width: edge,
                height: edge,
                depth_or_array_layers: 1,
            },
        );
    }

    /// 2D view of one face at one mip level, for use as a render target
    pub fn face_view(&self, face: u32, mip_level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Cubemap Face"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: mip_level,
            mip_level_count: Some(1),
            base_array_layer: face,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_centers_point_along_axes() {
        let expected = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        for (face, axis) in expected.iter().enumerate() {
            assert!((cube_face_direction(face, 0.0, 0.0) - *axis).length() < 1e-6);
        }
    }

    #[test]
    fn top_of_side_faces_looks_up() {
        for face in [0, 1, 4, 5] {
            assert!(cube_face_direction(face, 0.0, -0.9).y > 0.0);
        }
        // +Y face: image top is towards -Z
        assert!(cube_face_direction(2, 0.0, -0.9).z < 0.0);
    }

    #[test]
    fn adjacent_faces_share_edges() {
        // Right edge of +Z meets left edge of +X
        let a = cube_face_direction(4, 1.0, 0.3);
        let b = cube_face_direction(0, -1.0, 0.3);
        assert!((a - b).length() < 1e-6);
    }

    #[test]
    fn mip_levels_for_common_sizes() {
        assert_eq!(Cubemap::mip_levels(512), 10);
        assert_eq!(Cubemap::mip_levels(16), 5);
    }

    #[test]
    fn face_images_load_in_layer_order() {
        let dir = std::env::temp_dir().join(format!("reflectance-lab-faces-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, name) in FACE_NAMES.iter().enumerate() {
            let ext = if i % 2 == 0 { "png" } else { "jpg" };
            let pixel = image::Rgb([i as u8 * 40, 0, 0]);
            image::RgbImage::from_pixel(4, 4, pixel)
                .save(dir.join(format!("{}.{}", name, ext)))
                .unwrap();
        }

        let faces = load_face_images(&dir).unwrap();
        for (face, name) in faces.iter().zip(FACE_NAMES) {
            assert!(face.name.starts_with(name));
            assert_eq!((face.width, face.height), (4, 4));
        }
        assert_eq!(faces[0].data[0], 0);
        assert!(faces[4].data[0] > 100);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_face_reports_its_name() {
        let dir = std::env::temp_dir().join("reflectance-lab-no-faces");
        let err = load_face_images(&dir).unwrap_err();
        assert!(matches!(err, ResourceError::Io { ref path, .. } if path.ends_with("right")));
    }

    fn face(width: u32, height: u32) -> TextureData {
        TextureData {
            name: "face".into(),
            width,
            height,
            data: vec![255; (width * height * 4) as usize],
        }
    }

    #[test]
    fn matching_square_faces_pass() {
        let faces = std::array::from_fn(|_| face(32, 32));
        assert_eq!(validate_faces(&faces).unwrap(), 32);
    }

    #[test]
    fn non_square_face_is_rejected() {
        let mut faces: [TextureData; 6] = std::array::from_fn(|_| face(32, 32));
        faces[3] = face(32, 16);
        let err = validate_faces(&faces).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::FaceSizeMismatch {
                expected: 32,
                width: 32,
                height: 16
            }
        ));
    }

    #[test]
    fn unequal_faces_are_rejected() {
        let mut faces: [TextureData; 6] = std::array::from_fn(|_| face(32, 32));
        faces[5] = face(64, 64);
        let err = validate_faces(&faces).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::FaceSizeMismatch {
                expected: 32,
                width: 64,
                height: 64
            }
        ));
    }

    #[test]
    fn size_validation() {
        assert_eq!(validate_cubemap_size(512).unwrap(), 512);
        assert!(validate_cubemap_size(8).is_err());
        assert!(validate_cubemap_size(500).is_err());
        assert!(validate_cubemap_size(8192).is_err());
    }
}
