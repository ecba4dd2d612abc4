//! Equirectangular HDR to cubemap conversion
//!
//! A unit cube is rendered once per face from the origin with a 90° camera,
//! and each fragment samples the equirect map along its direction. The result
//! is then mipmapped so rough glass can sample blurred levels.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use super::mipmap::MipmapGenerator;
use crate::backend::types::position_only_layout;
use crate::resources::{
    cube_face_direction, skybox_cube, validate_cubemap_size, Cubemap, HdrImage, HdrTexture,
    ResourceError, ResourceResult, CUBEMAP_FORMAT,
};

const EQUIRECT_TO_CUBE_WGSL: &str = include_str!("../../shaders/equirect_to_cube.wgsl");

const CAPTURE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Offset between per-face uniforms, the minimum dynamic offset alignment
const FACE_UNIFORM_STRIDE: u64 = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FaceUniform {
    view_proj: Mat4,
}

/// 90° square projection with Y flipped, so image rows grow downwards like texel rows
pub fn capture_projection() -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 10.0)
}

/// Look-at matrices from the origin toward +X, -X, +Y, -Y, +Z, -Z
pub fn capture_views() -> [Mat4; 6] {
    [
        Mat4::look_at_rh(Vec3::ZERO, Vec3::X, Vec3::NEG_Y),
        Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_X, Vec3::NEG_Y),
        Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Z),
        Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Y, Vec3::NEG_Z),
        Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::NEG_Y),
        Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::NEG_Y),
    ]
}

/// A converter renders only into HDR cubemaps of its own edge length
fn check_target(expected: u32, size: u32, format: wgpu::TextureFormat) -> ResourceResult<()> {
    if size != expected {
        return Err(ResourceError::FaceSizeMismatch {
            expected,
            width: size,
            height: size,
        });
    }
    if format != CUBEMAP_FORMAT {
        return Err(ResourceError::UnsupportedFormat(format));
    }
    Ok(())
}

fn pack_face_uniforms() -> Vec<u8> {
    let projection = capture_projection();
    let stride = FACE_UNIFORM_STRIDE as usize;
    let mut bytes = vec![0u8; 6 * stride];
    for (face, view) in capture_views().iter().enumerate() {
        let uniform = FaceUniform {
            view_proj: projection * *view,
        };
        let src = bytemuck::bytes_of(&uniform);
        bytes[face * stride..face * stride + src.len()].copy_from_slice(src);
    }
    bytes
}

pub struct HdrConverter {
    size: u32,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    face_buffer: wgpu::Buffer,
    cube_buffer: wgpu::Buffer,
    depth_view: wgpu::TextureView,
    mipmaps: MipmapGenerator,
}

impl HdrConverter {
    pub fn new(device: &wgpu::Device, cubemap_size: u32) -> ResourceResult<Self> {
        let size = validate_cubemap_size(cubemap_size)?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Equirect Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<FaceUniform>() as u64
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let face_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Capture Face Uniforms"),
            contents: &pack_face_uniforms(),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let cube_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Capture Cube"),
            contents: bytemuck::cast_slice(&skybox_cube()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Depth"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Equirect To Cube Shader"),
            source: wgpu::ShaderSource::Wgsl(EQUIRECT_TO_CUBE_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Equirect To Cube Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Equirect To Cube Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[position_only_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            // Seen from inside, and the flipped projection mirrors the winding
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: CAPTURE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: CUBEMAP_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
        });

        let mipmaps = MipmapGenerator::new(device, CUBEMAP_FORMAT);

        log::info!("HDR converter ready for {}x{} faces", size, size);

        Ok(Self {
            size,
            pipeline,
            layout,
            face_buffer,
            cube_buffer,
            depth_view,
            mipmaps,
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn check_target(&self, cubemap: &Cubemap) -> ResourceResult<()> {
        check_target(self.size, cubemap.size, cubemap.format)
    }

    /// Render all six faces of `cubemap` from `source`, then build its mip chain.
    /// Everything is recorded into one submission.
    pub fn convert(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &HdrTexture,
        cubemap: &Cubemap,
    ) -> ResourceResult<()> {
        self.check_target(cubemap)?;

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Equirect Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.face_buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<FaceUniform>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&source.sampler),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Equirect To Cube Encoder"),
        });

        for face in 0..6u32 {
            let target = cubemap.face_view(face, 0);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Capture Face"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[face * FACE_UNIFORM_STRIDE as u32]);
            pass.set_vertex_buffer(0, self.cube_buffer.slice(..));
            pass.draw(0..36, 0..1);
        }

        self.mipmaps
            .generate(device, &mut encoder, &cubemap.texture, cubemap.mip_levels, 6);

        queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "Converted {}x{} equirect map into a {}x{} cubemap ({} mips)",
            source.width,
            source.height,
            cubemap.size,
            cubemap.size,
            cubemap.mip_levels
        );
        Ok(())
    }

    /// Fill the mip chain of a cubemap whose level 0 was written from the CPU
    pub fn generate_mipmaps(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cubemap: &Cubemap,
    ) -> ResourceResult<()> {
        self.check_target(cubemap)?;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cubemap Mipmap Encoder"),
        });
        self.mipmaps
            .generate(device, &mut encoder, &cubemap.texture, cubemap.mip_levels, 6);
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// CPU reference conversion with nearest sampling, faces ordered like the GPU path.
    /// Each face is `size * size` texels in row-major order.
    pub fn convert_cpu(image: &HdrImage, size: u32) -> Vec<Vec<Vec4>> {
        let texel = |i: u32| (i as f32 + 0.5) / size as f32 * 2.0 - 1.0;

        let faces: Vec<Vec<Vec4>> = (0..6)
            .map(|face| {
                (0..size)
                    .flat_map(|y| (0..size).map(move |x| (x, y)))
                    .map(|(x, y)| image.sample_direction(cube_face_direction(face, texel(x), texel(y))))
                    .collect()
            })
            .collect();

        log::info!(
            "Converted {}x{} equirect map into {}x{} faces on the CPU",
            image.width,
            image.height,
            size,
            size
        );
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(face: usize, dir: Vec3) -> Vec3 {
        let clip = capture_projection() * capture_views()[face] * dir.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn target_of_matching_size_and_format_is_accepted() {
        assert!(check_target(512, 512, CUBEMAP_FORMAT).is_ok());
    }

    #[test]
    fn target_size_mismatch_is_rejected() {
        let err = check_target(512, 256, CUBEMAP_FORMAT).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::FaceSizeMismatch {
                expected: 512,
                width: 256,
                height: 256
            }
        ));
    }

    #[test]
    fn ldr_target_is_rejected() {
        let err = check_target(512, 512, wgpu::TextureFormat::Rgba8UnormSrgb).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::UnsupportedFormat(wgpu::TextureFormat::Rgba8UnormSrgb)
        ));
    }

    #[test]
    fn face_views_match_texel_directions() {
        let samples = [(-0.5, -0.5), (0.5, -0.25), (0.0, 0.0), (-0.75, 0.6), (0.3, 0.9)];
        for face in 0..6 {
            for &(u, v) in &samples {
                let ndc = project(face, cube_face_direction(face, u, v));
                assert!((ndc.x - u).abs() < 1e-4, "face {} u {}: {}", face, u, ndc.x);
                assert!((ndc.y + v).abs() < 1e-4, "face {} v {}: {}", face, v, ndc.y);
                assert!((0.0..=1.0).contains(&ndc.z));
            }
        }
    }

    #[test]
    fn face_centers_look_down_axes() {
        let axes = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        for (face, axis) in axes.iter().enumerate() {
            let ndc = project(face, *axis);
            assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        }
    }

    #[test]
    fn face_uniforms_sit_on_dynamic_offsets() {
        let bytes = pack_face_uniforms();
        assert_eq!(bytes.len(), 6 * FACE_UNIFORM_STRIDE as usize);
        let size = std::mem::size_of::<FaceUniform>();
        let third: FaceUniform =
            bytemuck::pod_read_unaligned(&bytes[2 * FACE_UNIFORM_STRIDE as usize..][..size]);
        assert_eq!(third.view_proj, capture_projection() * capture_views()[2]);
    }

    #[test]
    fn cpu_faces_sample_along_face_directions() {
        let image = HdrImage::procedural_sky(64, 32);
        let size = 16;
        let faces = HdrConverter::convert_cpu(&image, size);
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|f| f.len() == (size * size) as usize));

        let (x, y) = (3u32, 11u32);
        let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
        let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
        for (face, texels) in faces.iter().enumerate() {
            let expected = image.sample_direction(cube_face_direction(face, u, v));
            assert_eq!(texels[(y * size + x) as usize], expected);
        }
    }

    #[test]
    fn cpu_faces_keep_sky_up_and_ground_down() {
        let image = HdrImage::procedural_sky(64, 32);
        let faces = HdrConverter::convert_cpu(&image, 16);
        let mean = |face: &[Vec4]| face.iter().copied().sum::<Vec4>() / face.len() as f32;
        let top = mean(&faces[2]);
        let bottom = mean(&faces[3]);
        assert!(top.z > top.x, "top face should be blue: {:?}", top);
        assert!(bottom.x > bottom.z, "bottom face should be brown: {:?}", bottom);
    }
}
