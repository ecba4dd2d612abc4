//! Skybox rendering resources.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::backend::types::position_only_layout;
use crate::backend::wgpu_backend::DEPTH_FORMAT;
use crate::resources::{skybox_cube, Cubemap, CUBEMAP_FORMAT};
use crate::scene::Camera;

const SKYBOX_SHADER_WGSL: &str = include_str!("../../shaders/skybox.wgsl");

/// Environment display settings shared with the glass shader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyboxParams {
    pub exposure: f32,
    /// Rotation about +Y in radians
    pub rotation: f32,
}

impl Default for SkyboxParams {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            rotation: 0.0,
        }
    }
}

impl SkyboxParams {
    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure.max(0.0);
        self
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxUniform {
    pub view_proj: Mat4,
    pub params: Vec4,
}

impl SkyboxUniform {
    /// Projection times the camera's rotation only, so the cube follows the eye.
    /// `hdr` selects Reinhard tone mapping; LDR faces are already display-ready.
    pub fn new(camera: &Camera, params: &SkyboxParams, hdr: bool) -> Self {
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(camera.view_matrix()));
        let ldr = if hdr { 0.0 } else { 1.0 };
        Self {
            view_proj: camera.projection_matrix() * rotation_only,
            params: Vec4::new(params.exposure, params.rotation, ldr, 0.0),
        }
    }
}

pub struct SkyboxPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    hdr: bool,
}

impl SkyboxPass {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        environment: &Cubemap,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<SkyboxUniform>() as u64
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
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

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Skybox Uniforms"),
            size: std::mem::size_of::<SkyboxUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Cube"),
            contents: bytemuck::cast_slice(&skybox_cube()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Skybox Shader"),
            source: wgpu::ShaderSource::Wgsl(SKYBOX_SHADER_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[position_only_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Drawn at depth 1.0, so LessEqual against the cleared buffer
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
        });

        let bind_group = Self::create_bind_group(device, &layout, &uniform_buffer, environment);

        let hdr = environment.format == CUBEMAP_FORMAT;
        log::info!(
            "Skybox resources created ({})",
            if hdr { "HDR, tone mapped" } else { "LDR" }
        );

        Self {
            pipeline,
            uniform_buffer,
            vertex_buffer,
            bind_group,
            hdr,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        environment: &Cubemap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&environment.sampler),
                },
            ],
        })
    }

    /// Update skybox uniform buffer with current camera state.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, camera: &Camera, params: &SkyboxParams) {
        let uniform = SkyboxUniform::new(camera, params, self.hdr);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..36, 0..1);
    }
}
