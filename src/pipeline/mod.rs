//! Render passes
//!
//! - Reflectance: Phong, Cook-Torrance and toon lit models
//! - Skybox: environment cubemap behind the scene
//! - Glass: refraction and reflection of the environment
//! - HDR converter and mipmap generator: offscreen cubemap baking

pub mod glass_pass;
pub mod hdr_converter;
pub mod mipmap;
pub mod reflectance_pass;
pub mod scene_bindings;
pub mod skybox_pass;

pub use glass_pass::{GlassParams, GlassPass};
pub use hdr_converter::HdrConverter;
pub use mipmap::MipmapGenerator;
pub use reflectance_pass::ReflectancePass;
pub use scene_bindings::{SceneBindings, MAX_DRAWS};
pub use skybox_pass::{SkyboxParams, SkyboxPass};

use crate::backend::wgpu_backend::DEPTH_FORMAT;
use crate::backend::Vertex;

pub(crate) struct MeshPipelineDesc<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub layout: &'a wgpu::PipelineLayout,
    pub color_format: wgpu::TextureFormat,
    pub cull_mode: Option<wgpu::Face>,
}

/// Pipeline for `Vertex` meshes with `vs_main`/`fs_main`, depth test `Less`
pub(crate) fn create_mesh_pipeline(
    device: &wgpu::Device,
    desc: &MeshPipelineDesc,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[Vertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
    })
}

/// Main scene pass: clears color and depth
pub fn begin_scene_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    color: &'a wgpu::TextureView,
    depth: &'a wgpu::TextureView,
    clear_color: wgpu::Color,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Scene Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
