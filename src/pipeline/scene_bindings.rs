//! Scene (group 0) and per-draw (group 1) uniform bindings
//!
//! Per-draw data lives in one buffer addressed with a dynamic offset, so all
//! uniforms for a frame are written before the render pass begins.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};

use crate::backend::{CameraUniform, DrawUniform, DRAW_UNIFORM_STRIDE};
use crate::resources::GpuModel;
use crate::scene::{LightUniform, Scene};

/// Upper bound on draws recorded per frame
pub const MAX_DRAWS: usize = 1024;

/// Scene uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniform {
    pub camera: CameraUniform,
    pub light: LightUniform,
}

impl SceneUniform {
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            camera: scene.camera.uniform_data(),
            light: LightUniform::from(&scene.light),
        }
    }
}

/// One recorded draw: which slot of the draw buffer, which mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall<T> {
    pub slot: u32,
    pub model_id: usize,
    pub mesh_index: usize,
    pub key: T,
}

/// Expand `(transform, key)` pairs into per-mesh draw uniforms and calls.
/// Entries referring to unknown models are skipped; output is capped at `MAX_DRAWS`.
pub fn collect_draws<T: Copy>(
    items: impl IntoIterator<Item = (glam::Mat4, usize, T)>,
    models: &[GpuModel],
) -> (Vec<DrawUniform>, Vec<DrawCall<T>>) {
    let mut uniforms = Vec::new();
    let mut calls = Vec::new();

    'outer: for (matrix, model_id, key) in items {
        let Some(model) = models.get(model_id) else {
            log::warn!("Draw references unknown model {}", model_id);
            continue;
        };
        for (mesh_index, mesh) in model.meshes.iter().enumerate() {
            if uniforms.len() == MAX_DRAWS {
                log::warn!("Draw limit of {} reached, dropping the rest", MAX_DRAWS);
                break 'outer;
            }
            calls.push(DrawCall {
                slot: uniforms.len() as u32,
                model_id,
                mesh_index,
                key,
            });
            uniforms.push(DrawUniform::new(matrix, mesh.base_color));
        }
    }

    (uniforms, calls)
}

/// Pack draw uniforms at the dynamic offset stride
pub fn pack_draws(draws: &[DrawUniform]) -> Vec<u8> {
    let stride = DRAW_UNIFORM_STRIDE as usize;
    let mut bytes = vec![0u8; draws.len() * stride];
    for (i, draw) in draws.iter().enumerate() {
        let src = bytemuck::bytes_of(draw);
        bytes[i * stride..i * stride + src.len()].copy_from_slice(src);
    }
    bytes
}

pub struct SceneBindings {
    pub scene_layout: wgpu::BindGroupLayout,
    pub draw_layout: wgpu::BindGroupLayout,
    scene_buffer: wgpu::Buffer,
    draw_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    draw_bind_group: wgpu::BindGroup,
}

impl SceneBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64),
                },
                count: None,
            }],
        });

        let draw_size = NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64);
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: draw_size,
                },
                count: None,
            }],
        });

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: MAX_DRAWS as u64 * DRAW_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: draw_size,
                }),
            }],
        });

        Self {
            scene_layout,
            draw_layout,
            scene_buffer,
            draw_buffer,
            scene_bind_group,
            draw_bind_group,
        }
    }

    pub fn write_scene(&self, queue: &wgpu::Queue, scene: &Scene) {
        let uniform = SceneUniform::from_scene(scene);
        queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn write_draws(&self, queue: &wgpu::Queue, draws: &[DrawUniform]) {
        if draws.is_empty() {
            return;
        }
        queue.write_buffer(&self.draw_buffer, 0, &pack_draws(draws));
    }

    /// Bind group 0 and the group 1 slice for one draw slot
    pub fn bind<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, slot: u32) {
        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        let offset = slot * DRAW_UNIFORM_STRIDE as u32;
        pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
    }
}
