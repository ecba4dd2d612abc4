//! Refractive glass shading against an environment cubemap

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use super::scene_bindings::{collect_draws, DrawCall, SceneBindings};
use super::{create_mesh_pipeline, MeshPipelineDesc};
use crate::resources::{Cubemap, GpuModel};
use crate::scene::Scene;

const GLASS_WGSL: &str = concat!(
    include_str!("../../shaders/scene_common.wgsl"),
    include_str!("../../shaders/glass.wgsl"),
);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlassParams {
    /// Index of refraction for the green channel
    pub ior: f32,
    /// Red uses `ior - dispersion`, blue `ior + dispersion`
    pub dispersion: f32,
    pub fresnel_power: f32,
    pub tint: Vec3,
    pub transmission: f32,
    /// 0 samples mip 0, 1 samples the smallest mip
    pub roughness: f32,
    pub exposure: f32,
}

impl Default for GlassParams {
    fn default() -> Self {
        Self {
            ior: 1.52,
            dispersion: 0.02,
            fresnel_power: 5.0,
            tint: Vec3::ONE,
            transmission: 0.9,
            roughness: 0.0,
            exposure: 1.0,
        }
    }
}

/// Normal-incidence reflectance for an air/medium interface
pub fn schlick_f0(ior: f32) -> f32 {
    let r = (1.0 - ior) / (1.0 + ior);
    r * r
}

/// Schlick Fresnel with an adjustable exponent
pub fn fresnel(ior: f32, cos_theta: f32, power: f32) -> f32 {
    let f0 = schlick_f0(ior);
    f0 + (1.0 - f0) * (1.0 - cos_theta.clamp(0.0, 1.0)).powf(power)
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlassUniform {
    pub tint: Vec4,
    pub optics: Vec4,
    pub env: Vec4,
    pub _pad: Vec4,
}

impl GlassUniform {
    pub fn from_params(params: &GlassParams, max_mip: f32, env_rotation: f32) -> Self {
        Self {
            tint: params.tint.extend(params.transmission.clamp(0.0, 1.0)),
            optics: Vec4::new(
                params.ior.max(1.0),
                params.dispersion.max(0.0),
                params.fresnel_power.max(0.0),
                params.roughness.clamp(0.0, 1.0),
            ),
            env: Vec4::new(params.exposure.max(0.0), max_mip, env_rotation, 0.0),
            _pad: Vec4::ZERO,
        }
    }
}

pub struct GlassPass {
    bindings: SceneBindings,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    max_mip: f32,
    calls: Vec<DrawCall<()>>,
}

impl GlassPass {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        environment: &Cubemap,
    ) -> Self {
        let bindings = SceneBindings::new(device);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Glass Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<GlassUniform>() as u64
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
            label: Some("Glass Uniforms"),
            size: std::mem::size_of::<GlassUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = Self::create_bind_group(device, &layout, &uniform_buffer, environment);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Glass Pipeline Layout"),
            bind_group_layouts: &[&bindings.scene_layout, &bindings.draw_layout, &layout],
            push_constant_ranges: &[],
        });

        let pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Glass",
                source: GLASS_WGSL,
                layout: &pipeline_layout,
                color_format,
                cull_mode: Some(wgpu::Face::Back),
            },
        );

        Self {
            bindings,
            uniform_buffer,
            bind_group,
            pipeline,
            max_mip: environment.mip_levels.saturating_sub(1) as f32,
            calls: Vec::new(),
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        environment: &Cubemap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Glass Bind Group"),
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

    /// Every entity in the scene is drawn as glass, its reflectance model is ignored
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        params: &GlassParams,
        env_rotation: f32,
        models: &[GpuModel],
    ) {
        self.bindings.write_scene(queue, scene);

        let uniform = GlassUniform::from_params(params, self.max_mip, env_rotation);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let items = scene
            .draw_list()
            .into_iter()
            .map(|(transform, renderer)| (transform.matrix(), renderer.model_id, ()));
        let (uniforms, calls) = collect_draws(items, models);
        self.bindings.write_draws(queue, &uniforms);
        self.calls = calls;
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, models: &'a [GpuModel]) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(2, &self.bind_group, &[]);

        for call in &self.calls {
            let Some(mesh) = models
                .get(call.model_id)
                .and_then(|model| model.meshes.get(call.mesh_index))
            else {
                continue;
            };
            self.bindings.bind(pass, call.slot);
            mesh.draw(pass);
        }
    }

    pub fn draw_count(&self) -> usize {
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crown_glass_reflects_about_four_percent() {
        let f0 = schlick_f0(1.52);
        assert!((f0 - 0.0426).abs() < 1e-3);
        assert_eq!(schlick_f0(1.0), 0.0);
    }

    #[test]
    fn fresnel_rises_to_one_at_grazing_angles() {
        let head_on = fresnel(1.52, 1.0, 5.0);
        let grazing = fresnel(1.52, 0.0, 5.0);
        assert!((head_on - schlick_f0(1.52)).abs() < 1e-6);
        assert!((grazing - 1.0).abs() < 1e-6);
        assert!(fresnel(1.52, 0.5, 5.0) > head_on);
    }

    #[test]
    fn uniform_clamps_out_of_range_values() {
        let params = GlassParams {
            ior: 0.5,
            transmission: 2.0,
            roughness: -1.0,
            ..Default::default()
        };
        let uniform = GlassUniform::from_params(&params, 9.0, 0.25);
        assert_eq!(uniform.optics.x, 1.0);
        assert_eq!(uniform.tint.w, 1.0);
        assert_eq!(uniform.optics.w, 0.0);
        assert_eq!(uniform.env.y, 9.0);
        assert_eq!(uniform.env.z, 0.25);
    }

    #[test]
    fn uniform_matches_wgsl_size() {
        assert_eq!(std::mem::size_of::<GlassUniform>(), 64);
    }
}
