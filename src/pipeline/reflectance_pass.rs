//! Lit model rendering with one pipeline per reflectance model

use std::num::NonZeroU64;

use super::scene_bindings::{collect_draws, DrawCall, SceneBindings};
use super::{create_mesh_pipeline, MeshPipelineDesc};
use crate::resources::GpuModel;
use crate::scene::Scene;
use crate::shading::{MaterialUniform, ShadingModel, ShadingParams};

pub struct ReflectancePass {
    bindings: SceneBindings,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    /// Indexed by `ShadingModel::index`
    pipelines: Vec<wgpu::RenderPipeline>,
    calls: Vec<DrawCall<ShadingModel>>,
}

impl ReflectancePass {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let bindings = SceneBindings::new(device);

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<MaterialUniform>() as u64
                    ),
                },
                count: None,
            }],
        });

        let material_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Material Uniforms"),
            size: std::mem::size_of::<MaterialUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Reflectance Pipeline Layout"),
            bind_group_layouts: &[
                &bindings.scene_layout,
                &bindings.draw_layout,
                &material_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipelines = ShadingModel::ALL
            .iter()
            .map(|model| {
                create_mesh_pipeline(
                    device,
                    &MeshPipelineDesc {
                        label: model.label(),
                        source: model.shader_source(),
                        layout: &layout,
                        color_format,
                        cull_mode: Some(wgpu::Face::Back),
                    },
                )
            })
            .collect();

        log::info!("Reflectance pipelines created (Phong, Cook-Torrance, Toon)");

        Self {
            bindings,
            material_buffer,
            material_bind_group,
            pipelines,
            calls: Vec::new(),
        }
    }

    /// Write camera, light, material and per-draw uniforms for this frame
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        params: &ShadingParams,
        models: &[GpuModel],
    ) {
        self.bindings.write_scene(queue, scene);

        let material = MaterialUniform::from_params(params);
        queue.write_buffer(&self.material_buffer, 0, bytemuck::bytes_of(&material));

        let items = scene
            .draw_list()
            .into_iter()
            .map(|(transform, renderer)| (transform.matrix(), renderer.model_id, renderer.shading));
        let (uniforms, calls) = collect_draws(items, models);
        self.bindings.write_draws(queue, &uniforms);
        self.calls = calls;
    }

    /// Record the draws prepared by the last `prepare`
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, models: &'a [GpuModel]) {
        pass.set_bind_group(2, &self.material_bind_group, &[]);

        for call in &self.calls {
            let Some(mesh) = models
                .get(call.model_id)
                .and_then(|model| model.meshes.get(call.mesh_index))
            else {
                continue;
            };
            pass.set_pipeline(&self.pipelines[call.key.index()]);
            self.bindings.bind(pass, call.slot);
            mesh.draw(pass);
        }
    }

    pub fn draw_count(&self) -> usize {
        self.calls.len()
    }
}
