//! Reflectance models and their material parameters

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

const PHONG_WGSL: &str = concat!(
    include_str!("../../shaders/scene_common.wgsl"),
    include_str!("../../shaders/material_common.wgsl"),
    include_str!("../../shaders/phong.wgsl"),
);

const COOK_TORRANCE_WGSL: &str = concat!(
    include_str!("../../shaders/scene_common.wgsl"),
    include_str!("../../shaders/material_common.wgsl"),
    include_str!("../../shaders/cook_torrance.wgsl"),
);

const TOON_WGSL: &str = concat!(
    include_str!("../../shaders/scene_common.wgsl"),
    include_str!("../../shaders/material_common.wgsl"),
    include_str!("../../shaders/toon.wgsl"),
);

/// Shading equation used to light a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingModel {
    #[default]
    Phong,
    CookTorrance,
    Toon,
}

impl ShadingModel {
    pub const ALL: [ShadingModel; 3] = [
        ShadingModel::Phong,
        ShadingModel::CookTorrance,
        ShadingModel::Toon,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShadingModel::Phong => "Phong",
            ShadingModel::CookTorrance => "Cook-Torrance",
            ShadingModel::Toon => "Toon",
        }
    }

    /// Complete WGSL module: shared bindings, vertex stage and this model's fragment stage
    pub fn shader_source(&self) -> &'static str {
        match self {
            ShadingModel::Phong => PHONG_WGSL,
            ShadingModel::CookTorrance => COOK_TORRANCE_WGSL,
            ShadingModel::Toon => TOON_WGSL,
        }
    }

    /// Index into `ALL`
    pub fn index(&self) -> usize {
        match self {
            ShadingModel::Phong => 0,
            ShadingModel::CookTorrance => 1,
            ShadingModel::Toon => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongParams {
    pub ambient_strength: f32,
    pub specular_strength: f32,
    pub shininess: f32,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            ambient_strength: 0.4,
            specular_strength: 0.5,
            shininess: 32.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CookTorranceParams {
    /// Clamped to [0.05, 1] when packed
    pub roughness: f32,
    pub metallic: f32,
    /// Reflectance at normal incidence for dielectrics
    pub f0: f32,
}

impl Default for CookTorranceParams {
    fn default() -> Self {
        Self {
            roughness: 0.6,
            metallic: 0.0,
            f0: 0.04,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToonParams {
    pub bands: u32,
    pub rim_strength: f32,
    pub specular_threshold: f32,
}

impl Default for ToonParams {
    fn default() -> Self {
        Self {
            bands: 4,
            rim_strength: 0.35,
            specular_threshold: 0.95,
        }
    }
}

/// Parameters for all three reflectance models, edited live from the GUI
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadingParams {
    pub phong: PhongParams,
    pub cook_torrance: CookTorranceParams,
    pub toon: ToonParams,
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    pub phong: Vec4,
    pub cook: Vec4,
    pub toon: Vec4,
    pub _pad: Vec4,
}

impl MaterialUniform {
    pub fn from_params(params: &ShadingParams) -> Self {
        let phong = &params.phong;
        let cook = &params.cook_torrance;
        let toon = &params.toon;
        Self {
            phong: Vec4::new(
                phong.ambient_strength,
                phong.specular_strength,
                phong.shininess.max(1.0),
                0.0,
            ),
            cook: Vec4::new(
                cook.roughness.clamp(0.05, 1.0),
                cook.metallic.clamp(0.0, 1.0),
                cook.f0.clamp(0.0, 1.0),
                0.0,
            ),
            toon: Vec4::new(
                toon.bands.max(1) as f32,
                toon.rim_strength,
                toon.specular_threshold,
                0.0,
            ),
            _pad: Vec4::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_model_has_both_entry_points() {
        for model in ShadingModel::ALL {
            let source = model.shader_source();
            assert!(source.contains("fn vs_main"), "{} lacks vs_main", model.label());
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", model.label());
            assert_eq!(ShadingModel::ALL[model.index()], model);
        }
    }

    #[test]
    fn packing_clamps_out_of_range_values() {
        let params = ShadingParams {
            cook_torrance: CookTorranceParams {
                roughness: 0.0,
                metallic: 2.0,
                ..Default::default()
            },
            toon: ToonParams {
                bands: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let uniform = MaterialUniform::from_params(&params);
        assert_eq!(uniform.cook.x, 0.05);
        assert_eq!(uniform.cook.y, 1.0);
        assert_eq!(uniform.toon.x, 1.0);
    }

    #[test]
    fn default_packing() {
        let uniform = MaterialUniform::from_params(&ShadingParams::default());
        assert_eq!(uniform.phong, Vec4::new(0.4, 0.5, 32.0, 0.0));
        assert_eq!(uniform.cook, Vec4::new(0.6, 0.0, 0.04, 0.0));
        assert_eq!(uniform.toon, Vec4::new(4.0, 0.35, 0.95, 0.0));
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }
}
