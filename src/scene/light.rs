//! Point light shared by every reflectance model

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Point light with separate ambient, diffuse and specular intensities
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.0, 2.0, 2.0),
            color: Vec3::ONE,
            ambient: 0.2,
            diffuse: 1.0,
            specular: 1.0,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            ..Default::default()
        }
    }

    pub fn ambient_color(&self) -> Vec3 {
        self.color * self.ambient
    }

    pub fn diffuse_color(&self) -> Vec3 {
        self.color * self.diffuse
    }

    pub fn specular_color(&self) -> Vec3 {
        self.color * self.specular
    }
}

/// Light uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightUniform {
    pub position: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

impl From<&PointLight> for LightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0),
            ambient: light.ambient_color().extend(0.0),
            diffuse: light.diffuse_color().extend(0.0),
            specular: light.specular_color().extend(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_light() {
        let light = PointLight::default();
        assert_eq!(light.position, Vec3::splat(2.0));
        assert_eq!(light.ambient_color(), Vec3::splat(0.2));
        assert_eq!(light.diffuse_color(), Vec3::ONE);
    }

    #[test]
    fn uniform_scales_color_per_term() {
        let light = PointLight {
            color: Vec3::new(1.0, 0.5, 0.0),
            specular: 2.0,
            ..Default::default()
        };
        let uniform = LightUniform::from(&light);
        assert_eq!(uniform.specular, Vec4::new(2.0, 1.0, 0.0, 0.0));
        assert_eq!(uniform.position.w, 1.0);
    }
}
