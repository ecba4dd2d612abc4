//! Transform, spin and renderer components

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::backend::DrawUniform;
use crate::shading::ShadingModel;

/// Transform component for positioning objects in 3D space
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    /// Get the model matrix for this transform
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the normal matrix (inverse transpose of model matrix)
    pub fn normal_matrix(&self) -> Mat4 {
        self.matrix().inverse().transpose()
    }

    pub fn uniform_data(&self, base_color: Vec4) -> DrawUniform {
        DrawUniform::new(self.matrix(), base_color)
    }
}

/// Constant rotation about an axis
///
/// The orientation is recomputed from total elapsed time every frame, so a
/// dropped frame never accumulates drift.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub axis: Vec3,
    /// Radians per second
    pub speed: f32,
}

impl Spin {
    pub fn new(axis: Vec3, speed: f32) -> Self {
        Self {
            axis: axis.normalize_or_zero(),
            speed,
        }
    }

    pub fn rotation_at(&self, elapsed: f32) -> Quat {
        if self.axis == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        Quat::from_axis_angle(self.axis, self.speed * elapsed)
    }
}

/// Marks an entity as drawable: which loaded model and which reflectance model
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRenderer {
    pub model_id: usize,
    pub shading: ShadingModel,
}

impl ModelRenderer {
    pub fn new(model_id: usize, shading: ShadingModel) -> Self {
        Self { model_id, shading }
    }
}
