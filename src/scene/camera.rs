//! Camera system

use glam::{Mat4, Vec3};

use crate::backend::CameraUniform;

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Projection::Orthographic {
            left: -half_w,
            right: half_w,
            bottom: -half_h,
            top: half_h,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.5, 5.0), Vec3::new(0.0, 0.5, 4.0))
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniform {
        CameraUniform {
            view: self.view_matrix(),
            proj: self.projection_matrix(),
            view_proj: self.view_projection_matrix(),
            position: self.position.extend(1.0),
        }
    }

    /// Update aspect ratio for perspective projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.projection.set_aspect(width / height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.5, 5.0));
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn zero_height_keeps_previous_aspect() {
        let mut camera = Camera::default();
        camera.set_aspect(800.0, 0.0);
        assert_eq!(camera.projection, Projection::default());

        camera.set_aspect(800.0, 400.0);
        match camera.projection {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            Projection::Orthographic { .. } => panic!("expected perspective"),
        }
    }

    #[test]
    fn uniform_view_proj_is_product() {
        let camera = Camera::default();
        let data = camera.uniform_data();
        let expected = camera.view_projection_matrix();
        assert!(data.view_proj.abs_diff_eq(expected, 1e-6));
        assert_eq!(data.position.truncate(), camera.position);
    }

    #[test]
    fn orthographic_aspect_is_fixed() {
        let mut projection = Projection::orthographic(4.0, 2.0, 0.1, 10.0);
        let before = projection;
        projection.set_aspect(3.0);
        assert_eq!(projection, before);
    }
}
