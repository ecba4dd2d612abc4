//! Camera controller
//!
//! Free-fly (FPS-style) control: WASD movement, mouse look, scroll speed.

use glam::{Vec2, Vec3};

use super::Camera;

/// Input state for camera controllers
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    /// Movement keys (WASD, QE for down/up)
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,

    /// Sprint modifier (shift)
    pub sprint: bool,

    /// Mouse delta since last frame (in pixels)
    pub mouse_delta: Vec2,

    /// Mouse scroll delta (positive = scroll up)
    pub scroll_delta: f32,

    /// Whether mouse look is active (right mouse button held)
    pub mouse_look_active: bool,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame deltas (call after update)
    pub fn reset_deltas(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }
}

/// Abstract camera controller trait
pub trait CameraController {
    /// Update the camera based on input and delta time
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32);

    fn name(&self) -> &'static str;
}

/// Free-fly camera controller
///
/// - WASD: Move forward/backward/left/right
/// - Q/E or Ctrl/Space: Move down/up
/// - Mouse: Look around (when mouse_look_active)
/// - Scroll: Adjust movement speed
/// - Shift: Sprint
pub struct FreeFlyController {
    /// Horizontal rotation in radians
    pub yaw: f32,
    /// Vertical rotation in radians, positive looks down
    pub pitch: f32,
    /// Base movement speed in units per second
    pub move_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Radians per pixel
    pub mouse_sensitivity: f32,
    pub sprint_multiplier: f32,
    /// Speed factor applied per scroll notch
    pub scroll_speed_factor: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self {
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            move_speed: 2.5,
            min_speed: 0.5,
            max_speed: 50.0,
            mouse_sensitivity: 0.003,
            sprint_multiplier: 2.0,
            scroll_speed_factor: 1.2,
        }
    }
}

impl FreeFlyController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize yaw/pitch from camera's current orientation
    pub fn sync_with_camera(&mut self, camera: &Camera) {
        let forward = camera.forward();
        self.yaw = forward.z.atan2(forward.x);
        self.pitch = (-forward.y).clamp(-1.0, 1.0).asin();
    }

    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            -self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Right direction on the XZ plane
    fn right_direction(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos()).normalize()
    }
}

impl CameraController for FreeFlyController {
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32) {
        if input.scroll_delta > 0.0 {
            self.move_speed *= self.scroll_speed_factor;
        } else if input.scroll_delta < 0.0 {
            self.move_speed /= self.scroll_speed_factor;
        }
        self.move_speed = self.move_speed.clamp(self.min_speed, self.max_speed);

        if input.mouse_look_active && input.mouse_delta != Vec2::ZERO {
            self.yaw += input.mouse_delta.x * self.mouse_sensitivity;
            self.pitch += input.mouse_delta.y * self.mouse_sensitivity;

            let max_pitch = std::f32::consts::FRAC_PI_2 - 0.01;
            self.pitch = self.pitch.clamp(-max_pitch, max_pitch);
            self.yaw %= std::f32::consts::TAU;
        }

        let forward = self.forward_direction();
        let right = self.right_direction();

        let mut velocity = Vec3::ZERO;
        if input.forward {
            velocity += forward;
        }
        if input.backward {
            velocity -= forward;
        }
        if input.right {
            velocity += right;
        }
        if input.left {
            velocity -= right;
        }
        if input.up {
            velocity += Vec3::Y;
        }
        if input.down {
            velocity -= Vec3::Y;
        }

        // Normalize if moving diagonally
        let velocity = velocity.normalize_or_zero();

        let speed = if input.sprint {
            self.move_speed * self.sprint_multiplier
        } else {
            self.move_speed
        };

        camera.position += velocity * speed * dt;
        camera.target = camera.position + forward;
    }

    fn name(&self) -> &'static str {
        "FreeFly"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synced() -> (Camera, FreeFlyController) {
        let camera = Camera::default();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        (camera, controller)
    }

    #[test]
    fn sync_preserves_view_direction() {
        let (mut camera, mut controller) = synced();
        let before = camera.forward();
        controller.update(&mut camera, &CameraInput::new(), 0.016);
        assert!((camera.forward() - before).length() < 1e-5);
    }

    #[test]
    fn forward_key_moves_along_view() {
        let (mut camera, mut controller) = synced();
        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        let start = camera.position;
        controller.update(&mut camera, &input, 1.0);
        let moved = camera.position - start;
        assert!((moved.length() - controller.move_speed).abs() < 1e-4);
        assert!(moved.z < 0.0);
    }

    #[test]
    fn sprint_doubles_distance() {
        let (mut camera, mut controller) = synced();
        let input = CameraInput {
            right: true,
            sprint: true,
            ..Default::default()
        };
        let start = camera.position;
        controller.update(&mut camera, &input, 0.5);
        let expected = controller.move_speed * controller.sprint_multiplier * 0.5;
        assert!(((camera.position - start).length() - expected).abs() < 1e-4);
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let (mut camera, mut controller) = synced();
        let input = CameraInput {
            forward: true,
            right: true,
            up: true,
            ..Default::default()
        };
        let start = camera.position;
        controller.update(&mut camera, &input, 1.0);
        assert!(((camera.position - start).length() - controller.move_speed).abs() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped_below_vertical() {
        let (mut camera, mut controller) = synced();
        let input = CameraInput {
            mouse_look_active: true,
            mouse_delta: Vec2::new(0.0, 100_000.0),
            ..Default::default()
        };
        controller.update(&mut camera, &input, 0.016);
        assert!(controller.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.forward().y < 0.0);
        assert!(camera.forward().y > -1.0);
    }

    #[test]
    fn mouse_ignored_without_look_button() {
        let (mut camera, mut controller) = synced();
        let yaw = controller.yaw;
        let input = CameraInput {
            mouse_delta: Vec2::new(50.0, 50.0),
            ..Default::default()
        };
        controller.update(&mut camera, &input, 0.016);
        assert_eq!(controller.yaw, yaw);
    }

    #[test]
    fn scroll_speed_stays_in_range() {
        let (mut camera, mut controller) = synced();
        let up = CameraInput {
            scroll_delta: 1.0,
            ..Default::default()
        };
        for _ in 0..100 {
            controller.update(&mut camera, &up, 0.0);
        }
        assert_eq!(controller.move_speed, controller.max_speed);

        let down = CameraInput {
            scroll_delta: -1.0,
            ..Default::default()
        };
        for _ in 0..100 {
            controller.update(&mut camera, &down, 0.0);
        }
        assert_eq!(controller.move_speed, controller.min_speed);
    }

    #[test]
    fn reset_deltas_keeps_held_keys() {
        let mut input = CameraInput {
            forward: true,
            mouse_delta: Vec2::new(3.0, 4.0),
            scroll_delta: 2.0,
            ..Default::default()
        };
        input.reset_deltas();
        assert!(input.forward);
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        assert_eq!(input.scroll_delta, 0.0);
    }
}
