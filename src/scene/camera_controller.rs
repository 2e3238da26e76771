//! Camera controller system
//!
//! Provides abstract camera control with a free-fly implementation:
//! WASD movement, mouse look, scroll speed.

use glam::{Vec2, Vec3};

use super::Camera;

/// Input state for camera controllers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraInput {
    /// Movement keys (WASD, QE for up/down)
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

    /// Whether mouse look is active (e.g., right mouse button held)
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

    /// True when no key, button or delta is active
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Abstract camera controller trait
pub trait CameraController {
    /// Take over the camera's current orientation
    fn sync_with_camera(&mut self, camera: &Camera);

    /// Update the camera based on input and delta time
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32);

    /// Get the controller name for debugging
    fn name(&self) -> &'static str;

    /// Draw the controller's settings window
    fn draw_gui(&mut self, _ctx: &egui::Context) {}
}

/// Free-fly camera controller (FPS-style)
///
/// - WASD: Move forward/backward/left/right
/// - QE: Move up/down
/// - Mouse: Look around (when mouse_look_active)
/// - Scroll: Adjust movement speed
/// - Shift: Sprint
#[derive(Debug, Clone)]
pub struct FreeFlyController {
    /// Current yaw angle (horizontal rotation) in radians
    pub yaw: f32,
    /// Current pitch angle (vertical rotation) in radians
    pub pitch: f32,
    /// Base movement speed in units per second
    pub move_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Mouse sensitivity (radians per pixel)
    pub mouse_sensitivity: f32,
    /// Speed multiplier when sprinting
    pub sprint_multiplier: f32,
    /// Speed change per scroll unit
    pub scroll_speed_factor: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            move_speed: 2.0,
            min_speed: 0.1,
            max_speed: 20.0,
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

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            -self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Perpendicular to forward, on the XZ plane
    fn right_direction(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos()).normalize()
    }
}

impl CameraController for FreeFlyController {
    fn sync_with_camera(&mut self, camera: &Camera) {
        let forward = camera.forward();
        if forward == Vec3::ZERO {
            return;
        }
        self.yaw = forward.z.atan2(forward.x);
        self.pitch = (-forward.y).asin();
    }

    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32) {
        if input.is_idle() {
            return;
        }

        if input.scroll_delta != 0.0 {
            if input.scroll_delta > 0.0 {
                self.move_speed *= self.scroll_speed_factor;
            } else {
                self.move_speed /= self.scroll_speed_factor;
            }
            self.move_speed = self.move_speed.clamp(self.min_speed, self.max_speed);
        }

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

    fn draw_gui(&mut self, ctx: &egui::Context) {
        egui::Window::new("Camera Controller")
            .default_open(false)
            .show(ctx, |ui| {
                ui.add(egui::Slider::new(&mut self.move_speed, self.min_speed..=self.max_speed).text("Speed"));
                ui.add(
                    egui::Slider::new(&mut self.mouse_sensitivity, 0.0005..=0.01)
                        .logarithmic(true)
                        .text("Sensitivity"),
                );
                ui.add(egui::Slider::new(&mut self.sprint_multiplier, 1.0..=5.0).text("Sprint"));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut camera = Camera::new();
        camera.set_view(Vec3::new(-1.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y);
        camera
    }

    #[test]
    fn sync_preserves_view_direction() {
        let camera = camera();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        assert!(controller.forward_direction().abs_diff_eq(camera.forward(), 1e-5));
    }

    #[test]
    fn idle_input_leaves_camera_untouched() {
        let mut camera = camera();
        let before = camera.clone();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        controller.update(&mut camera, &CameraInput::new(), 0.016);
        assert_eq!(camera, before);
    }

    #[test]
    fn forward_moves_along_view() {
        let mut camera = camera();
        let mut controller = FreeFlyController::new().with_speed(1.0);
        controller.sync_with_camera(&camera);
        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        let start = camera.position;
        controller.update(&mut camera, &input, 0.5);
        let moved = camera.position - start;
        assert!((moved.length() - 0.5).abs() < 1e-5);
        assert!(moved.normalize().abs_diff_eq(controller.forward_direction(), 1e-5));
    }

    #[test]
    fn scroll_clamps_speed() {
        let mut camera = camera();
        let mut controller = FreeFlyController::new();
        let input = CameraInput {
            scroll_delta: 1.0,
            ..Default::default()
        };
        for _ in 0..100 {
            controller.update(&mut camera, &input, 0.0);
        }
        assert_eq!(controller.move_speed, controller.max_speed);
    }
}
