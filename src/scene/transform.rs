//! Transform for positioning models

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Position, rotation and scale in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
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

    /// Get the world matrix for this transform
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Rotation as XYZ euler angles in radians
    pub fn euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    pub fn set_euler(&mut self, euler: Vec3) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_applies_scale_then_rotation_then_translation() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        transform.scale = Vec3::splat(2.0);
        transform.set_euler(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));

        let p = transform.matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 0.0, -2.0), 1e-5), "{p}");
    }

    #[test]
    fn euler_round_trips() {
        let mut transform = Transform::new();
        let euler = Vec3::new(0.1, 0.2, 0.3);
        transform.set_euler(euler);
        assert!(transform.euler().abs_diff_eq(euler, 1e-5));
    }
}
