//! Light types for the scene

use glam::{Vec2, Vec3};

/// Point light with smooth distance attenuation
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Full intensity up to `x`, fading to zero at `y`
    pub attenuation: Vec2,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            attenuation: Vec2::new(0.0, 10.0),
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_attenuation(mut self, start: f32, end: f32) -> Self {
        self.attenuation = Vec2::new(start, end);
        self
    }

    /// Color scaled by intensity, as written to `LightColor`
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}
