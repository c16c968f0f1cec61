mod gameplay;
mod layers;
mod physics;

pub use gameplay::*;
pub use layers::*;
pub use physics::*;

use glam::{Quat, Vec3};

/// Spatial transform with position, rotation, and scale (world space; the
/// arena has no hierarchy).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalTransform {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Marker: entity is hidden from presentation but still exists in the world.
pub struct Hidden;
