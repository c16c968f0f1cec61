use glam::Vec3;

use crate::engine::input::InputState;
use crate::player::AbilityKind;

/// Which rig the presentation layer should blend to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    FreeLook,
    /// Over-the-shoulder, close.
    Aim,
    /// Pulled back while swinging or spinning a captured enemy.
    Swing,
}

impl CameraMode {
    pub fn for_ability(kind: AbilityKind) -> Self {
        match kind {
            AbilityKind::Aim => CameraMode::Aim,
            AbilityKind::Grapple | AbilityKind::Whip => CameraMode::Swing,
            AbilityKind::FreeLook
            | AbilityKind::Hover
            | AbilityKind::Swim
            | AbilityKind::Vacuum => CameraMode::FreeLook,
        }
    }

    fn distance(self) -> f32 {
        match self {
            CameraMode::FreeLook => 5.0,
            CameraMode::Aim => 2.0,
            CameraMode::Swing => 8.0,
        }
    }
}

/// Orbit camera around the player. Yaw/pitch in degrees; yaw -90 looks down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub sensitivity: f32,
    pub fov: f32,
    pub height: f32,
    pub mode: CameraMode,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0_f32,
            pitch: 0.0,
            sensitivity: 0.1,
            fov: 45.0,
            height: 1.6,
            mode: CameraMode::FreeLook,
        }
    }

    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0, 89.0);
    }

    /// Turn by this step's look stick.
    pub fn apply_input(&mut self, input: &InputState) {
        self.look(input.look_vector.x, input.look_vector.y);
    }

    pub fn front(&self) -> Vec3 {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        Vec3::new(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front())
    }

    /// Front with the vertical component removed.
    pub fn flat_forward(&self) -> Vec3 {
        let yaw_rad = self.yaw.to_radians();
        Vec3::new(yaw_rad.cos(), 0.0, yaw_rad.sin())
    }

    pub fn flat_right(&self) -> Vec3 {
        self.flat_forward().cross(Vec3::Y)
    }

    /// Place the camera behind `target` at the distance of `mode`.
    pub fn follow(&mut self, target: Vec3, mode: CameraMode) {
        self.mode = mode;
        let pivot = target + Vec3::Y * self.height;
        let mut position = pivot - self.front() * mode.distance();
        if mode == CameraMode::Aim {
            position += self.flat_right() * 0.6;
        }
        self.position = position;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
