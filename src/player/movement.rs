//! Movement primitives shared by the ability states.

use glam::{Mat3, Quat, Vec2, Vec3};

use crate::camera::Camera;
use crate::systems::{smooth_damp, CollisionFlags};

use super::{PlayerBody, PlayerContext};

/// Flat, camera-relative direction for a 2D stick input. Length is at most 1.
pub fn camera_relative(camera: &Camera, input: Vec2) -> Vec3 {
    let direction = camera.flat_forward() * input.y + camera.flat_right() * input.x;
    direction.clamp_length_max(1.0)
}

/// Horizontal velocity that eases toward a target with separate
/// acceleration and deceleration time constants.
#[derive(Debug, Clone, Default)]
pub struct SmoothedMotion {
    velocity: Vec3,
    damping: Vec3,
}

impl SmoothedMotion {
    pub fn update(&mut self, target: Vec3, acceleration_time: f32, deceleration_time: f32, dt: f32) -> Vec3 {
        let smooth_time = if target.length_squared() > 1e-6 {
            acceleration_time
        } else {
            deceleration_time
        };
        self.velocity = smooth_damp(self.velocity, target, &mut self.damping, smooth_time, dt);
        self.velocity
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Restart from `velocity` (horizontal part only).
    pub fn reset(&mut self, velocity: Vec3) {
        self.velocity = Vec3::new(velocity.x, 0.0, velocity.z);
        self.damping = Vec3::ZERO;
    }
}

/// Move the controller by `velocity` plus whatever the force integrator
/// carries. Striking a ceiling cancels upward velocity.
pub fn move_with_forces(ctx: &mut PlayerContext<'_>, velocity: Vec3, dt: f32) -> CollisionFlags {
    let motion = (velocity + ctx.forces.movement()) * dt;
    let flags = ctx.controller.move_by(ctx.world, motion);
    if flags.contains(CollisionFlags::ABOVE) {
        ctx.forces.reset_vertical_velocity();
    }
    flags
}

/// Move by `velocity` alone, ignoring the integrator.
pub fn move_instant(ctx: &mut PlayerContext<'_>, velocity: Vec3, dt: f32) -> CollisionFlags {
    ctx.controller.move_by(ctx.world, velocity * dt)
}

/// Turn toward the flat heading of `direction` at `speed` (per second).
pub fn face_direction(body: &mut PlayerBody, direction: Vec3, speed: f32, dt: f32) {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < 1e-6 {
        return;
    }
    let target = look_rotation(flat, Vec3::Y);
    body.rotation = body.rotation.slerp(target, (speed * dt).min(1.0));
}

pub fn face_target_instant(body: &mut PlayerBody, direction: Vec3) {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < 1e-6 {
        return;
    }
    body.rotation = look_rotation(flat, Vec3::Y);
}

/// Jump if grounded. Returns whether the jump happened.
pub fn jump(ctx: &mut PlayerContext<'_>) -> bool {
    if !ctx.controller.is_grounded() {
        return false;
    }
    ctx.forces.jump(ctx.config.movement.jump_force);
    log::debug!("[movement] jump");
    true
}

/// Rotation whose +Z axis points along `forward` and whose +Y axis is as
/// close to `up` as possible. Falls back to any perpendicular up when the two
/// are parallel.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = up.cross(forward);
    if right.length_squared() < 1e-8 {
        right = forward.any_orthogonal_vector();
    }
    let right = right.normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// `rotation` with its pitch and roll removed.
pub fn upright(rotation: Quat) -> Quat {
    let forward = rotation * Vec3::Z;
    let flat = Vec3::new(forward.x, 0.0, forward.z);
    if flat.length_squared() < 1e-6 {
        // Facing straight up or down: keep the heading of the up axis instead.
        let up = rotation * Vec3::Y;
        let flat_up = Vec3::new(up.x, 0.0, up.z);
        return look_rotation(-flat_up, Vec3::Y);
    }
    look_rotation(flat, Vec3::Y)
}

pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance < 1e-6 {
        return target;
    }
    current + delta / distance * max_delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::CharacterController;
    use crate::testing::Rig;

    #[test]
    fn look_rotation_maps_forward_and_up() {
        let q = look_rotation(Vec3::NEG_Z, Vec3::Y);
        assert!((q * Vec3::Z).distance(Vec3::NEG_Z) < 1e-5);
        assert!((q * Vec3::Y).distance(Vec3::Y) < 1e-5);

        let wall = look_rotation(Vec3::Y, Vec3::X);
        assert!((wall * Vec3::Z).distance(Vec3::Y) < 1e-5);
        assert!((wall * Vec3::Y).distance(Vec3::X) < 1e-5);

        let degenerate = look_rotation(Vec3::Y, Vec3::Y);
        assert!((degenerate * Vec3::Z).distance(Vec3::Y) < 1e-5);
        assert!(degenerate.is_finite());
    }

    #[test]
    fn upright_removes_tilt() {
        let tilted = Quat::from_rotation_x(0.6) * look_rotation(Vec3::X, Vec3::Y);
        let q = upright(tilted);
        assert!((q * Vec3::Y).distance(Vec3::Y) < 1e-5);
        assert!((q * Vec3::Z).y.abs() < 1e-5);
    }

    #[test]
    fn camera_relative_input_is_flat_and_clamped() {
        let camera = Camera::new();
        let dir = camera_relative(&camera, Vec2::new(1.0, 1.0));
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert_eq!(dir.y, 0.0);
        let fwd = camera_relative(&camera, Vec2::Y);
        assert!(fwd.distance(Vec3::NEG_Z) < 1e-5);
    }

    #[test]
    fn smoothed_motion_accelerates_then_stops() {
        let mut motion = SmoothedMotion::default();
        let target = Vec3::new(6.0, 0.0, 0.0);
        for _ in 0..60 {
            motion.update(target, 0.1, 0.2, 1.0 / 60.0);
        }
        assert!(motion.velocity().distance(target) < 0.05);
        for _ in 0..120 {
            motion.update(Vec3::ZERO, 0.1, 0.2, 1.0 / 60.0);
        }
        assert!(motion.velocity().length() < 0.05);
    }

    #[test]
    fn move_towards_never_overshoots() {
        let p = move_towards(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.25);
        assert!(p.distance(Vec3::new(0.25, 0.0, 0.0)) < 1e-6);
        assert_eq!(move_towards(Vec3::ZERO, Vec3::X, 5.0), Vec3::X);
    }

    #[test]
    fn instant_move_skips_queued_impulses() {
        let mut rig = Rig::new();
        rig.forces.add_force(Vec3::new(10.0, 0.0, 0.0));
        move_instant(&mut rig.ctx(), Vec3::new(0.0, 0.0, -2.0), 0.5);
        let position = rig.controller.position();
        assert!(position.x.abs() < 1e-6);
        assert!((position.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn jump_only_from_ground() {
        let mut rig = Rig::new();
        {
            let mut ctx = rig.ctx();
            assert!(!jump(&mut ctx), "not grounded before the first move");
            move_with_forces(&mut ctx, Vec3::new(0.0, -1.0, 0.0), 0.1);
            assert!(jump(&mut ctx));
        }
        assert_eq!(rig.forces.vertical_velocity(), rig.config.movement.jump_force);
    }

    #[test]
    fn ceiling_cancels_upward_velocity() {
        let mut rig = Rig::new();
        crate::scene::prefabs::spawn_static_box(&mut rig.world, Vec3::new(0.0, 2.6, 0.0), Vec3::new(3.0, 0.25, 3.0));
        rig.forces.jump(8.0);
        {
            let mut ctx = rig.ctx();
            move_with_forces(&mut ctx, Vec3::ZERO, 0.1);
        }
        assert_eq!(rig.forces.vertical_velocity(), 0.0);
    }
}
