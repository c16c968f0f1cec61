use glam::{Quat, Vec3};

use crate::camera::Camera;
use crate::components::{InkSurface, LayerMask};
use crate::engine::input::{InputEvent, Subscription};
use crate::fsm::{EntryRefused, State};

use super::super::movement::{look_rotation, move_instant, move_towards, upright};
use super::super::{AbilityKind, PlayerContext};

/// Rotation rate toward the heading while moving, and toward the surface
/// normal while idle.
const MOVING_TURN_RATE: f32 = 20.0;
const IDLE_TURN_RATE: f32 = 10.0;

/// Locomotion glued to painted ink, on floors and walls alike.
pub struct SwimState {
    normal: Vec3,
    velocity: Vec3,
    time_since_surface: f32,
    saved_height: f32,
    saved_center: Vec3,
    subscription: Option<Subscription>,
}

impl Default for SwimState {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            velocity: Vec3::ZERO,
            time_since_surface: 0.0,
            saved_height: 2.0,
            saved_center: Vec3::new(0.0, 1.0, 0.0),
            subscription: None,
        }
    }
}

impl SwimState {
    pub fn surface_normal(&self) -> Vec3 {
        self.normal
    }
}

/// Normal of the ink surface under the body, if any.
///
/// An ink patch must overlap the swim capsule centre; the normal comes from a
/// probe ray along the body's down axis, or the patch's own record when the
/// probe misses.
pub fn detect_surface(ctx: &PlayerContext<'_>) -> Option<Vec3> {
    let swim = &ctx.config.swim;
    let origin = ctx.controller.position() + ctx.body.rotation * swim_center(ctx);
    let patch = ctx
        .physics
        .overlap_sphere(ctx.world, origin, swim.detect_radius, LayerMask::INK)
        .into_iter()
        .next()?;

    let down = -ctx.body.up();
    if let Some(hit) = ctx.physics.raycast(ctx.world, origin, down, swim.probe_length, LayerMask::INK) {
        return Some(hit.normal);
    }
    ctx.world.get::<&InkSurface>(patch).map(|ink| ink.normal).ok()
}

/// Capsule centre while swimming. The capsule never gets shorter than its
/// own sphere, so the centre sits at least one radius above the feet.
fn swim_center(ctx: &PlayerContext<'_>) -> Vec3 {
    Vec3::Y * (ctx.config.swim.height * 0.5).max(ctx.controller.radius())
}

/// (right, forward) spanning the surface plane, oriented by the camera.
pub fn surface_axes(camera: &Camera, normal: Vec3) -> (Vec3, Vec3) {
    let project = |v: Vec3| v - normal * v.dot(normal);
    let right = project(camera.right());
    if right.length_squared() > 1e-6 {
        let right = right.normalize();
        return (right, normal.cross(right));
    }
    let forward = project(camera.front());
    if forward.length_squared() > 1e-6 {
        let forward = forward.normalize();
        return (forward.cross(normal), forward);
    }
    normal.any_orthonormal_pair()
}

impl State for SwimState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Swim
    }

    fn can_enter(&self, ctx: &PlayerContext<'_>) -> bool {
        detect_surface(ctx).is_some()
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        let Some(normal) = detect_surface(ctx) else {
            log::debug!("[swim] no ink under the player");
            return Err(EntryRefused);
        };
        let center = swim_center(ctx);

        self.saved_height = ctx.controller.height();
        self.saved_center = ctx.controller.center();
        ctx.controller.set_height(ctx.config.swim.height);
        ctx.controller.set_center(center);
        ctx.forces.set_enabled(false);

        self.normal = normal;
        self.velocity = Vec3::ZERO;
        self.time_since_surface = 0.0;
        self.subscription = Some(ctx.bus.subscribe(&[InputEvent::Jump]));
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        let config = ctx.config;
        let swim = &config.swim;

        match detect_surface(ctx) {
            Some(normal) => {
                self.normal = normal;
                self.time_since_surface = 0.0;
            }
            None => {
                self.time_since_surface += dt;
                if self.time_since_surface > swim.surface_grace {
                    log::debug!("[swim] surface lost");
                    ctx.forces.add_force(self.normal * swim.exit_push);
                    return Some(AbilityKind::FreeLook);
                }
            }
        }

        let normal = self.normal;
        let (right, forward) = surface_axes(ctx.camera, normal);
        let stick = ctx.input.move_vector;
        let direction = (forward * stick.y + right * stick.x).clamp_length_max(1.0);
        let rate = if ctx.input.has_move_input() {
            swim.acceleration
        } else {
            swim.deceleration
        };
        // Keep the velocity in the plane when the normal changes.
        self.velocity -= normal * self.velocity.dot(normal);
        self.velocity = move_towards(self.velocity, direction * swim.speed, rate * dt);

        move_instant(ctx, self.velocity - normal * swim.stick_force, dt);

        let body = &mut *ctx.body;
        if self.velocity.length_squared() > 0.01 {
            let target = look_rotation(self.velocity, normal);
            body.rotation = body.rotation.slerp(target, (MOVING_TURN_RATE * dt).min(1.0));
        } else {
            let target = Quat::from_rotation_arc(body.up(), normal) * body.rotation;
            body.rotation = body.rotation.slerp(target, (IDLE_TURN_RATE * dt).min(1.0));
        }
        None
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        ctx.controller.set_height(self.saved_height);
        ctx.controller.set_center(self.saved_center);
        ctx.body.rotation = upright(ctx.body.rotation);
        ctx.forces.set_enabled(true);
        self.velocity = Vec3::ZERO;
        self.subscription = None;
    }

    fn on_event(&mut self, ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        if *event != InputEvent::Jump {
            return None;
        }
        let config = ctx.config;
        let direction = self.velocity.normalize_or_zero();
        let force = (self.normal + direction * 0.5) * config.movement.jump_force * config.swim.jump_multiplier;
        ctx.forces.add_force(force);
        log::debug!("[swim] jumped off the surface");
        Some(AbilityKind::FreeLook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::prefabs::{spawn_ink_patch, spawn_static_box};
    use crate::systems::CharacterController;
    use crate::testing::Rig;
    use glam::Vec2;

    fn inked_rig() -> Rig {
        let mut rig = Rig::new();
        spawn_ink_patch(&mut rig.world, Vec3::new(0.0, 0.02, 0.0), Vec3::Y);
        spawn_ink_patch(&mut rig.world, Vec3::new(0.0, 0.02, -1.4), Vec3::Y);
        rig
    }

    #[test]
    fn refuses_without_ink() {
        let mut rig = Rig::new();
        let mut state = SwimState::default();
        assert_eq!(state.enter(&mut rig.ctx()), Err(EntryRefused));
        assert!(rig.forces.is_enabled());
        assert_eq!(rig.controller.height(), 2.0);
    }

    #[test]
    fn enter_reshapes_and_exit_restores() {
        let mut rig = inked_rig();
        let mut state = SwimState::default();
        {
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            assert_eq!(ctx.controller.height(), 0.5);
            assert_eq!(ctx.controller.center(), Vec3::new(0.0, 0.4, 0.0));
            assert!(!ctx.forces.is_enabled());
            assert!(state.surface_normal().distance(Vec3::Y) < 1e-4);
            state.exit(&mut ctx);
        }
        assert_eq!(rig.controller.height(), 2.0);
        assert_eq!(rig.controller.center(), Vec3::new(0.0, 1.0, 0.0));
        assert!(rig.forces.is_enabled());
    }

    #[test]
    fn swims_along_the_floor_then_loses_the_surface() {
        let mut rig = inked_rig();
        rig.input.move_vector = Vec2::Y;
        let mut state = SwimState::default();
        let mut exited_at = None;
        {
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            for step in 0..120 {
                if let Some(next) = state.tick(&mut ctx, 1.0 / 60.0) {
                    assert_eq!(next, AbilityKind::FreeLook);
                    exited_at = Some(step);
                    break;
                }
            }
        }
        let pos = rig.controller.position();
        assert!(pos.z < -1.5, "swam forward to {:?}", pos);
        assert!(pos.y.abs() < 0.05, "stuck to the floor, y = {}", pos.y);
        assert!(exited_at.is_some(), "ran off the end of the ink");
        assert!(rig.forces.impact().y > 0.0, "pushed off the last normal");
    }

    #[test]
    fn axes_follow_the_camera_on_a_wall() {
        let camera = Camera::new();
        let (right, forward) = surface_axes(&camera, Vec3::Z);
        assert!(right.distance(Vec3::X) < 1e-5);
        assert!(forward.distance(Vec3::Y) < 1e-5);

        // Camera right parallel to the normal falls back to the camera front.
        let (right, forward) = surface_axes(&camera, Vec3::X);
        assert!(forward.distance(Vec3::NEG_Z) < 1e-5);
        assert!(right.dot(Vec3::X).abs() < 1e-5);
    }

    #[test]
    fn wall_patch_normal_comes_from_the_probe() {
        let mut rig = Rig::new();
        spawn_static_box(&mut rig.world, Vec3::new(0.0, 2.0, -1.0), Vec3::new(3.0, 2.0, 0.5));
        spawn_ink_patch(&mut rig.world, Vec3::new(0.0, 1.0, -0.48), Vec3::Z);
        rig.controller.set_position(Vec3::new(0.0, 1.0, -0.2));
        rig.body.rotation = look_rotation(Vec3::Y, Vec3::Z);
        let normal = detect_surface(&rig.ctx()).expect("wall ink");
        assert!(normal.distance(Vec3::Z) < 1e-4);
    }

    #[test]
    fn jump_pushes_off_along_the_normal() {
        let mut rig = inked_rig();
        let mut state = SwimState::default();
        state.enter(&mut rig.ctx()).unwrap();
        assert!(rig.bus.is_subscribed(InputEvent::Jump));
        let next = state.on_event(&mut rig.ctx(), &InputEvent::Jump);
        assert_eq!(next, Some(AbilityKind::FreeLook));
        let expected = 6.0 * 1.5;
        assert!((rig.forces.impact().y - expected).abs() < 1e-4);
    }
}
