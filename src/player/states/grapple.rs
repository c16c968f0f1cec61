//! Pendulum swing from a grapple point.
//!
//! The swing is a planar pendulum: the angle `theta` is measured from the
//! vertical through the anchor, positive toward `swing_dir`. The player's
//! position is derived from the angle each step rather than integrated, so
//! the rope length never drifts.

use glam::Vec3;
use hecs::Entity;

use crate::components::{GrapplePoint, LayerMask, LocalTransform};
use crate::config::GrappleConfig;
use crate::engine::input::{InputEvent, Subscription};
use crate::fsm::{EntryRefused, State};

use super::super::movement::{camera_relative, look_rotation, upright};
use super::super::{AbilityKind, PlayerContext, Rope};

use std::f32::consts::FRAC_PI_2;

/// Input only pumps the swing when it points this much along the motion.
const INPUT_ALIGNMENT_THRESHOLD: f32 = 0.2;
/// Fraction of angular velocity kept when the swing hits its ±90° limit.
const LIMIT_BOUNCE: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingPhase {
    /// The rope is still flying out; `elapsed` counts up to the extend time.
    Extending { elapsed: f32 },
    Swinging,
}

/// `-1` for negative values, `+1` otherwise (zero included).
fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Planar pendulum state for one attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pendulum {
    pub anchor: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub omega: f32,
    /// Horizontal unit axis of the swing plane.
    pub swing_dir: Vec3,
}

impl Pendulum {
    /// Attach at `position` (already at most `radius` from the anchor).
    ///
    /// The initial angular velocity is the entry velocity projected on the
    /// tangent. A swing that would start slower than `min_swing_speed` is
    /// kicked to that speed so it never starts dead.
    pub fn attach(
        anchor: Vec3,
        radius: f32,
        position: Vec3,
        velocity: Vec3,
        swing_dir: Vec3,
        min_swing_speed: f32,
    ) -> Self {
        let offset = position - anchor;
        let vertical = anchor.y - position.y;
        let mut theta = (vertical / radius).clamp(-1.0, 1.0).acos();
        if offset.dot(swing_dir) < 0.0 {
            theta = -theta;
        }
        let theta = theta.clamp(-FRAC_PI_2, FRAC_PI_2);

        let mut pendulum = Self {
            anchor,
            radius,
            theta,
            omega: 0.0,
            swing_dir,
        };
        let tangent = pendulum.tangent();
        let mut omega = velocity.dot(tangent) / radius;
        if omega.abs() < min_swing_speed {
            omega = min_swing_speed * sign(swing_dir.dot(tangent));
        }
        pendulum.omega = omega;
        pendulum
    }

    /// Where the player hangs for the current angle.
    pub fn position(&self) -> Vec3 {
        self.anchor + Vec3::Y * (-self.radius * self.theta.cos())
            + self.swing_dir * (self.radius * self.theta.sin())
    }

    /// Unit direction of increasing `theta`.
    pub fn tangent(&self) -> Vec3 {
        self.swing_dir * self.theta.cos() + Vec3::Y * self.theta.sin()
    }

    /// Unit direction the player is currently moving.
    pub fn motion_direction(&self) -> Vec3 {
        self.tangent() * sign(self.omega)
    }

    /// Linear velocity along the arc.
    pub fn linear_velocity(&self) -> Vec3 {
        self.tangent() * self.omega * self.radius
    }

    /// Advance one step. `input` is the camera-relative stick direction.
    pub fn step(&mut self, config: &GrappleConfig, gravity: f32, input: Vec3, dt: f32) {
        let mut alpha = -(gravity / self.radius) * self.theta.sin();

        let alignment = input.dot(self.motion_direction());
        if alignment > INPUT_ALIGNMENT_THRESHOLD {
            alpha += sign(self.omega) * alignment * config.input_force;
        }
        alpha += config.energy_boost * sign(self.omega);

        self.omega += alpha * dt;
        self.omega *= config.damping;
        self.theta += self.omega * dt;

        if self.theta.abs() > FRAC_PI_2 {
            self.theta = FRAC_PI_2 * sign(self.theta);
            self.omega = -self.omega * LIMIT_BOUNCE;
        }
        if self.omega.abs() < config.min_angular_velocity {
            self.omega = config.min_angular_velocity * sign(self.omega);
        }
    }
}

/// Nearest active grapple point in range with a clear line from the rope
/// origin.
pub fn find_anchor(ctx: &PlayerContext<'_>) -> Option<(Entity, Vec3)> {
    let config = &ctx.config.grapple;
    let origin = ctx.controller.position() + Vec3::Y * config.rope_origin_height;
    let mut best: Option<(Entity, Vec3, f32)> = None;

    for entity in ctx
        .physics
        .overlap_sphere(ctx.world, origin, config.max_distance, LayerMask::GRAPPLE)
    {
        let Ok(point) = ctx.world.get::<&GrapplePoint>(entity).map(|p| *p) else {
            continue;
        };
        if !point.active {
            continue;
        }
        let Ok(anchor) = ctx.world.get::<&LocalTransform>(entity).map(|t| t.position) else {
            continue;
        };
        let distance = origin.distance(anchor);
        if distance > config.max_distance {
            continue;
        }
        if ctx.physics.is_blocked(ctx.world, origin, anchor, LayerMask::MASK_SOLID) {
            continue;
        }
        if best.map_or(true, |(_, _, d)| distance < d) {
            best = Some((entity, anchor, distance));
        }
    }
    best.map(|(entity, anchor, _)| (entity, anchor))
}

/// Swinging from a grapple point.
pub struct GrappleState {
    anchor_entity: Option<Entity>,
    pendulum: Option<Pendulum>,
    phase: SwingPhase,
    subscription: Option<Subscription>,
}

impl Default for GrappleState {
    fn default() -> Self {
        Self {
            anchor_entity: None,
            pendulum: None,
            phase: SwingPhase::Extending { elapsed: 0.0 },
            subscription: None,
        }
    }
}

impl GrappleState {
    pub fn anchor(&self) -> Option<Entity> {
        self.anchor_entity
    }

    pub fn pendulum(&self) -> Option<&Pendulum> {
        self.pendulum.as_ref()
    }

    pub fn phase(&self) -> SwingPhase {
        self.phase
    }

    fn anchor_is_live(&self, ctx: &PlayerContext<'_>) -> bool {
        let Some(entity) = self.anchor_entity else {
            return false;
        };
        ctx.world
            .get::<&GrapplePoint>(entity)
            .map(|point| point.active)
            .unwrap_or(false)
    }

    fn rope_origin(ctx: &PlayerContext<'_>) -> Vec3 {
        ctx.controller.position() + Vec3::Y * ctx.config.grapple.rope_origin_height
    }
}

impl State for GrappleState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Grapple
    }

    fn can_enter(&self, ctx: &PlayerContext<'_>) -> bool {
        find_anchor(ctx).is_some()
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        let Some((entity, anchor)) = find_anchor(ctx) else {
            log::warn!("[grapple] no grapple point in range");
            return Err(EntryRefused);
        };
        let config = ctx.config;
        let radius = config.grapple.swing_radius;

        // Too close: step out to the rope length.
        let mut position = ctx.controller.position();
        let offset = position - anchor;
        if offset.length() < radius {
            let outward = offset.normalize_or_zero();
            let outward = if outward == Vec3::ZERO { Vec3::NEG_Y } else { outward };
            position = anchor + outward * radius;
            ctx.controller.set_position(position);
        }

        let velocity = ctx.controller.velocity();
        let flat_velocity = Vec3::new(velocity.x, 0.0, velocity.z);
        let heading = if flat_velocity.length() > config.grapple.heading_speed_threshold {
            flat_velocity.normalize()
        } else {
            ctx.camera.flat_forward()
        };
        let mut plane_normal = Vec3::Y.cross(heading);
        if plane_normal.length_squared() < 1e-6 {
            plane_normal = ctx.camera.right();
        }
        let swing_dir = plane_normal.normalize().cross(Vec3::Y).normalize();

        let pendulum = Pendulum::attach(
            anchor,
            radius,
            position,
            velocity,
            swing_dir,
            config.grapple.min_swing_speed,
        );
        log::info!(
            "[grapple] attached to {:?} (theta {:.2}, omega {:.2})",
            entity,
            pendulum.theta,
            pendulum.omega
        );

        ctx.forces.clear_vertical_velocity();
        ctx.forces.set_enabled(false);
        self.anchor_entity = Some(entity);
        self.pendulum = Some(pendulum);
        self.phase = SwingPhase::Extending { elapsed: 0.0 };
        self.subscription = Some(ctx.bus.subscribe(&[InputEvent::Jump]));
        let origin = Self::rope_origin(ctx);
        ctx.presentation.rope = Some(Rope { origin, end: origin });
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        if !self.anchor_is_live(ctx) {
            log::warn!("[grapple] grapple point vanished");
            return Some(AbilityKind::FreeLook);
        }
        if !ctx.input.green {
            return Some(AbilityKind::FreeLook);
        }
        let Some(mut pendulum) = self.pendulum else {
            return Some(AbilityKind::FreeLook);
        };
        let config = ctx.config;

        if let SwingPhase::Extending { elapsed } = &mut self.phase {
            *elapsed += dt;
            let t = (*elapsed / config.grapple.rope_extend_time.max(1e-4)).min(1.0);
            let origin = Self::rope_origin(ctx);
            ctx.presentation.rope = Some(Rope {
                origin,
                end: origin.lerp(pendulum.anchor, t),
            });
            if t >= 1.0 {
                self.phase = SwingPhase::Swinging;
            }
            return None;
        }

        let input = camera_relative(ctx.camera, ctx.input.move_vector);
        pendulum.step(&config.grapple, ctx.forces.gravity().abs(), input, dt);
        self.pendulum = Some(pendulum);

        let target = pendulum.position();
        let motion = target - ctx.controller.position();
        ctx.controller.move_by(ctx.world, motion);

        let facing = look_rotation(pendulum.motion_direction(), Vec3::Y);
        let turn = (config.movement.rotation_speed * 2.0 * dt).min(1.0);
        ctx.body.rotation = ctx.body.rotation.slerp(facing, turn);

        let origin = Self::rope_origin(ctx);
        ctx.presentation.rope = Some(Rope {
            origin,
            end: pendulum.anchor,
        });

        let distance = ctx.controller.position().distance(pendulum.anchor);
        if distance > config.grapple.max_distance * config.grapple.break_factor {
            log::warn!("[grapple] rope broke at {:.1}", distance);
            return Some(AbilityKind::FreeLook);
        }
        None
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        if let (SwingPhase::Swinging, Some(pendulum)) = (self.phase, self.pendulum) {
            let launch = pendulum.linear_velocity() + Vec3::Y * ctx.config.grapple.launch_up_force;
            ctx.forces.add_force(launch);
            log::info!("[grapple] released with {:?}", launch);
        }
        ctx.forces.set_enabled(true);
        ctx.body.rotation = upright(ctx.body.rotation);
        ctx.presentation.rope = None;
        self.anchor_entity = None;
        self.pendulum = None;
        self.phase = SwingPhase::Extending { elapsed: 0.0 };
        self.subscription = None;
    }

    /// Jumping lets go of the rope.
    fn on_event(&mut self, _ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        if *event != InputEvent::Jump {
            return None;
        }
        log::debug!("[grapple] detached by jump");
        Some(AbilityKind::FreeLook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::prefabs::{spawn_grapple_point, spawn_static_box};
    use crate::systems::CharacterController;
    use crate::testing::Rig;
    use glam::Vec2;

    fn config() -> GrappleConfig {
        GrappleConfig::default()
    }

    #[test]
    fn slow_entry_is_kicked_to_min_swing_speed() {
        // Anchor 10 units straight up, rope 5: zero velocity would hang dead.
        let p = Pendulum::attach(
            Vec3::new(0.0, 10.0, 0.0),
            5.0,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::ZERO,
            Vec3::NEG_Z,
            1.0,
        );
        assert_eq!(p.theta, 0.0);
        assert_eq!(p.omega.abs(), 1.0);
    }

    #[test]
    fn far_entry_hangs_straight_down_at_min_speed() {
        // Player 10 below the anchor, rope 5, standing still.
        let p = Pendulum::attach(
            Vec3::new(0.0, 10.0, 0.0),
            5.0,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::NEG_Z,
            1.0,
        );
        assert_eq!(p.theta, 0.0);
        assert_eq!(p.omega.abs(), 1.0);
        assert!(p.position().distance(Vec3::new(0.0, 5.0, 0.0)) < 1e-5);
    }

    #[test]
    fn entry_velocity_sets_omega() {
        let p = Pendulum::attach(Vec3::ZERO, 5.0, Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 0.0, -10.0), Vec3::NEG_Z, 1.0);
        assert!((p.omega - 2.0).abs() < 1e-5);
        assert!(p.linear_velocity().distance(Vec3::new(0.0, 0.0, -10.0)) < 1e-4);
    }

    #[test]
    fn position_matches_angle() {
        let mut p = Pendulum::attach(Vec3::ZERO, 5.0, Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO, Vec3::X, 1.0);
        assert!(p.position().distance(Vec3::new(0.0, -5.0, 0.0)) < 1e-5);
        p.theta = FRAC_PI_2;
        assert!(p.position().distance(Vec3::new(5.0, 0.0, 0.0)) < 1e-4);
        assert!(p.tangent().distance(Vec3::Y) < 1e-5);

        let side = Pendulum::attach(Vec3::ZERO, 5.0, Vec3::new(-3.0, -4.0, 0.0), Vec3::ZERO, Vec3::X, 1.0);
        assert!(side.theta < 0.0);
        assert!(side.position().distance(Vec3::new(-3.0, -4.0, 0.0)) < 1e-4);
    }

    #[test]
    fn angle_stays_clamped_and_swing_never_stalls() {
        let mut cfg = config();
        cfg.energy_boost = 5.0;
        let mut p = Pendulum::attach(Vec3::ZERO, 5.0, Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO, Vec3::X, 1.0);
        let push = Vec3::X;
        for _ in 0..2000 {
            p.step(&cfg, 9.81, push, 1.0 / 60.0);
            assert!(p.theta.abs() <= FRAC_PI_2 + 1e-6);
            assert!(p.omega.abs() >= cfg.min_angular_velocity - 1e-6);
        }
    }

    #[test]
    fn limit_reflects_at_eighty_percent() {
        let cfg = GrappleConfig {
            energy_boost: 0.0,
            min_angular_velocity: 0.0,
            ..config()
        };
        let mut p = Pendulum::attach(Vec3::ZERO, 5.0, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::X, 0.0);
        p.theta = FRAC_PI_2 - 0.01;
        p.omega = 3.0;
        p.step(&cfg, 0.0, Vec3::ZERO, 0.1);
        assert_eq!(p.theta, FRAC_PI_2);
        assert!((p.omega + 2.4).abs() < 1e-5);
    }

    fn swing_rig() -> Rig {
        let mut rig = Rig::new();
        spawn_grapple_point(&mut rig.world, Vec3::new(0.0, 10.0, 0.0));
        rig.controller.set_position(Vec3::new(0.0, 0.5, 0.0));
        rig.input.green = true;
        rig
    }

    #[test]
    fn enter_refuses_when_blocked_or_out_of_range() {
        let mut rig = Rig::new();
        spawn_grapple_point(&mut rig.world, Vec3::new(0.0, 40.0, 0.0));
        let mut state = GrappleState::default();
        assert_eq!(state.enter(&mut rig.ctx()), Err(EntryRefused));

        let mut rig = swing_rig();
        spawn_static_box(&mut rig.world, Vec3::new(0.0, 5.0, 0.0), Vec3::new(2.0, 0.2, 2.0));
        assert_eq!(state.enter(&mut rig.ctx()), Err(EntryRefused));
        assert!(rig.forces.is_enabled());
    }

    #[test]
    fn inactive_points_are_ignored() {
        let mut rig = Rig::new();
        let point = spawn_grapple_point(&mut rig.world, Vec3::new(0.0, 8.0, 0.0));
        rig.world.get::<&mut GrapplePoint>(point).unwrap().active = false;
        assert!(find_anchor(&rig.ctx()).is_none());
    }

    #[test]
    fn attach_extend_swing_and_release_with_momentum() {
        let mut rig = swing_rig();
        let mut state = GrappleState::default();
        {
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            assert!(!ctx.forces.is_enabled());
            let p = *state.pendulum().unwrap();
            assert_eq!(p.omega.abs(), 1.0);
            assert!(matches!(state.phase(), SwingPhase::Extending { .. }));

            for _ in 0..10 {
                assert_eq!(state.tick(&mut ctx, 1.0 / 60.0), None);
            }
            assert_eq!(state.phase(), SwingPhase::Swinging);
            let rope = ctx.presentation.rope.unwrap();
            assert_eq!(rope.end, Vec3::new(0.0, 10.0, 0.0));

            for _ in 0..30 {
                assert_eq!(state.tick(&mut ctx, 1.0 / 60.0), None);
            }
            let p = *state.pendulum().unwrap();
            let hang = ctx.controller.position().distance(p.anchor);
            assert!((hang - 5.0).abs() < 1e-3, "rope length {}", hang);
        }

        rig.input.green = false;
        let expected = {
            let p = *state.pendulum().unwrap();
            p.linear_velocity() + Vec3::Y * 5.0
        };
        {
            let mut ctx = rig.ctx();
            assert_eq!(state.tick(&mut ctx, 1.0 / 60.0), Some(AbilityKind::FreeLook));
            state.exit(&mut ctx);
        }
        assert!(rig.forces.is_enabled());
        assert!(rig.forces.impact().distance(expected) < 1e-4);
        assert!(state.anchor().is_none());
        assert!(rig.presentation.rope.is_none());
    }

    #[test]
    fn jump_detaches_with_momentum() {
        let mut rig = swing_rig();
        let mut state = GrappleState::default();
        {
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            for _ in 0..120 {
                state.tick(&mut ctx, 1.0 / 60.0);
            }
        }
        assert!(rig.bus.is_subscribed(InputEvent::Jump));
        let expected = state.pendulum().unwrap().linear_velocity() + Vec3::Y * 5.0;
        {
            let mut ctx = rig.ctx();
            assert_eq!(state.on_event(&mut ctx, &InputEvent::Jump), Some(AbilityKind::FreeLook));
            state.exit(&mut ctx);
        }
        assert!(rig.forces.impact().distance(expected) < 1e-4);
        assert!(rig.forces.is_enabled());
        assert_eq!(rig.bus.subscriber_count(), 0);
    }

    #[test]
    fn slow_heading_falls_back_to_camera() {
        let mut rig = swing_rig();
        rig.controller.finish_step(1.0 / 60.0);
        // Drifting sideways below the threshold.
        rig.controller.move_by(&rig.world, Vec3::new(0.3, 0.0, 0.0) / 60.0);
        rig.controller.finish_step(1.0 / 60.0);
        let mut state = GrappleState::default();
        state.enter(&mut rig.ctx()).unwrap();
        assert!(state.pendulum().unwrap().swing_dir.distance(Vec3::NEG_Z) < 1e-5);
    }

    #[test]
    fn destroyed_anchor_drops_the_player() {
        let mut rig = swing_rig();
        let mut state = GrappleState::default();
        state.enter(&mut rig.ctx()).unwrap();
        let anchor = state.anchor().unwrap();
        rig.world.despawn(anchor).unwrap();
        assert_eq!(state.tick(&mut rig.ctx(), 1.0 / 60.0), Some(AbilityKind::FreeLook));
    }

    #[test]
    fn pumping_with_input_speeds_up_the_swing() {
        // Without the speed floor the free swing has a natural peak to beat.
        let run = |stick: Vec2| {
            let mut rig = swing_rig();
            rig.config.grapple.min_angular_velocity = 0.0;
            rig.config.grapple.energy_boost = 0.0;
            rig.input.move_vector = stick;
            let mut state = GrappleState::default();
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            let mut peak: f32 = 0.0;
            for _ in 0..240 {
                state.tick(&mut ctx, 1.0 / 60.0);
                peak = peak.max(state.pendulum().unwrap().theta.abs());
            }
            peak
        };
        // Camera forward is -Z, which is also the swing axis here.
        assert!(run(Vec2::Y) > run(Vec2::ZERO));
    }
}
