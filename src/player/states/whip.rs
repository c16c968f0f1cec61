//! Whip capture: pull an enemy in, spin it around, throw it.

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::components::{
    Absorbable, Enemy, Kinematic, LayerMask, LocalTransform, Mass, Spin, Stunned, Velocity,
};
use crate::engine::input::{InputEvent, Subscription};
use crate::fsm::{EntryRefused, State};

use super::super::movement::{camera_relative, face_direction, move_with_forces};
use super::super::{AbilityKind, PlayerContext, Rope};

/// Without stick input the spin winds down at this fraction of its
/// acceleration.
const SPIN_DECAY_FACTOR: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhipPhase {
    Capturing,
    Spinning,
}

/// Nearest enemy in range, inside the view cone around the body's heading,
/// with nothing solid in between.
pub fn find_target(ctx: &PlayerContext<'_>) -> Option<Entity> {
    let whip = &ctx.config.whip;
    let position = ctx.controller.position();
    let eye = position + Vec3::Y;
    let heading = ctx.body.flat_forward_or(ctx.camera.flat_forward());
    let half_angle = (whip.view_angle * 0.5).to_radians();

    let mut best: Option<(Entity, f32)> = None;
    for entity in ctx
        .physics
        .overlap_sphere(ctx.world, position, whip.range, LayerMask::ENEMY)
    {
        if !ctx.world.contains(entity) || ctx.world.get::<&Enemy>(entity).is_err() {
            continue;
        }
        let claimed = ctx
            .world
            .get::<&Absorbable>(entity)
            .map(|a| a.is_claimed())
            .unwrap_or(false);
        if claimed {
            continue;
        }
        let Ok(target) = ctx.world.get::<&LocalTransform>(entity).map(|t| t.position) else {
            continue;
        };

        let to_target = target - position;
        let distance = to_target.length();
        if distance > whip.range {
            continue;
        }
        let flat = Vec3::new(to_target.x, 0.0, to_target.z).normalize_or_zero();
        if flat != Vec3::ZERO && heading.angle_between(flat) > half_angle {
            continue;
        }
        if ctx.physics.is_blocked(ctx.world, eye, target, LayerMask::MASK_SOLID) {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((entity, distance));
        }
    }
    best.map(|(entity, _)| entity)
}

/// Holding an enemy on the whip.
pub struct WhipState {
    target: Option<Entity>,
    target_was_kinematic: bool,
    phase: WhipPhase,
    /// Radians around the hold centre, in body space.
    spin_angle: f32,
    /// Degrees per second.
    spin_speed: f32,
    subscription: Option<Subscription>,
}

impl Default for WhipState {
    fn default() -> Self {
        Self {
            target: None,
            target_was_kinematic: false,
            phase: WhipPhase::Capturing,
            spin_angle: 0.0,
            spin_speed: 0.0,
            subscription: None,
        }
    }
}

impl WhipState {
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn phase(&self) -> WhipPhase {
        self.phase
    }

    pub fn spin_speed(&self) -> f32 {
        self.spin_speed
    }

    fn hold_center(ctx: &PlayerContext<'_>) -> Vec3 {
        ctx.controller.position() + Vec3::Y * ctx.config.whip.hold_height
    }

    /// Point on the spin circle for `angle`; angle 0 is straight ahead.
    fn circle_point(ctx: &PlayerContext<'_>, angle: f32) -> Vec3 {
        let local = Vec3::new(angle.sin(), 0.0, angle.cos()) * ctx.config.whip.hold_radius;
        Self::hold_center(ctx) + ctx.body.rotation * local
    }

    /// Hand the target back to the world without throwing it.
    fn release(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(target) = self.target.take() else {
            return;
        };
        if !ctx.world.contains(target) {
            return;
        }
        if !self.target_was_kinematic {
            let _ = ctx.world.remove_one::<Kinematic>(target);
        }
        let _ = ctx.world.remove_one::<Stunned>(target);
        if let Ok(mut velocity) = ctx.world.get::<&mut Velocity>(target) {
            velocity.0 = Vec3::ZERO;
        }
        log::debug!("[whip] released {:?}", target);
    }

    fn throw(&mut self, ctx: &mut PlayerContext<'_>, target: Entity) {
        let whip = &ctx.config.whip;
        let charge = ((self.spin_speed - whip.start_spin_speed)
            / (whip.max_spin_speed - whip.start_spin_speed))
            .clamp(0.0, 1.0);
        let force = whip.min_throw_force + (whip.max_throw_force - whip.min_throw_force) * charge;
        let mass = ctx.world.get::<&Mass>(target).map(|m| m.0).unwrap_or(1.0).max(0.01);
        let direction = ctx.body.forward();

        let _ = ctx.world.remove_one::<Kinematic>(target);
        let _ = ctx.world.remove_one::<Stunned>(target);
        let _ = ctx.world.insert(
            target,
            (
                Velocity(direction * force / mass),
                Spin(Vec3::Y * self.spin_speed.to_radians()),
            ),
        );
        self.target = None;
        log::info!("[whip] threw {:?} with force {:.1}", target, force);
    }
}

impl State for WhipState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Whip
    }

    fn can_enter(&self, ctx: &PlayerContext<'_>) -> bool {
        find_target(ctx).is_some()
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        let Some(target) = find_target(ctx) else {
            log::warn!("[whip] no enemy in reach");
            return Err(EntryRefused);
        };
        self.target_was_kinematic = ctx.world.get::<&Kinematic>(target).is_ok();
        let _ = ctx.world.insert(target, (Kinematic, Stunned));
        if let Ok(mut velocity) = ctx.world.get::<&mut Velocity>(target) {
            velocity.0 = Vec3::ZERO;
        }

        self.target = Some(target);
        self.phase = WhipPhase::Capturing;
        self.spin_angle = 0.0;
        self.spin_speed = ctx.config.whip.start_spin_speed;
        self.subscription = Some(ctx.bus.subscribe(&[InputEvent::Jump]));
        log::info!("[whip] caught {:?}", target);
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        let Some(target) = self.target else {
            return Some(AbilityKind::FreeLook);
        };
        if !ctx.world.contains(target) {
            log::warn!("[whip] target {:?} vanished", target);
            self.target = None;
            return Some(AbilityKind::FreeLook);
        }
        if !ctx.input.green {
            return Some(AbilityKind::FreeLook);
        }
        let config = ctx.config;
        let whip = &config.whip;

        // The player stays put but still falls.
        move_with_forces(ctx, Vec3::ZERO, dt);

        let Ok(current) = ctx.world.get::<&LocalTransform>(target).map(|t| t.position) else {
            self.target = None;
            return Some(AbilityKind::FreeLook);
        };
        let next = match self.phase {
            WhipPhase::Capturing => {
                let hold = Self::circle_point(ctx, 0.0);
                let next = current.lerp(hold, (whip.capture_speed * dt).min(1.0));
                if next.distance(hold) < whip.capture_threshold {
                    self.phase = WhipPhase::Spinning;
                    log::debug!("[whip] captured, spinning");
                }
                next
            }
            WhipPhase::Spinning => {
                let stick = camera_relative(ctx.camera, ctx.input.move_vector);
                face_direction(ctx.body, stick, config.movement.rotation_speed, dt);
                let change = if ctx.input.has_move_input() {
                    whip.spin_acceleration * dt
                } else {
                    -whip.spin_acceleration * SPIN_DECAY_FACTOR * dt
                };
                self.spin_speed =
                    (self.spin_speed + change).clamp(whip.start_spin_speed, whip.max_spin_speed);
                self.spin_angle += self.spin_speed.to_radians() * dt;
                Self::circle_point(ctx, self.spin_angle)
            }
        };

        if let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(target) {
            transform.position = next;
            if self.phase == WhipPhase::Spinning {
                transform.rotation = ctx.body.rotation * Quat::from_rotation_y(self.spin_angle);
            }
        }
        ctx.presentation.rope = Some(Rope {
            origin: Self::hold_center(ctx),
            end: next,
        });
        None
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        self.release(ctx);
        self.phase = WhipPhase::Capturing;
        self.subscription = None;
        ctx.presentation.rope = None;
    }

    fn on_event(&mut self, ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        if *event != InputEvent::Jump || self.phase != WhipPhase::Spinning {
            return None;
        }
        let target = self.target?;
        if !ctx.world.contains(target) {
            self.target = None;
            return Some(AbilityKind::FreeLook);
        }
        self.throw(ctx, target);
        Some(AbilityKind::FreeLook)
    }
}
