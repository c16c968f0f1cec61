use crate::engine::input::{InputEvent, Subscription};
use crate::fsm::{EntryRefused, State};

use super::super::movement::{camera_relative, face_direction, jump, move_with_forces, SmoothedMotion};
use super::super::{AbilityKind, PlayerContext};
use super::{grapple, whip};

/// Default locomotion, and the router into every other ability.
#[derive(Default)]
pub struct FreeLookState {
    motion: SmoothedMotion,
    /// The green hold must be released once before it routes again, so a
    /// throw or release does not immediately re-capture.
    green_armed: bool,
    subscription: Option<Subscription>,
}

impl FreeLookState {
    /// Ability routing. Order matters: vacuum, then whip before grapple on
    /// the green hold, then aim, then hover.
    fn route(&mut self, ctx: &PlayerContext<'_>) -> Option<AbilityKind> {
        let input = ctx.input;
        if input.vacuum && ctx.body.vacuum_unlocked {
            return Some(AbilityKind::Vacuum);
        }
        if input.green && ctx.body.green_unlocked && self.green_armed {
            if whip::find_target(ctx).is_some() {
                return Some(AbilityKind::Whip);
            }
            if grapple::find_anchor(ctx).is_some() {
                return Some(AbilityKind::Grapple);
            }
        }
        if input.aim {
            return Some(AbilityKind::Aim);
        }
        if input.hover {
            return Some(AbilityKind::Hover);
        }
        None
    }
}

impl State for FreeLookState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::FreeLook
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        self.motion.reset(ctx.controller.velocity());
        self.green_armed = !ctx.input.green;
        self.subscription = Some(ctx.bus.subscribe(&[InputEvent::Jump, InputEvent::Dive]));
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        if !ctx.input.green {
            self.green_armed = true;
        }
        if let Some(next) = self.route(ctx) {
            return Some(next);
        }

        let config = ctx.config;
        let movement = &config.movement;
        let target = camera_relative(ctx.camera, ctx.input.move_vector) * movement.speed;
        let velocity = self
            .motion
            .update(target, movement.acceleration_time, movement.deceleration_time, dt);
        let rotation_speed = movement.rotation_speed;
        move_with_forces(ctx, velocity, dt);
        if ctx.input.has_move_input() {
            face_direction(ctx.body, velocity, rotation_speed, dt);
        }
        None
    }

    fn exit(&mut self, _ctx: &mut PlayerContext<'_>) {
        self.subscription = None;
    }

    fn on_event(&mut self, ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        match event {
            InputEvent::Jump => {
                jump(ctx);
                None
            }
            InputEvent::Dive => Some(AbilityKind::Swim),
            _ => None,
        }
    }
}
