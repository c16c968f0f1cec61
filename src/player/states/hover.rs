use glam::Vec3;

use crate::engine::input::InputEvent;
use crate::fsm::{EntryRefused, State};

use super::super::movement::{camera_relative, face_direction, move_with_forces};
use super::super::{AbilityKind, PlayerContext};

/// Upward thrust while the hover input is held.
#[derive(Default)]
pub struct HoverState;

impl State for HoverState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Hover
    }

    fn enter(&mut self, _ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        log::debug!("[hover] thrust on");
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        if !ctx.input.hover {
            return Some(AbilityKind::FreeLook);
        }
        let config = ctx.config;

        ctx.forces.clear_vertical_velocity();
        ctx.forces.add_force(Vec3::Y * config.hover.force * dt);

        let velocity = camera_relative(ctx.camera, ctx.input.move_vector) * config.hover.aerial_speed;
        move_with_forces(ctx, velocity, dt);
        face_direction(ctx.body, velocity, config.movement.rotation_speed, dt);
        None
    }

    fn exit(&mut self, _ctx: &mut PlayerContext<'_>) {
        log::debug!("[hover] thrust off");
    }
}
