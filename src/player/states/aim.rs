use glam::{Quat, Vec3};

use crate::components::LayerMask;
use crate::engine::input::InputEvent;
use crate::fsm::{EntryRefused, State};
use crate::scene::prefabs::spawn_ink_projectile;
use crate::systems::{solve_ballistic_velocity, GRAVITY};

use super::super::movement::{camera_relative, face_target_instant, look_rotation, move_with_forces};
use super::super::{AbilityKind, PlayerContext, Reticle};

/// Over-the-shoulder strafing with a surface-aligned reticle and ballistic
/// ink shots.
#[derive(Default)]
pub struct AimState {
    next_fire_time: f32,
    shots_fired: u32,
}

impl AimState {
    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    fn fire(&mut self, ctx: &mut PlayerContext<'_>, reticle: Option<Reticle>) {
        let aim = &ctx.config.aim;
        let origin = ctx.controller.position() + ctx.body.rotation * aim.fire_point;
        let target = match reticle {
            Some(reticle) => reticle.point,
            None => ctx.camera.position + ctx.camera.front() * aim.max_distance,
        };
        let velocity = solve_ballistic_velocity(origin, target, aim.flight_time, GRAVITY.y);
        spawn_ink_projectile(ctx.world, origin, velocity, aim.projectile_radius, aim.projectile_damage);
        self.shots_fired += 1;
        log::debug!("[aim] fired at {:?}", target);
    }
}

/// Centre-screen sphere cast against aimable surfaces.
pub fn solve_reticle(ctx: &PlayerContext<'_>) -> Option<Reticle> {
    let aim = &ctx.config.aim;
    let camera = ctx.camera;
    let hit = ctx.physics.sphere_cast(
        ctx.world,
        camera.position,
        camera.front(),
        aim.sphere_radius,
        aim.max_distance,
        LayerMask::AIM_TARGET | LayerMask::GROUND,
    )?;

    let normal = hit.normal;
    let project = |v: Vec3| v - normal * v.dot(normal);
    let mut up = project(camera.up());
    if up.length_squared() < 1e-6 {
        up = project(camera.right());
    }
    let rotation = if up.length_squared() < 1e-6 {
        Quat::from_rotation_arc(Vec3::Z, normal)
    } else {
        look_rotation(normal, up.normalize())
    };

    Some(Reticle {
        point: hit.point + normal * aim.reticle_offset,
        normal,
        rotation,
        scale: aim.reticle_size_at_1m * hit.distance.max(0.01),
        distance: hit.distance,
    })
}

impl State for AimState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Aim
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        ctx.presentation.reticle = None;
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        if !ctx.input.aim {
            return Some(AbilityKind::FreeLook);
        }
        let config = ctx.config;

        face_target_instant(ctx.body, ctx.camera.flat_forward());
        let velocity = camera_relative(ctx.camera, ctx.input.move_vector)
            * config.movement.speed
            * config.aim.speed_multiplier;
        move_with_forces(ctx, velocity, dt);

        let reticle = solve_reticle(ctx);
        ctx.presentation.reticle = reticle;

        if ctx.input.fire && ctx.time >= self.next_fire_time {
            self.fire(ctx, reticle);
            self.next_fire_time = ctx.time + config.aim.fire_cooldown;
        }
        None
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        ctx.presentation.reticle = None;
    }
}
