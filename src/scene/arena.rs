use glam::Vec3;
use hecs::{Entity, World};

use crate::components::AbsorbSize;
use crate::scene::prefabs::{
    spawn_absorbable, spawn_destructible, spawn_enemy, spawn_grapple_point, spawn_ground,
    spawn_ink_patch, spawn_static_box,
};

/// Distance between the arena's practice areas. Larger than every ability's
/// reach so one area never triggers another's targets.
const AREA_SPACING: f32 = 40.0;

/// Landmarks of the demo arena. Each practice area has its own spawn point;
/// the player always starts facing -Z.
#[derive(Debug, Clone)]
pub struct Arena {
    pub swing_spawn: Vec3,
    pub vacuum_spawn: Vec3,
    pub whip_spawn: Vec3,
    pub aim_spawn: Vec3,
    pub grapple_point: Entity,
    pub whip_enemy: Entity,
    pub crate_large: Entity,
    pub target_wall: Entity,
    pub destructible: Entity,
}

/// Build the demo arena: ground, a few blocking boxes, and one practice area
/// per ability laid out along X.
pub fn load_arena(world: &mut World) -> Arena {
    spawn_ground(world);

    // Swing: a single high anchor ahead of the spawn.
    let swing_spawn = Vec3::ZERO;
    let grapple_point = spawn_grapple_point(world, swing_spawn + Vec3::new(0.0, 10.0, -6.0));
    spawn_static_box(world, swing_spawn + Vec3::new(0.0, 1.0, -16.0), Vec3::new(4.0, 1.0, 2.0));

    // Vacuum: loose props of every size.
    let vacuum_spawn = Vec3::X * AREA_SPACING;
    for (i, x) in [-0.8_f32, 0.0, 0.8].iter().enumerate() {
        let size = if i == 1 { AbsorbSize::Medium } else { AbsorbSize::Small };
        spawn_absorbable(world, vacuum_spawn + Vec3::new(*x, 0.5, -3.0), size, 1.0);
    }
    let crate_large = spawn_absorbable(world, vacuum_spawn + Vec3::new(0.0, 0.8, -4.5), AbsorbSize::Large, 2.0);

    // Whip: one enemy in reach.
    let whip_spawn = Vec3::NEG_X * AREA_SPACING;
    let whip_enemy = spawn_enemy(world, whip_spawn + Vec3::new(0.0, 1.0, -6.0), 40.0);

    // Aim: a paintable wall, a breakable crate, and a pre-painted strip.
    let aim_spawn = Vec3::X * (AREA_SPACING * 2.0);
    let target_wall = spawn_static_box(world, aim_spawn + Vec3::new(0.0, 3.0, -15.0), Vec3::new(6.0, 3.0, 0.5));
    let destructible = spawn_destructible(world, aim_spawn + Vec3::new(3.0, 0.5, -8.0), Vec3::splat(0.5));
    for i in 0..4 {
        spawn_ink_patch(world, aim_spawn + Vec3::new(0.0, 0.02, -1.4 * i as f32), Vec3::Y);
    }

    log::info!("[arena] loaded {} entities", world.len());
    Arena {
        swing_spawn,
        vacuum_spawn,
        whip_spawn,
        aim_spawn,
        grapple_point,
        whip_enemy,
        crate_large,
        target_wall,
        destructible,
    }
}
