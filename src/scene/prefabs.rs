use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::*;

/// Thickness of a painted ink patch collider.
const INK_PATCH_HALF_THICKNESS: f32 = 0.05;
const INK_PATCH_HALF_SIZE: f32 = 0.75;

/// Infinite ground plane at y = 0.
pub fn spawn_ground(world: &mut World) -> Entity {
    world.spawn((
        LocalTransform::new(Vec3::ZERO),
        Collider::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        },
        Static,
        Layer(LayerMask::GROUND | LayerMask::AIM_TARGET),
        Restitution(0.0),
        Friction(0.8),
    ))
}

/// Axis-aligned static box. Paintable and blocks line of sight.
pub fn spawn_static_box(world: &mut World, pos: Vec3, half_extents: Vec3) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        Collider::Box { half_extents },
        Static,
        Layer(LayerMask::DEFAULT | LayerMask::AIM_TARGET),
        Restitution(0.0),
        Friction(0.8),
    ))
}

pub fn spawn_grapple_point(world: &mut World, pos: Vec3) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        Collider::Sphere { radius: 0.3 },
        Static,
        Layer(LayerMask::GRAPPLE),
        GrapplePoint { active: true },
    ))
}

/// Loose physics prop the vacuum can pick up.
pub fn spawn_absorbable(world: &mut World, pos: Vec3, size: AbsorbSize, weight: f32) -> Entity {
    let radius = match size {
        AbsorbSize::Small => 0.2,
        AbsorbSize::Medium => 0.4,
        AbsorbSize::Large => 0.8,
    };
    world.spawn((
        LocalTransform::new(pos),
        Velocity(Vec3::ZERO),
        Mass(weight),
        GravityAffected,
        Collider::Sphere { radius },
        Layer(LayerMask::ABSORBABLE),
        Absorbable::new(size, weight),
    ))
}

/// Enemy body. Sits on both the enemy and absorbable layers so the vacuum
/// can find it.
pub fn spawn_enemy(world: &mut World, pos: Vec3, health: f32) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        Velocity(Vec3::ZERO),
        Mass(2.0),
        GravityAffected,
        Collider::Capsule {
            radius: 0.4,
            height: 1.0,
        },
        Layer(LayerMask::ENEMY | LayerMask::ABSORBABLE),
        Enemy,
        Health::new(health),
    ))
}

pub fn spawn_destructible(world: &mut World, pos: Vec3, half_extents: Vec3) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        Collider::Box { half_extents },
        Static,
        Layer(LayerMask::DEFAULT | LayerMask::AIM_TARGET),
        Destructible,
    ))
}

/// Paint an ink patch at `point`, lying on the surface with `normal`.
///
/// The collider is an axis-aligned slab, thin along the dominant axis of the
/// normal. Patches sit on the `INK` layer only, so the character controller
/// walks through them, and are triggers, so bodies pass through too.
pub fn spawn_ink_patch(world: &mut World, point: Vec3, normal: Vec3) -> Entity {
    let normal = normal.normalize_or_zero();
    let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };
    let abs = normal.abs();
    let mut half_extents = Vec3::splat(INK_PATCH_HALF_SIZE);
    if abs.x >= abs.y && abs.x >= abs.z {
        half_extents.x = INK_PATCH_HALF_THICKNESS;
    } else if abs.y >= abs.z {
        half_extents.y = INK_PATCH_HALF_THICKNESS;
    } else {
        half_extents.z = INK_PATCH_HALF_THICKNESS;
    }

    let mut transform = LocalTransform::new(point);
    transform.rotation = Quat::from_rotation_arc(Vec3::Y, normal);
    world.spawn((
        transform,
        Collider::Box { half_extents },
        Static,
        Trigger,
        Layer(LayerMask::INK),
        InkSurface { normal },
    ))
}

/// Ink shot fired from the aim state.
pub fn spawn_ink_projectile(world: &mut World, pos: Vec3, velocity: Vec3, radius: f32, damage: f32) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        Velocity(velocity),
        GravityAffected,
        Collider::Sphere { radius },
        Projectile::new(ProjectileKind::Ink, damage),
    ))
}
