//! Ownership transitions of absorbable objects.
//!
//! An object goes `free -> being absorbed -> absorbed (stored) | held` and
//! back to free through [`release`] or [`convert_to_projectile`]. Every step
//! that overrides physics state records the original in the `Absorbable`
//! so release can put it back.

use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{
    AbsorbSize, Absorbable, ColliderDisabled, GravityAffected, Hidden, Kinematic, LocalTransform,
    Projectile, ProjectileKind, Stunned, Velocity,
};

/// Claim a free object and switch off its physics. Returns `false` if the
/// entity is gone, not absorbable, or already claimed.
pub fn start_absorption(world: &mut World, entity: Entity) -> bool {
    let saved_kinematic = world.get::<&Kinematic>(entity).is_ok();
    let saved_gravity = world.get::<&GravityAffected>(entity).is_ok();
    let saved_scale = world
        .get::<&LocalTransform>(entity)
        .map(|t| t.scale)
        .unwrap_or(Vec3::ONE);

    {
        let Ok(mut absorbable) = world.get::<&mut Absorbable>(entity) else {
            return false;
        };
        if absorbable.is_claimed() {
            return false;
        }
        absorbable.being_absorbed = true;
        absorbable.saved_kinematic = saved_kinematic;
        absorbable.saved_gravity = saved_gravity;
        absorbable.saved_scale = saved_scale;
    }

    let _ = world.insert(entity, (Kinematic, ColliderDisabled));
    let _ = world.remove_one::<GravityAffected>(entity);
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        vel.0 = Vec3::ZERO;
    }
    true
}

/// The object reached the player. Small objects disappear from view.
pub fn complete_absorption(world: &mut World, entity: Entity) {
    let size = {
        let Ok(mut absorbable) = world.get::<&mut Absorbable>(entity) else {
            return;
        };
        absorbable.being_absorbed = false;
        absorbable.absorbed = true;
        absorbable.size
    };
    if size == AbsorbSize::Small {
        let _ = world.insert_one(entity, Hidden);
    }
}

/// Lift a (large) object in front of the player.
pub fn start_holding(world: &mut World, entity: Entity) {
    {
        let Ok(mut absorbable) = world.get::<&mut Absorbable>(entity) else {
            return;
        };
        absorbable.being_held = true;
    }
    let _ = world.insert_one(entity, Kinematic);
    let _ = world.remove_one::<GravityAffected>(entity);
}

/// Hand the object back to the world with its original physics state.
/// Also lifts a stun applied when an enemy was pulled in.
pub fn release(world: &mut World, entity: Entity) {
    let saved = {
        let Ok(mut absorbable) = world.get::<&mut Absorbable>(entity) else {
            return;
        };
        absorbable.being_absorbed = false;
        absorbable.absorbed = false;
        absorbable.being_held = false;
        *absorbable
    };

    if saved.saved_kinematic {
        let _ = world.insert_one(entity, Kinematic);
    } else {
        let _ = world.remove_one::<Kinematic>(entity);
    }
    if saved.saved_gravity {
        let _ = world.insert_one(entity, GravityAffected);
    } else {
        let _ = world.remove_one::<GravityAffected>(entity);
    }
    let _ = world.remove_one::<ColliderDisabled>(entity);
    let _ = world.remove_one::<Hidden>(entity);
    let _ = world.remove_one::<Stunned>(entity);
    if let Ok(mut transform) = world.get::<&mut LocalTransform>(entity) {
        transform.scale = saved.saved_scale;
    }
}

/// Release the object and launch it along `direction`.
///
/// Objects that cannot be projectiles are simply released. Returns whether a
/// projectile was created.
pub fn convert_to_projectile(
    world: &mut World,
    entity: Entity,
    direction: Vec3,
    speed_multiplier: f32,
) -> bool {
    let Ok(absorbable) = world.get::<&Absorbable>(entity).map(|a| *a) else {
        return false;
    };
    release(world, entity);
    if !absorbable.can_be_projectile {
        log::debug!("[absorb] {:?} cannot be a projectile, released instead", entity);
        return false;
    }

    let velocity = direction.normalize_or_zero() * absorbable.projectile_speed * speed_multiplier;
    let _ = world.remove_one::<Kinematic>(entity);
    let _ = world.insert(
        entity,
        (
            GravityAffected,
            Velocity(velocity),
            Projectile::new(ProjectileKind::Vacuum, absorbable.projectile_damage),
        ),
    );
    true
}

/// Make an enemy absorbable on first contact and stun it.
pub fn prepare_enemy(world: &mut World, entity: Entity, projectile_damage: f32) {
    if world.get::<&Absorbable>(entity).is_err() {
        let _ = world.insert_one(
            entity,
            Absorbable::new(AbsorbSize::Medium, 2.0).with_damage(projectile_damage),
        );
    }
    let _ = world.insert_one(entity, Stunned);
}
