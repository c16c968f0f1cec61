use std::collections::HashSet;

use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{
    Collider, CollisionEvent, Destructible, Enemy, Health, InkSurface, LocalTransform, Projectile,
    ProjectileKind,
};
use crate::scene::prefabs::spawn_ink_patch;

/// Lift painted patches off the surface.
const INK_SURFACE_OFFSET: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileOutcome {
    Expired(Entity),
    Destroyed { projectile: Entity, target: Entity },
    Damaged { projectile: Entity, target: Entity, killed: bool },
    Painted { projectile: Entity, patch: Entity },
    Spent(Entity),
}

/// Age projectiles and resolve this step's impacts.
///
/// `events` are the contacts produced by the physics step. Each projectile
/// resolves at most one impact and is despawned afterwards.
pub fn projectile_system(world: &mut World, events: &[CollisionEvent], dt: f32) -> Vec<ProjectileOutcome> {
    let mut outcomes = Vec::new();
    let mut finished: HashSet<Entity> = HashSet::new();

    for event in events {
        for (projectile, target, normal_to_target) in [
            (event.entity_a, event.entity_b, event.contact_normal),
            (event.entity_b, event.entity_a, -event.contact_normal),
        ] {
            if finished.contains(&projectile) {
                continue;
            }
            let Ok(shot) = world.get::<&Projectile>(projectile).map(|p| *p) else {
                continue;
            };
            // Projectiles pass through ink patches and each other.
            if world.get::<&InkSurface>(target).is_ok() || world.get::<&Projectile>(target).is_ok() {
                continue;
            }
            finished.insert(projectile);
            outcomes.push(resolve_impact(world, projectile, shot, target, -normal_to_target));
            let _ = world.despawn(projectile);
        }
    }

    let mut expired = Vec::new();
    for (entity, shot) in world.query_mut::<&mut Projectile>() {
        shot.lifetime -= dt;
        if shot.lifetime <= 0.0 {
            expired.push(entity);
        }
    }
    for entity in expired {
        log::debug!("[projectile] {:?} expired", entity);
        let _ = world.despawn(entity);
        outcomes.push(ProjectileOutcome::Expired(entity));
    }

    outcomes
}

/// `surface_normal` points from the target back toward the projectile.
fn resolve_impact(
    world: &mut World,
    projectile: Entity,
    shot: Projectile,
    target: Entity,
    surface_normal: Vec3,
) -> ProjectileOutcome {
    if world.get::<&Destructible>(target).is_ok() {
        log::info!("[projectile] {:?} destroyed {:?}", projectile, target);
        let _ = world.despawn(target);
        return ProjectileOutcome::Destroyed { projectile, target };
    }

    if world.get::<&Enemy>(target).is_ok() {
        let killed = match world.get::<&mut Health>(target) {
            Ok(mut health) => health.deal_damage(shot.damage),
            Err(_) => false,
        };
        log::info!(
            "[projectile] {:?} hit enemy {:?} for {} (killed: {})",
            projectile,
            target,
            shot.damage,
            killed
        );
        if killed {
            let _ = world.despawn(target);
        }
        return ProjectileOutcome::Damaged {
            projectile,
            target,
            killed,
        };
    }

    if shot.kind == ProjectileKind::Ink {
        let (position, radius) = {
            let position = world
                .get::<&LocalTransform>(projectile)
                .map(|t| t.position)
                .unwrap_or(Vec3::ZERO);
            let radius = match world.get::<&Collider>(projectile).map(|c| *c) {
                Ok(Collider::Sphere { radius }) => radius,
                _ => 0.0,
            };
            (position, radius)
        };
        let point = position - surface_normal * radius + surface_normal * INK_SURFACE_OFFSET;
        let patch = spawn_ink_patch(world, point, surface_normal);
        log::debug!("[projectile] painted ink at {:?}", point);
        return ProjectileOutcome::Painted { projectile, patch };
    }

    ProjectileOutcome::Spent(projectile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::prefabs::{spawn_destructible, spawn_enemy, spawn_ground, spawn_ink_projectile};
    use crate::systems::physics_step;

    fn run(world: &mut World, steps: usize) -> Vec<ProjectileOutcome> {
        let mut all = Vec::new();
        for _ in 0..steps {
            let events = physics_step(world, 1.0 / 60.0);
            all.extend(projectile_system(world, &events, 1.0 / 60.0));
        }
        all
    }

    #[test]
    fn ink_shot_paints_the_ground() {
        let mut world = World::new();
        spawn_ground(&mut world);
        let shot = spawn_ink_projectile(&mut world, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -5.0, 0.0), 0.1, 5.0);

        let outcomes = run(&mut world, 60);
        let painted = outcomes.iter().find_map(|o| match o {
            ProjectileOutcome::Painted { projectile, patch } if *projectile == shot => Some(*patch),
            _ => None,
        });
        let patch = painted.expect("ink shot should paint");
        assert!(!world.contains(shot));
        let ink = *world.get::<&InkSurface>(patch).unwrap();
        assert!(ink.normal.distance(Vec3::Y) < 1e-4);
        let y = world.get::<&LocalTransform>(patch).unwrap().position.y;
        assert!(y > 0.0 && y < 0.1);
    }

    #[test]
    fn destructibles_break_in_one_hit() {
        let mut world = World::new();
        let crate_box = spawn_destructible(&mut world, Vec3::new(0.0, 1.0, -3.0), Vec3::splat(0.5));
        spawn_ink_projectile(&mut world, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -20.0), 0.1, 5.0);
        let outcomes = run(&mut world, 30);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, ProjectileOutcome::Destroyed { target, .. } if *target == crate_box)));
        assert!(!world.contains(crate_box));
    }

    #[test]
    fn enemy_takes_damage_and_dies_at_zero() {
        let mut world = World::new();
        let enemy = spawn_enemy(&mut world, Vec3::new(0.0, 1.0, -3.0), 8.0);
        world.insert_one(enemy, crate::components::Kinematic).unwrap();

        spawn_ink_projectile(&mut world, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -20.0), 0.1, 5.0);
        run(&mut world, 30);
        assert_eq!(world.get::<&Health>(enemy).unwrap().current, 3.0);

        spawn_ink_projectile(&mut world, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -20.0), 0.1, 5.0);
        let outcomes = run(&mut world, 30);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, ProjectileOutcome::Damaged { killed: true, .. })));
        assert!(!world.contains(enemy));
    }

    #[test]
    fn unresolved_projectiles_expire() {
        let mut world = World::new();
        let shot = world.spawn((Projectile::new(ProjectileKind::Vacuum, 10.0),));
        let outcomes = projectile_system(&mut world, &[], 4.0);
        assert!(outcomes.is_empty());
        let outcomes = projectile_system(&mut world, &[], 1.5);
        assert_eq!(outcomes, vec![ProjectileOutcome::Expired(shot)]);
        assert!(!world.contains(shot));
    }
}
