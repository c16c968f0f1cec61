use glam::{Quat, Vec3};
use hecs::World;

use crate::components::{
    CollisionEvent, Drag, GravityAffected, Kinematic, LocalTransform, Spin, Velocity,
};
use super::collision::collision_system;

pub const PHYSICS_DT: f32 = 1.0 / 60.0;
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Advance every free body by one fixed step, then detect and resolve
/// collisions. Kinematic bodies are left where gameplay code put them.
pub fn physics_step(world: &mut World, dt: f32) -> Vec<CollisionEvent> {
    for (_entity, (local, vel, gravity, drag, spin, kinematic)) in world
        .query_mut::<(
            &mut LocalTransform,
            &mut Velocity,
            Option<&GravityAffected>,
            Option<&Drag>,
            Option<&Spin>,
            Option<&Kinematic>,
        )>()
    {
        if kinematic.is_some() {
            continue;
        }
        if gravity.is_some() {
            vel.0 += GRAVITY * dt;
        }
        // vel *= (1 - drag * dt)
        if let Some(drag) = drag {
            let damping = (1.0 - drag.0 * dt).max(0.0);
            vel.0 *= damping;
        }
        // Semi-implicit Euler: update velocity first, then position
        local.position += vel.0 * dt;

        if let Some(spin) = spin {
            let angle = spin.0.length() * dt;
            if angle > 1e-6 {
                local.rotation = (Quat::from_axis_angle(spin.0.normalize(), angle) * local.rotation).normalize();
            }
        }
    }

    collision_system(world, dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Collider, Static};

    #[test]
    fn free_body_falls_and_kinematic_stays() {
        let mut world = World::new();
        let free = world.spawn((
            LocalTransform::new(Vec3::new(0.0, 10.0, 0.0)),
            Velocity(Vec3::ZERO),
            GravityAffected,
        ));
        let pinned = world.spawn((
            LocalTransform::new(Vec3::new(2.0, 10.0, 0.0)),
            Velocity(Vec3::ZERO),
            GravityAffected,
            Kinematic,
        ));
        for _ in 0..30 {
            physics_step(&mut world, PHYSICS_DT);
        }
        assert!(world.get::<&LocalTransform>(free).unwrap().position.y < 9.0);
        assert_eq!(world.get::<&LocalTransform>(pinned).unwrap().position.y, 10.0);
    }

    #[test]
    fn body_comes_to_rest_on_ground() {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            Static,
        ));
        let ball = world.spawn((
            LocalTransform::new(Vec3::new(0.0, 2.0, 0.0)),
            Velocity(Vec3::ZERO),
            GravityAffected,
            Collider::Sphere { radius: 0.5 },
        ));
        for _ in 0..600 {
            physics_step(&mut world, PHYSICS_DT);
        }
        let y = world.get::<&LocalTransform>(ball).unwrap().position.y;
        assert!((y - 0.5).abs() < 0.05, "resting height {}", y);
    }

    #[test]
    fn spin_rotates_body() {
        let mut world = World::new();
        let e = world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Velocity(Vec3::ZERO),
            Spin(Vec3::Y * std::f32::consts::PI),
        ));
        physics_step(&mut world, 0.5);
        let rot = world.get::<&LocalTransform>(e).unwrap().rotation;
        let fwd = rot * Vec3::Z;
        assert!(fwd.distance(Vec3::X) < 1e-4);
    }
}
