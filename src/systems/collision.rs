use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{
    Collider, ColliderDisabled, CollisionEvent, Friction, Kinematic, LocalTransform, Restitution,
    Static, Trigger, Velocity,
};

struct ColliderEntry {
    entity: Entity,
    position: Vec3,
    shape: Shape,
}

#[derive(Clone, Copy)]
enum Shape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    Plane { normal: Vec3, offset: f32 },
    Box { half_extents: Vec3 },
}

impl Shape {
    fn from_collider(collider: &Collider) -> Self {
        match *collider {
            Collider::Sphere { radius } => Shape::Sphere { radius },
            Collider::Capsule { radius, height } => Shape::Capsule {
                radius,
                half_height: height * 0.5,
            },
            Collider::Plane { normal, offset } => Shape::Plane { normal, offset },
            Collider::Box { half_extents } => Shape::Box { half_extents },
        }
    }
}

pub(crate) fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Contact between a round shape (point swept by `radius`) and a box.
/// Returns (normal from round toward box, penetration).
pub(crate) fn round_vs_box(point: Vec3, radius: f32, center: Vec3, half: Vec3) -> Option<(Vec3, f32)> {
    let closest = point.clamp(center - half, center + half);
    let diff = closest - point;
    let dist = diff.length();
    if dist > 1e-6 {
        let penetration = radius - dist;
        return (penetration > 0.0).then(|| (diff / dist, penetration));
    }
    // Centre inside the box: push out through the nearest face.
    let local = point - center;
    let gap = half - local.abs();
    let (axis, depth) = if gap.x <= gap.y && gap.x <= gap.z {
        (Vec3::X * local.x.signum(), gap.x)
    } else if gap.y <= gap.z {
        (Vec3::Y * local.y.signum(), gap.y)
    } else {
        (Vec3::Z * local.z.signum(), gap.z)
    };
    Some((-axis, depth + radius))
}

fn round_vs_plane(point: Vec3, radius: f32, normal: Vec3, offset: f32) -> Option<(Vec3, f32)> {
    let penetration = radius - (point.dot(normal) - offset);
    (penetration > 0.0).then(|| (-normal, penetration))
}

fn round_vs_round(a: Vec3, ra: f32, b: Vec3, rb: f32) -> Option<(Vec3, f32)> {
    let diff = b - a;
    let dist = diff.length();
    let penetration = (ra + rb) - dist;
    if penetration <= 0.0 {
        return None;
    }
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    Some((normal, penetration))
}

/// Normal (from A toward B) and depth for one ordered pair, or `None`.
fn contact(a: Vec3, sa: Shape, b: Vec3, sb: Shape) -> Option<(Vec3, f32)> {
    match (sa, sb) {
        (Shape::Sphere { radius: r1 }, Shape::Sphere { radius: r2 }) => round_vs_round(a, r1, b, r2),
        (Shape::Sphere { radius }, Shape::Plane { normal, offset }) => {
            round_vs_plane(a, radius, normal, offset)
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            round_vs_box(a, radius, b, half_extents)
        }
        (Shape::Sphere { radius: sr }, Shape::Capsule { radius: cr, half_height }) => {
            let closest = closest_point_on_segment(b - Vec3::Y * half_height, b + Vec3::Y * half_height, a);
            round_vs_round(a, sr, closest, cr)
        }
        (Shape::Capsule { radius, half_height }, Shape::Plane { normal, offset }) => {
            let top = a + Vec3::Y * half_height;
            let bottom = a - Vec3::Y * half_height;
            let deepest = if top.dot(normal) < bottom.dot(normal) { top } else { bottom };
            round_vs_plane(deepest, radius, normal, offset)
        }
        (Shape::Capsule { radius, half_height }, Shape::Box { half_extents }) => {
            let axis = closest_point_on_segment(a - Vec3::Y * half_height, a + Vec3::Y * half_height, b);
            round_vs_box(axis, radius, b, half_extents)
        }
        (Shape::Capsule { radius: r1, half_height: h1 }, Shape::Capsule { radius: r2, half_height: h2 }) => {
            let closest_b = closest_point_on_segment(b - Vec3::Y * h2, b + Vec3::Y * h2, a);
            let closest_a = closest_point_on_segment(a - Vec3::Y * h1, a + Vec3::Y * h1, closest_b);
            round_vs_round(closest_a, r1, closest_b, r2)
        }
        // Mirror cases: solve B-vs-A and flip the normal.
        (Shape::Plane { .. } | Shape::Box { .. }, Shape::Sphere { .. } | Shape::Capsule { .. })
        | (Shape::Capsule { .. }, Shape::Sphere { .. }) => {
            contact(b, sb, a, sa).map(|(n, depth)| (-n, depth))
        }
        // Static level geometry never collides with itself.
        _ => None,
    }
}

/// Contact of an upright capsule against a world collider.
/// Returns (normal from the capsule toward the collider, penetration).
pub(crate) fn capsule_contact(
    center: Vec3,
    radius: f32,
    half_height: f32,
    other_position: Vec3,
    other: &Collider,
) -> Option<(Vec3, f32)> {
    contact(
        center,
        Shape::Capsule { radius, half_height },
        other_position,
        Shape::from_collider(other),
    )
}

fn test_pair(a: &ColliderEntry, b: &ColliderEntry) -> Option<CollisionEvent> {
    contact(a.position, a.shape, b.position, b.shape).map(|(contact_normal, penetration_depth)| {
        CollisionEvent {
            entity_a: a.entity,
            entity_b: b.entity,
            contact_normal,
            penetration_depth,
        }
    })
}

const REST_VELOCITY_THRESHOLD: f32 = 0.5;
const DEFAULT_RESTITUTION: f32 = 0.3;
const DEFAULT_FRICTION: f32 = 0.5;

/// Coulomb friction: reduce tangential velocity proportional to the normal impulse,
/// never reversing the sliding direction.
fn apply_friction(vel: &mut Vec3, normal: Vec3, mu: f32, normal_impulse: f32, dt: f32) {
    let tangent_vel = *vel - vel.dot(normal) * normal;
    let tangent_speed = tangent_vel.length();
    if tangent_speed < 1e-6 {
        return;
    }
    let tangent_dir = tangent_vel / tangent_speed;
    let friction_impulse = (mu * normal_impulse * dt).min(tangent_speed);
    *vel -= tangent_dir * friction_impulse;
}

fn is_immovable(world: &World, entity: Entity) -> bool {
    world.get::<&Static>(entity).is_ok() || world.get::<&Kinematic>(entity).is_ok()
}

/// Push `entity` out along `push_dir` and cancel its velocity into the contact.
/// `push_dir` points away from the surface it hit.
fn resolve_against_immovable(world: &World, entity: Entity, push_dir: Vec3, depth: f32, e: f32, mu: f32, dt: f32) {
    if let Ok(mut local) = world.get::<&mut LocalTransform>(entity) {
        local.position += push_dir * depth;
    }
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        let into = vel.0.dot(push_dir);
        if into < 0.0 {
            let normal_impulse = if into.abs() < REST_VELOCITY_THRESHOLD {
                vel.0 -= into * push_dir;
                into.abs()
            } else {
                vel.0 -= (1.0 + e) * into * push_dir;
                (1.0 + e) * into.abs()
            };
            apply_friction(&mut vel.0, push_dir, mu, normal_impulse, dt);
        }
    }
}

/// Detect collisions between world bodies and apply impulse-based response.
///
/// Static and kinematic bodies are immovable. Disabled colliders are skipped.
/// The player is not a world body; it is resolved by the character controller.
pub fn collision_system(world: &mut World, dt: f32) -> Vec<CollisionEvent> {
    let entries: Vec<ColliderEntry> = world
        .query::<(&LocalTransform, &Collider)>()
        .without::<&ColliderDisabled>()
        .iter()
        .map(|(entity, (local, collider))| ColliderEntry {
            entity,
            position: local.position,
            shape: Shape::from_collider(collider),
        })
        .collect();

    // Broadphase: brute force O(n²)
    let mut events = Vec::new();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            if let Some(event) = test_pair(&entries[i], &entries[j]) {
                events.push(event);
            }
        }
    }

    let world: &World = world;
    for event in &events {
        if world.get::<&Trigger>(event.entity_a).is_ok() || world.get::<&Trigger>(event.entity_b).is_ok() {
            continue;
        }
        let a_fixed = is_immovable(world, event.entity_a);
        let b_fixed = is_immovable(world, event.entity_b);
        if a_fixed && b_fixed {
            continue;
        }

        let restitution = |entity| {
            world
                .get::<&Restitution>(entity)
                .map(|r| r.0)
                .unwrap_or(DEFAULT_RESTITUTION)
        };
        let friction = |entity| {
            world
                .get::<&Friction>(entity)
                .map(|f| f.0)
                .unwrap_or(DEFAULT_FRICTION)
        };
        let e = (restitution(event.entity_a) + restitution(event.entity_b)) * 0.5;
        let mu = (friction(event.entity_a) + friction(event.entity_b)) * 0.5;

        let n = event.contact_normal;
        let depth = event.penetration_depth;

        if a_fixed {
            resolve_against_immovable(world, event.entity_b, n, depth, e, mu, dt);
        } else if b_fixed {
            resolve_against_immovable(world, event.entity_a, -n, depth, e, mu, dt);
        } else {
            // Both dynamic: split the push 50/50.
            if let Ok(mut local) = world.get::<&mut LocalTransform>(event.entity_a) {
                local.position -= n * (depth * 0.5);
            }
            if let Ok(mut local) = world.get::<&mut LocalTransform>(event.entity_b) {
                local.position += n * (depth * 0.5);
            }

            let vel_a = world.get::<&Velocity>(event.entity_a).map(|v| v.0).unwrap_or(Vec3::ZERO);
            let vel_b = world.get::<&Velocity>(event.entity_b).map(|v| v.0).unwrap_or(Vec3::ZERO);
            let vel_along_n = (vel_a - vel_b).dot(n);

            // Positive = A approaching B
            if vel_along_n > 0.0 {
                let impulse = if vel_along_n < REST_VELOCITY_THRESHOLD {
                    vel_along_n * 0.5
                } else {
                    (1.0 + e) * vel_along_n * 0.5
                };
                if let Ok(mut vel) = world.get::<&mut Velocity>(event.entity_a) {
                    vel.0 -= impulse * n;
                    apply_friction(&mut vel.0, n, mu, impulse, dt);
                }
                if let Ok(mut vel) = world.get::<&mut Velocity>(event.entity_b) {
                    vel.0 += impulse * n;
                    apply_friction(&mut vel.0, n, mu, impulse, dt);
                }
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_resting_on_plane_is_pushed_out() {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            Static,
        ));
        let ball = world.spawn((
            LocalTransform::new(Vec3::new(0.0, 0.4, 0.0)),
            Collider::Sphere { radius: 0.5 },
            Velocity(Vec3::new(0.0, -3.0, 0.0)),
        ));

        let events = collision_system(&mut world, 1.0 / 60.0);
        assert_eq!(events.len(), 1);

        let pos = world.get::<&LocalTransform>(ball).unwrap().position;
        assert!((pos.y - 0.5).abs() < 1e-5);
        let vel = world.get::<&Velocity>(ball).unwrap().0;
        assert!(vel.y > 0.0, "bounced: {:?}", vel);
    }

    #[test]
    fn normals_point_from_a_to_b_for_mirrored_pairs() {
        let plane = Shape::Plane { normal: Vec3::Y, offset: 0.0 };
        let sphere = Shape::Sphere { radius: 1.0 };
        let (n, depth) = contact(Vec3::ZERO, plane, Vec3::new(0.0, 0.5, 0.0), sphere).unwrap();
        assert_eq!(n, Vec3::Y);
        assert!((depth - 0.5).abs() < 1e-6);
        let (n, _) = contact(Vec3::new(0.0, 0.5, 0.0), sphere, Vec3::ZERO, plane).unwrap();
        assert_eq!(n, -Vec3::Y);
    }

    #[test]
    fn sphere_against_box_side() {
        let (n, depth) = round_vs_box(
            Vec3::new(-1.3, 0.0, 0.0),
            0.5,
            Vec3::ZERO,
            Vec3::splat(1.0),
        )
        .unwrap();
        assert!(n.distance(Vec3::X) < 1e-5);
        assert!((depth - 0.2).abs() < 1e-5);
        assert!(round_vs_box(Vec3::new(-2.0, 0.0, 0.0), 0.5, Vec3::ZERO, Vec3::ONE).is_none());
    }

    #[test]
    fn triggers_report_without_response() {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Collider::Box { half_extents: Vec3::new(1.0, 0.05, 1.0) },
            Static,
            Trigger,
        ));
        let ball = world.spawn((
            LocalTransform::new(Vec3::new(0.0, 0.2, 0.0)),
            Collider::Sphere { radius: 0.5 },
            Velocity(Vec3::new(0.0, -1.0, 0.0)),
        ));
        let events = collision_system(&mut world, 1.0 / 60.0);
        assert_eq!(events.len(), 1);
        assert_eq!(world.get::<&LocalTransform>(ball).unwrap().position.y, 0.2);
        assert_eq!(world.get::<&Velocity>(ball).unwrap().0.y, -1.0);
    }

    #[test]
    fn kinematic_bodies_are_not_pushed() {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            Static,
        ));
        let held = world.spawn((
            LocalTransform::new(Vec3::new(0.0, 0.1, 0.0)),
            Collider::Sphere { radius: 0.5 },
            Kinematic,
        ));
        let disabled = world.spawn((
            LocalTransform::new(Vec3::new(3.0, 0.1, 0.0)),
            Collider::Sphere { radius: 0.5 },
            ColliderDisabled,
        ));
        collision_system(&mut world, 1.0 / 60.0);
        assert_eq!(world.get::<&LocalTransform>(held).unwrap().position.y, 0.1);
        assert_eq!(world.get::<&LocalTransform>(disabled).unwrap().position.y, 0.1);
    }
}
