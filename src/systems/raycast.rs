use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{Collider, ColliderDisabled, Layer, LayerMask, LocalTransform};

use super::collision::closest_point_on_segment;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Spatial queries the ability states consume. The world is passed in on
/// every call so implementations hold no borrows.
pub trait PhysicsQueries {
    /// Every entity whose collider intersects the sphere.
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Entity>;

    /// Nearest hit along the ray within `max_distance`.
    fn raycast(
        &self,
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Nearest hit of a sphere swept along the ray.
    fn sphere_cast(
        &self,
        world: &World,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// True if anything on `mask` lies strictly between `from` and `to`.
    fn is_blocked(&self, world: &World, from: Vec3, to: Vec3, mask: LayerMask) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance < 1e-4 {
            return false;
        }
        self.raycast(world, from, delta / distance, distance, mask).is_some()
    }
}

/// Queries answered from the `Collider` components in the world.
/// Entities tagged `ColliderDisabled` are invisible to every query.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColliderQueries;

fn layer_of(layer: Option<&Layer>) -> LayerMask {
    layer.map_or(LayerMask::DEFAULT, |l| l.0)
}

impl ColliderQueries {
    fn cast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        inflate: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let mut best: Option<RayHit> = None;

        for (entity, (local, collider, layer)) in world
            .query::<(&LocalTransform, &Collider, Option<&Layer>)>()
            .without::<&ColliderDisabled>()
            .iter()
        {
            if !layer_of(layer).intersects(mask) {
                continue;
            }
            let center = local.position;

            let hit = match collider {
                Collider::Sphere { radius } => {
                    ray_sphere_intersection(origin, dir, center, radius + inflate)
                        .map(|t| (t, (origin + dir * t - center).normalize_or_zero()))
                }
                Collider::Capsule { radius, height } => {
                    ray_capsule_intersection(origin, dir, center, radius + inflate, *height).map(|t| {
                        let p = origin + dir * t;
                        let half = Vec3::Y * (height * 0.5);
                        let axis = closest_point_on_segment(center - half, center + half, p);
                        (t, (p - axis).normalize_or_zero())
                    })
                }
                Collider::Box { half_extents } => {
                    let half = *half_extents + Vec3::splat(inflate);
                    ray_aabb_intersection(origin, dir, center, half)
                        .map(|t| (t, aabb_face_normal(origin + dir * t, center, half)))
                }
                Collider::Plane { normal, offset } => {
                    ray_plane_intersection(origin, dir, *normal, offset + inflate)
                }
            };

            if let Some((t, normal)) = hit {
                if t > 0.0 && t <= max_distance {
                    let is_closer = best.as_ref().map_or(true, |b| t < b.distance);
                    if is_closer {
                        best = Some(RayHit {
                            entity,
                            distance: t,
                            point: origin + dir * t - normal * inflate,
                            normal,
                        });
                    }
                }
            }
        }

        best
    }
}

impl PhysicsQueries for ColliderQueries {
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Entity> {
        world
            .query::<(&LocalTransform, &Collider, Option<&Layer>)>()
            .without::<&ColliderDisabled>()
            .iter()
            .filter(|(_, (_, _, layer))| layer_of(*layer).intersects(mask))
            .filter(|(_, (local, collider, _))| sphere_overlaps(center, radius, local.position, collider))
            .map(|(entity, _)| entity)
            .collect()
    }

    fn raycast(
        &self,
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        Self::cast(world, origin, direction, 0.0, max_distance, mask)
    }

    fn sphere_cast(
        &self,
        world: &World,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        Self::cast(world, origin, direction, radius.max(0.0), max_distance, mask)
    }
}

fn sphere_overlaps(center: Vec3, radius: f32, position: Vec3, collider: &Collider) -> bool {
    match collider {
        Collider::Sphere { radius: r } => center.distance(position) <= radius + r,
        Collider::Capsule { radius: r, height } => {
            let half = Vec3::Y * (height * 0.5);
            let axis = closest_point_on_segment(position - half, position + half, center);
            center.distance(axis) <= radius + r
        }
        Collider::Box { half_extents } => {
            let closest = center.clamp(position - *half_extents, position + *half_extents);
            center.distance(closest) <= radius
        }
        Collider::Plane { normal, offset } => center.dot(*normal) - offset <= radius,
    }
}

pub(crate) fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let a = dir.dot(dir);
    let b = 2.0 * oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);

    if t1 > 0.0 {
        Some(t1)
    } else if t2 > 0.0 {
        Some(t2)
    } else {
        None
    }
}

fn ray_capsule_intersection(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    radius: f32,
    height: f32,
) -> Option<f32> {
    let half_h = height * 0.5;
    let top = center + Vec3::Y * half_h;
    let bottom = center - Vec3::Y * half_h;

    // Hemisphere centres plus the middle, as spheres.
    let t_top = ray_sphere_intersection(origin, dir, top, radius);
    let t_bottom = ray_sphere_intersection(origin, dir, bottom, radius);
    let t_center = ray_sphere_intersection(origin, dir, center, radius);

    [t_top, t_bottom, t_center]
        .iter()
        .filter_map(|t| *t)
        .filter(|t| *t > 0.0)
        .reduce(f32::min)
}

fn ray_aabb_intersection(origin: Vec3, dir: Vec3, center: Vec3, half: Vec3) -> Option<f32> {
    let min = center - half;
    let max = center + half;
    let inv_dir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);

    let t1 = (min.x - origin.x) * inv_dir.x;
    let t2 = (max.x - origin.x) * inv_dir.x;
    let t3 = (min.y - origin.y) * inv_dir.y;
    let t4 = (max.y - origin.y) * inv_dir.y;
    let t5 = (min.z - origin.z) * inv_dir.z;
    let t6 = (max.z - origin.z) * inv_dir.z;

    let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
    let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

    if tmax < 0.0 || tmin > tmax {
        return None;
    }
    // Ray starts inside the box: report the exit.
    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Outward normal of the box face nearest to `point`.
fn aabb_face_normal(point: Vec3, center: Vec3, half: Vec3) -> Vec3 {
    let local = (point - center) / half.max(Vec3::splat(1e-6));
    let abs = local.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::X * local.x.signum()
    } else if abs.y >= abs.z {
        Vec3::Y * local.y.signum()
    } else {
        Vec3::Z * local.z.signum()
    }
}

/// Two-sided plane hit. The returned normal faces the ray origin.
fn ray_plane_intersection(origin: Vec3, dir: Vec3, normal: Vec3, offset: f32) -> Option<(f32, Vec3)> {
    let denom = normal.dot(dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (offset - normal.dot(origin)) / denom;
    if t <= 0.0 {
        return None;
    }
    let facing = if denom > 0.0 { -normal } else { normal };
    Some((t, facing))
}
