use glam::Vec3;
use hecs::World;

use crate::components::{Collider, ColliderDisabled, Layer, LayerMask, LocalTransform, Static};

use super::collision::capsule_contact;

/// Which sides of the capsule touched something during one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionFlags(pub u8);

impl CollisionFlags {
    pub const NONE: Self = Self(0);
    pub const SIDES: Self = Self(1 << 0);
    pub const ABOVE: Self = Self(1 << 1);
    pub const BELOW: Self = Self(1 << 2);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }
}

impl std::ops::BitOr for CollisionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CollisionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The character body the ability states drive. Collision-resolved movement
/// plus the tunable capsule shape.
pub trait CharacterController {
    /// Move by `motion` (already scaled by dt), sliding along whatever blocks.
    fn move_by(&mut self, world: &World, motion: Vec3) -> CollisionFlags;

    /// Feet position.
    fn position(&self) -> Vec3;

    /// Teleport without collision.
    fn set_position(&mut self, position: Vec3);

    /// Whether the most recent move touched ground.
    fn is_grounded(&self) -> bool;

    /// Displacement over the previous simulation step divided by its duration.
    fn velocity(&self) -> Vec3;

    fn height(&self) -> f32;
    fn set_height(&mut self, height: f32);

    fn radius(&self) -> f32;

    /// Capsule centre relative to the feet position.
    fn center(&self) -> Vec3;
    fn set_center(&mut self, center: Vec3);
}

/// Surfaces steeper than this (normal.y below it) count as walls.
const GROUND_NORMAL_Y: f32 = 0.7;
const MAX_ITERATIONS: usize = 4;

/// Upright capsule resolved against `Static` colliders on a blocking mask.
#[derive(Debug, Clone)]
pub struct KinematicController {
    position: Vec3,
    center: Vec3,
    height: f32,
    radius: f32,
    grounded: bool,
    velocity: Vec3,
    step_start: Vec3,
    blocking: LayerMask,
}

impl KinematicController {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            center: Vec3::new(0.0, 1.0, 0.0),
            height: 2.0,
            radius: 0.4,
            grounded: false,
            velocity: Vec3::ZERO,
            step_start: position,
            blocking: LayerMask::MASK_SOLID,
        }
    }

    /// Close the simulation step: derive velocity from the net displacement.
    pub fn finish_step(&mut self, dt: f32) {
        if dt > 0.0 {
            self.velocity = (self.position - self.step_start) / dt;
        }
        self.step_start = self.position;
    }

    fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }

    /// Push the capsule out of every overlapping blocker. Returns the flags
    /// for the contacts found.
    fn depenetrate(&mut self, world: &World) -> CollisionFlags {
        let mut flags = CollisionFlags::NONE;
        for _ in 0..MAX_ITERATIONS {
            let center = self.position + self.center;
            let mut deepest: Option<(Vec3, f32)> = None;
            for (_, (local, collider, layer)) in world
                .query::<(&LocalTransform, &Collider, Option<&Layer>)>()
                .with::<&Static>()
                .without::<&ColliderDisabled>()
                .iter()
            {
                let layer = layer.map_or(LayerMask::DEFAULT, |l| l.0);
                if !layer.intersects(self.blocking) {
                    continue;
                }
                if let Some((normal, depth)) =
                    capsule_contact(center, self.radius, self.half_segment(), local.position, collider)
                {
                    if deepest.map_or(true, |(_, d)| depth > d) {
                        deepest = Some((normal, depth));
                    }
                }
            }
            let Some((normal, depth)) = deepest else {
                break;
            };
            let push = -normal;
            self.position += push * depth;
            flags |= if push.y > GROUND_NORMAL_Y {
                CollisionFlags::BELOW
            } else if push.y < -GROUND_NORMAL_Y {
                CollisionFlags::ABOVE
            } else {
                CollisionFlags::SIDES
            };
        }
        flags
    }
}

impl CharacterController for KinematicController {
    fn move_by(&mut self, world: &World, motion: Vec3) -> CollisionFlags {
        if !motion.is_finite() {
            log::warn!("[controller] ignoring non-finite motion {:?}", motion);
            return CollisionFlags::NONE;
        }
        self.position += motion;
        let flags = self.depenetrate(world);
        self.grounded = flags.contains(CollisionFlags::BELOW);
        flags
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn set_height(&mut self, height: f32) {
        self.height = height.max(0.0);
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn center(&self) -> Vec3 {
        self.center
    }

    fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_and_wall() -> World {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::ZERO),
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            Static,
            Layer(LayerMask::GROUND),
        ));
        world.spawn((
            LocalTransform::new(Vec3::new(3.0, 2.0, 0.0)),
            Collider::Box { half_extents: Vec3::new(0.5, 2.0, 5.0) },
            Static,
        ));
        world.spawn((
            LocalTransform::new(Vec3::new(0.0, 0.0, 3.0)),
            Collider::Sphere { radius: 1.0 },
            Static,
            Layer(LayerMask::INK),
        ));
        world
    }

    #[test]
    fn falling_into_floor_lands_and_grounds() {
        let world = floor_and_wall();
        let mut cc = KinematicController::new(Vec3::new(0.0, 0.05, 0.0));
        let flags = cc.move_by(&world, Vec3::new(0.0, -0.2, 0.0));
        assert!(flags.contains(CollisionFlags::BELOW));
        assert!(cc.is_grounded());
        assert!(cc.position().y.abs() < 1e-4);
    }

    #[test]
    fn walking_into_wall_reports_sides() {
        let world = floor_and_wall();
        let mut cc = KinematicController::new(Vec3::new(2.0, 0.5, 0.0));
        let flags = cc.move_by(&world, Vec3::new(0.3, 0.0, 0.0));
        assert!(flags.contains(CollisionFlags::SIDES));
        assert!(!cc.is_grounded());
        assert!(cc.position().x <= 2.1 + 1e-4);
    }

    #[test]
    fn ceiling_reports_above() {
        let mut world = World::new();
        world.spawn((
            LocalTransform::new(Vec3::new(0.0, 2.5, 0.0)),
            Collider::Box { half_extents: Vec3::new(5.0, 0.25, 5.0) },
            Static,
        ));
        let mut cc = KinematicController::new(Vec3::ZERO);
        let flags = cc.move_by(&world, Vec3::new(0.0, 0.5, 0.0));
        assert!(flags.contains(CollisionFlags::ABOVE));
    }

    #[test]
    fn non_blocking_layers_are_passable() {
        let world = floor_and_wall();
        let mut cc = KinematicController::new(Vec3::new(0.0, 0.5, 2.0));
        let flags = cc.move_by(&world, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(flags, CollisionFlags::NONE);
        assert!((cc.position().z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn velocity_is_step_displacement() {
        let world = World::new();
        let mut cc = KinematicController::new(Vec3::ZERO);
        cc.move_by(&world, Vec3::new(0.1, 0.0, 0.0));
        cc.move_by(&world, Vec3::new(0.1, 0.0, 0.0));
        cc.finish_step(0.1);
        assert!(cc.velocity().distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-4);
        cc.finish_step(0.1);
        assert_eq!(cc.velocity(), Vec3::ZERO);
    }

    #[test]
    fn empty_flags_never_contain() {
        assert!(!CollisionFlags::NONE.contains(CollisionFlags::NONE));
        assert!((CollisionFlags::BELOW | CollisionFlags::SIDES).contains(CollisionFlags::SIDES));
    }
}
