use glam::Vec3;
use hecs::Entity;

/// Linear velocity in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

/// Angular velocity in radians per second (axis * speed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin(pub Vec3);

/// Entity mass in kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mass(pub f32);

/// Marker: entity is affected by gravity.
pub struct GravityAffected;

/// Marker: entity is moved by gameplay code, not integrated by the physics step.
pub struct Kinematic;

/// Marker: collider is ignored by collision response and world queries.
pub struct ColliderDisabled;

/// Collision shape attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Sphere { radius: f32 },
    Capsule { radius: f32, height: f32 },
    Plane { normal: Vec3, offset: f32 },
    Box { half_extents: Vec3 },
}

/// Marker: entity is immovable (infinite mass for collision response).
pub struct Static;

/// Marker: contacts are reported but never resolved.
pub struct Trigger;

/// Restitution coefficient (bounciness). 0.0 = no bounce, 1.0 = perfect bounce.
pub struct Restitution(pub f32);

/// Surface friction coefficient. Higher values = more friction. 0.0 = ice, 1.0 = rubber.
/// Combined between contact pairs by averaging.
pub struct Friction(pub f32);

/// Velocity damping factor (air resistance / drag). Applied as vel *= (1 - drag * dt) each step.
pub struct Drag(pub f32);

/// Collision contact produced by the detection phase.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    pub entity_a: Entity,
    pub entity_b: Entity,
    /// Points from `entity_a` toward `entity_b`.
    pub contact_normal: Vec3,
    pub penetration_depth: f32,
}
