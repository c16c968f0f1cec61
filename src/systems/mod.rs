pub mod absorb;
mod ballistics;
mod collision;
mod controller;
mod forces;
mod physics;
mod projectile;
mod raycast;

pub use ballistics::{ballistic_position, solve_ballistic_velocity};
pub use collision::collision_system;
pub use controller::{CharacterController, CollisionFlags, KinematicController};
pub use forces::{smooth_damp, ForceIntegrator};
pub use physics::{physics_step, GRAVITY, PHYSICS_DT};
pub use projectile::{projectile_system, ProjectileOutcome};
pub use raycast::{ColliderQueries, PhysicsQueries, RayHit};
