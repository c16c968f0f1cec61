//! Shared fixtures for state tests: a flat world and every collaborator a
//! [`PlayerContext`] borrows.

use glam::Vec3;
use hecs::World;

use crate::camera::Camera;
use crate::config::AbilityConfig;
use crate::engine::input::{InputBus, InputState};
use crate::player::movement::look_rotation;
use crate::player::{PlayerBody, PlayerContext, Presentation};
use crate::scene::prefabs::spawn_ground;
use crate::systems::{ColliderQueries, ForceIntegrator, KinematicController};

/// Player standing at the origin on an infinite ground plane, facing -Z,
/// with the default camera behind it.
pub struct Rig {
    pub world: World,
    pub controller: KinematicController,
    pub forces: ForceIntegrator,
    pub body: PlayerBody,
    pub input: InputState,
    pub camera: Camera,
    pub config: AbilityConfig,
    pub bus: InputBus,
    pub presentation: Presentation,
    pub queries: ColliderQueries,
    pub time: f32,
}

impl Rig {
    pub fn new() -> Self {
        let mut world = World::new();
        spawn_ground(&mut world);
        let config = AbilityConfig::default();
        Self {
            world,
            controller: KinematicController::new(Vec3::ZERO),
            forces: ForceIntegrator::new(&config.forces),
            body: PlayerBody::new(look_rotation(Vec3::NEG_Z, Vec3::Y)),
            input: InputState::new(),
            camera: Camera::new(),
            config,
            bus: InputBus::new(),
            presentation: Presentation::default(),
            queries: ColliderQueries,
            time: 0.0,
        }
    }

    pub fn ctx(&mut self) -> PlayerContext<'_> {
        PlayerContext {
            world: &mut self.world,
            physics: &self.queries,
            controller: &mut self.controller,
            forces: &mut self.forces,
            body: &mut self.body,
            input: &self.input,
            camera: &self.camera,
            config: &self.config,
            bus: &self.bus,
            presentation: &mut self.presentation,
            time: self.time,
        }
    }
}
