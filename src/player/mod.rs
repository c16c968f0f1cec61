//! The player's ability state machine and the context its states share.

pub mod movement;
pub mod states;

use glam::{Quat, Vec3};
use hecs::World;

use crate::camera::Camera;
use crate::config::{AbilityConfig, ConfigError};
use crate::engine::input::{InputBus, InputEvent, InputState};
use crate::fsm::{EntryRefused, FsmError, State, StateKind, StateMachine};
use crate::systems::{
    CharacterController, ColliderQueries, ForceIntegrator, KinematicController, PhysicsQueries,
};

use std::fmt;

use states::{AimState, FreeLookState, GrappleState, HoverState, SwimState, VacuumState, WhipState};

// ---------------------------------------------------------------------------
// Kinds and shared data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AbilityKind {
    #[default]
    FreeLook,
    Aim,
    Hover,
    Swim,
    Grapple,
    Whip,
    Vacuum,
}

impl StateKind for AbilityKind {
    const ALL: &'static [Self] = &[
        AbilityKind::FreeLook,
        AbilityKind::Aim,
        AbilityKind::Hover,
        AbilityKind::Swim,
        AbilityKind::Grapple,
        AbilityKind::Whip,
        AbilityKind::Vacuum,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Orientation and progression of the player's body. Position lives on the
/// character controller.
#[derive(Debug, Clone)]
pub struct PlayerBody {
    /// Body forward is `rotation * Z`.
    pub rotation: Quat,
    /// Grapple and whip.
    pub green_unlocked: bool,
    pub vacuum_unlocked: bool,
}

impl PlayerBody {
    pub fn new(rotation: Quat) -> Self {
        Self {
            rotation,
            green_unlocked: true,
            vacuum_unlocked: true,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Forward with the vertical part removed, or `fallback` when the body
    /// faces straight up or down.
    pub fn flat_forward_or(&self, fallback: Vec3) -> Vec3 {
        let forward = self.forward();
        let flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        if flat == Vec3::ZERO {
            fallback
        } else {
            flat
        }
    }
}

/// Where the reticle sits on the aimed-at surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reticle {
    pub point: Vec3,
    pub normal: Vec3,
    /// `rotation * Z` is the surface normal.
    pub rotation: Quat,
    pub scale: f32,
    pub distance: f32,
}

/// A rope or whip line to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rope {
    /// Player-side end.
    pub origin: Vec3,
    pub end: Vec3,
}

/// What the rendering side reads back each step.
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    pub ability: AbilityKind,
    pub reticle: Option<Reticle>,
    pub rope: Option<Rope>,
}

/// Everything a state may touch during one call. Built fresh by the driver
/// for every `enter`/`tick`/`exit`/`on_event`.
pub struct PlayerContext<'a> {
    pub world: &'a mut World,
    pub physics: &'a dyn PhysicsQueries,
    pub controller: &'a mut dyn CharacterController,
    pub forces: &'a mut ForceIntegrator,
    pub body: &'a mut PlayerBody,
    pub input: &'a InputState,
    pub camera: &'a Camera,
    pub config: &'a AbilityConfig,
    pub bus: &'a InputBus,
    pub presentation: &'a mut Presentation,
    /// Simulation time in seconds.
    pub time: f32,
}

// ---------------------------------------------------------------------------
// State dispatch
// ---------------------------------------------------------------------------

pub enum AbilityState {
    FreeLook(FreeLookState),
    Aim(AimState),
    Hover(HoverState),
    Swim(SwimState),
    Grapple(GrappleState),
    Whip(WhipState),
    Vacuum(VacuumState),
}

macro_rules! each_state {
    ($value:expr, $state:ident => $body:expr) => {
        match $value {
            AbilityState::FreeLook($state) => $body,
            AbilityState::Aim($state) => $body,
            AbilityState::Hover($state) => $body,
            AbilityState::Swim($state) => $body,
            AbilityState::Grapple($state) => $body,
            AbilityState::Whip($state) => $body,
            AbilityState::Vacuum($state) => $body,
        }
    };
}

impl AbilityState {
    /// One fresh instance of every state.
    pub fn all(config: &AbilityConfig) -> Vec<AbilityState> {
        vec![
            AbilityState::FreeLook(FreeLookState::default()),
            AbilityState::Aim(AimState::default()),
            AbilityState::Hover(HoverState::default()),
            AbilityState::Swim(SwimState::default()),
            AbilityState::Grapple(GrappleState::default()),
            AbilityState::Whip(WhipState::default()),
            AbilityState::Vacuum(VacuumState::new(config.vacuum.capacity)),
        ]
    }
}

impl State for AbilityState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        each_state!(self, s => s.kind())
    }

    fn can_enter(&self, ctx: &PlayerContext<'_>) -> bool {
        each_state!(self, s => s.can_enter(ctx))
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        each_state!(self, s => s.enter(ctx))
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        each_state!(self, s => s.tick(ctx, dt))
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        each_state!(self, s => s.exit(ctx))
    }

    fn on_event(&mut self, ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        each_state!(self, s => s.on_event(ctx, event))
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Why a [`Player`] could not be built or driven.
#[derive(Debug)]
pub enum PlayerError {
    Config(ConfigError),
    Fsm(FsmError),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Config(e) => write!(f, "{}", e),
            PlayerError::Fsm(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PlayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlayerError::Config(e) => Some(e),
            PlayerError::Fsm(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PlayerError {
    fn from(e: ConfigError) -> Self {
        PlayerError::Config(e)
    }
}

impl From<FsmError> for PlayerError {
    fn from(e: FsmError) -> Self {
        PlayerError::Fsm(e)
    }
}

/// Per-step inputs owned by the caller.
pub struct PlayerEnv<'a> {
    pub world: &'a mut World,
    pub input: &'a InputState,
    pub camera: &'a Camera,
    pub time: f32,
}

/// The player character: controller, force integrator, body and the ability
/// state machine driving them.
pub struct Player {
    fsm: StateMachine<AbilityState>,
    pub controller: KinematicController,
    pub forces: ForceIntegrator,
    pub body: PlayerBody,
    pub presentation: Presentation,
    config: AbilityConfig,
    bus: InputBus,
    queries: ColliderQueries,
}

impl Player {
    /// Build the player at `spawn`, facing down -Z, with every ability state
    /// registered. Call [`start`](Player::start) before the first tick.
    pub fn new(config: AbilityConfig, spawn: Vec3) -> Result<Self, PlayerError> {
        if let Err(e) = config.validate() {
            log::error!("[player] rejected config: {}", e);
            return Err(e.into());
        }
        let mut fsm = StateMachine::new(AbilityKind::FreeLook);
        for state in AbilityState::all(&config) {
            fsm.add_state(state)?;
        }
        Ok(Self {
            fsm,
            controller: KinematicController::new(spawn),
            forces: ForceIntegrator::new(&config.forces),
            body: PlayerBody::new(movement::look_rotation(Vec3::NEG_Z, Vec3::Y)),
            presentation: Presentation::default(),
            config,
            bus: InputBus::new(),
            queries: ColliderQueries,
        })
    }

    fn parts<'a>(&'a mut self, env: PlayerEnv<'a>) -> (&'a mut StateMachine<AbilityState>, PlayerContext<'a>) {
        let ctx = PlayerContext {
            world: env.world,
            physics: &self.queries,
            controller: &mut self.controller,
            forces: &mut self.forces,
            body: &mut self.body,
            input: env.input,
            camera: env.camera,
            config: &self.config,
            bus: &self.bus,
            presentation: &mut self.presentation,
            time: env.time,
        };
        (&mut self.fsm, ctx)
    }

    /// Enter the default state.
    pub fn start(&mut self, env: PlayerEnv<'_>) -> Result<(), FsmError> {
        let (fsm, mut ctx) = self.parts(env);
        fsm.switch_state(AbilityKind::FreeLook, &mut ctx)?;
        ctx.presentation.ability = AbilityKind::FreeLook;
        Ok(())
    }

    /// One simulation step: integrate forces, deliver subscribed input
    /// events, tick the active state, then close the controller step so its
    /// velocity reflects this step's movement.
    pub fn tick(&mut self, env: PlayerEnv<'_>, dt: f32) -> Result<(), FsmError> {
        let grounded = self.controller.is_grounded();
        self.forces.step(dt, grounded);

        let (fsm, mut ctx) = self.parts(env);
        let input = ctx.input;
        for event in &input.events {
            if ctx.bus.is_subscribed(*event) {
                fsm.dispatch(&mut ctx, event)?;
            }
        }
        fsm.tick(&mut ctx, dt)?;
        ctx.presentation.ability = fsm.active().unwrap_or_default();
        self.controller.finish_step(dt);
        Ok(())
    }

    /// Force a transition from outside the state machine (cutscenes, debug).
    pub fn switch_ability(&mut self, kind: AbilityKind, env: PlayerEnv<'_>) -> Result<(), FsmError> {
        let (fsm, mut ctx) = self.parts(env);
        fsm.switch_state(kind, &mut ctx)?;
        ctx.presentation.ability = fsm.active().unwrap_or_default();
        Ok(())
    }

    /// Exit the active state, returning every borrowed object to the world.
    pub fn shutdown(&mut self, env: PlayerEnv<'_>) {
        let (fsm, mut ctx) = self.parts(env);
        fsm.shutdown(&mut ctx);
    }

    pub fn ability_kind(&self) -> AbilityKind {
        self.fsm.active().unwrap_or_default()
    }

    pub fn time_in_ability(&self) -> f32 {
        self.fsm.elapsed
    }

    pub fn position(&self) -> Vec3 {
        self.controller.position()
    }

    pub fn config(&self) -> &AbilityConfig {
        &self.config
    }

    pub fn vacuum(&self) -> Option<&VacuumState> {
        match self.fsm.state(AbilityKind::Vacuum) {
            Some(AbilityState::Vacuum(state)) => Some(state),
            _ => None,
        }
    }

    pub fn grapple(&self) -> Option<&GrappleState> {
        match self.fsm.state(AbilityKind::Grapple) {
            Some(AbilityState::Grapple(state)) => Some(state),
            _ => None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}
