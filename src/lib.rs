//! Player ability state machine for a third-person action game: free look,
//! aiming, hover, ink swimming, grapple swing, whip and vacuum, driven by a
//! small kinematic physics layer on top of `hecs`.

pub mod camera;
pub mod components;
pub mod config;
pub mod engine;
pub mod fsm;
pub mod player;
pub mod scene;
pub mod systems;

#[cfg(test)]
mod testing;
