//! One module per ability. Each state owns its transient data and talks to
//! the rest of the game only through [`PlayerContext`](super::PlayerContext).

mod aim;
mod free_look;
pub mod grapple;
mod hover;
pub mod swim;
mod vacuum;
pub mod whip;

pub use aim::{solve_reticle, AimState};
pub use free_look::FreeLookState;
pub use grapple::{GrappleState, Pendulum, SwingPhase};
pub use hover::HoverState;
pub use swim::SwimState;
pub use vacuum::{Inventory, VacuumState};
pub use whip::{WhipPhase, WhipState};
