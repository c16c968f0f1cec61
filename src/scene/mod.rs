pub mod arena;
pub mod prefabs;
pub mod scenario;
