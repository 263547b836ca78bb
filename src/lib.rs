//! Arcade driving core: raycast-wheel vehicles on procedural noise terrain,
//! with a procedurally walked road, simulated on rapier3d.

pub mod body;
pub mod config;
pub mod curve;
pub mod debug_builders;
pub mod error;
pub mod math;
pub mod mesh;
pub mod physics;
pub mod road;
pub mod state;
pub mod terrain;
pub mod vehicle;
pub mod wheel;

pub use config::GameConfig;
pub use error::{ConfigError, RoadError};
pub use physics::PhysicsWorld;
