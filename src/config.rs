//! Top-level game configuration.
//!
//! Every section falls back to its defaults when absent, so a config file only
//! needs the tunables it changes:
//!
//! ```json
//! { "vehicle": { "motor_force": 80 }, "road": { "path": { "seed": 7 } } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::physics::PhysicsConfig;
use crate::road::RoadManagerConfig;
use crate::terrain::TerrainConfig;
use crate::vehicle::VehicleConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub terrain: TerrainConfig,
    pub vehicle: VehicleConfig,
    pub road: RoadManagerConfig,
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.terrain.validate()?;
        self.vehicle.validate()?;
        self.road.validate()
    }
}
