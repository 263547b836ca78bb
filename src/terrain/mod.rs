//! Procedural terrain: the noise height field and chunked collision meshes.

pub mod chunks;
pub mod height_field;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use chunks::{build_chunk_mesh, ChunkConfig, ChunkIndex, ChunkStreamer};
pub use height_field::{FractalNoise, HeightField, HeightFieldConfig, HeightSample, HeightSampler, NoiseLayer};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub field: HeightFieldConfig,
    pub chunks: ChunkConfig,
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.field.validate()?;
        self.chunks.validate()
    }
}
