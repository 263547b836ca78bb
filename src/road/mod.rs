//! Procedural road: a relaxed anchor loop over the terrain, a walked dense
//! trail between the anchors, and the drivable strip mesh built from it.

pub mod manager;
pub mod mesh;
pub mod path;
pub mod walker;

pub use manager::{CancelToken, RoadBuild, RoadManager, RoadManagerConfig};
pub use mesh::{build_road_mesh, RoadMeshConfig};
pub use path::{GenerationStatus, Phase, RoadAnchor, RoadConfig, RoadPath, RoadPathGenerator};
pub use walker::{RoadWalker, StepOutcome, WalkerConfig};
