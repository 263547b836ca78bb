// ==============================================================================
// manager.rs — SINGLE-FLIGHT, CANCELLABLE ROAD GENERATION DRIVER
// ------------------------------------------------------------------------------
// generate():
// - claims the `generating` flag (a second caller gets AlreadyGenerating)
// - builds a fresh RoadPathGenerator and drives it in batches of
//   `batch_size` work units, yielding to the runtime between batches
// - checks the cancel token before every batch
// - on Done, meshes the walked points into the drivable strip
// A cancel made while idle is discarded when the next run claims the flag.
// The flag (and any pending cancel) is released when generate() returns,
// however it returns.
// ==============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::debug_builders::DebugSink;
use crate::error::{ConfigError, RoadError};
use crate::mesh::TriangleMesh;
use crate::road::mesh::{build_road_mesh, RoadMeshConfig};
use crate::road::path::{GenerationStatus, RoadConfig, RoadPath, RoadPathGenerator};
use crate::terrain::HeightSampler;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadManagerConfig {
    pub path: RoadConfig,
    pub mesh: RoadMeshConfig,
    pub batch_size: usize,              // work units between yields
}

impl Default for RoadManagerConfig {
    fn default() -> Self {
        Self {
            path: RoadConfig::default(),
            mesh: RoadMeshConfig::default(),
            batch_size: 64,
        }
    }
}

impl RoadManagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.path.validate()?;
        self.mesh.validate()?;
        if self.batch_size == 0 {
            return Err(ConfigError::NonPositive { field: "road.batch_size", value: 0.0 });
        }
        Ok(())
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct RoadBuild {
    pub path: RoadPath,
    pub mesh: TriangleMesh,
}

pub struct RoadManager {
    config: RoadManagerConfig,
    terrain: Arc<dyn HeightSampler>,
    generating: AtomicBool,
    cancel: CancelToken,
}

/// Releases the single-flight flag and clears any cancel request on drop.
struct InFlight<'a> {
    manager: &'a RoadManager,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.manager.cancel.reset();
        self.manager.generating.store(false, Ordering::SeqCst);
    }
}

impl RoadManager {
    pub fn new(config: RoadManagerConfig, terrain: Arc<dyn HeightSampler>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            terrain,
            generating: AtomicBool::new(false),
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &RoadManagerConfig {
        &self.config
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// Handle for aborting the in-flight generation from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request the in-flight generation to stop at its next checkpoint.
    /// Returns false (and does nothing) when nothing is running.
    pub fn cancel(&self) -> bool {
        if !self.is_generating() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub async fn generate<D: DebugSink>(&self, debug: &mut D) -> Result<RoadBuild, RoadError> {
        if self
            .generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("road generation requested while one is in flight");
            return Err(RoadError::AlreadyGenerating);
        }
        let _in_flight = InFlight { manager: self };
        // a token may have been tripped while idle; only cancels made during this run count
        self.cancel.reset();

        let mut generator = RoadPathGenerator::new(self.config.path.clone(), Arc::clone(&self.terrain))
            .map_err(|e| RoadError::InvalidConfig(e.to_string()))?;

        info!(anchors = self.config.path.num_points, iterations = self.config.path.iterations, "road generation started");
        let mut batches = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                info!(batches, "road generation cancelled");
                return Err(RoadError::Cancelled);
            }

            match generator.step(self.config.batch_size, debug)? {
                GenerationStatus::Done(path) => {
                    let mesh = build_road_mesh(&path.points, &self.config.mesh);
                    info!(batches, points = path.points.len(), triangles = mesh.triangle_count(), "road generation finished");
                    return Ok(RoadBuild { path, mesh });
                }
                GenerationStatus::Pending => {
                    batches += 1;
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
