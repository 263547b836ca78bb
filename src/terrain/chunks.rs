// ==============================================================================
// chunks.rs — TERRAIN CHUNK INDEXING + ASYNC MESH STREAMING
// ------------------------------------------------------------------------------
// The world is tiled into chunk_size[0] x chunk_size[1] cells on the XZ plane.
// Each frame the physics world asks for every chunk within view_radius of the
// focus point; missing chunks are meshed on blocking worker threads and come
// back over a channel. Until a chunk's mesh arrives it simply does not exist
// for ray casts; nothing waits on it.
// ==============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use rapier3d::prelude::{Point, Real};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::error::{ensure_positive, ConfigError};
use crate::mesh::TriangleMesh;
use crate::terrain::height_field::HeightField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkIndex {
    pub x: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub chunk_size: [f32; 2],   // world units along x, z
    pub view_radius: f32,       // chunks within this distance are kept meshed
    pub subdivision: u32,       // extra vertices per chunk edge
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: [256.0, 256.0],
            view_radius: 512.0,
            subdivision: 0,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("terrain.chunks.chunk_size.x", self.chunk_size[0])?;
        ensure_positive("terrain.chunks.chunk_size.z", self.chunk_size[1])?;
        if self.view_radius < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "terrain.chunks.view_radius",
                value: self.view_radius,
            });
        }
        Ok(())
    }

    pub fn chunk_index(&self, x: Real, z: Real) -> ChunkIndex {
        ChunkIndex {
            x: (x / self.chunk_size[0]).floor() as i32,
            z: (z / self.chunk_size[1]).floor() as i32,
        }
    }

    /// Every chunk index within `view_radius` (per axis, in whole chunks) of
    /// the chunk containing (x, z).
    pub fn visible_chunks(&self, x: Real, z: Real) -> Vec<ChunkIndex> {
        let center = self.chunk_index(x, z);
        let range_x = (self.view_radius / self.chunk_size[0]).ceil() as i32;
        let range_z = (self.view_radius / self.chunk_size[1]).ceil() as i32;

        let mut out = Vec::with_capacity(((2 * range_x + 1) * (2 * range_z + 1)) as usize);
        for dx in -range_x..=range_x {
            for dz in -range_z..=range_z {
                out.push(ChunkIndex { x: center.x + dx, z: center.z + dz });
            }
        }
        out
    }
}

/// Grid mesh of one chunk in world space, `2 + subdivision` vertices per edge.
pub fn build_chunk_mesh(field: &HeightField, index: ChunkIndex, config: &ChunkConfig) -> TriangleMesh {
    let [size_x, size_z] = config.chunk_size;
    let origin_x = index.x as Real * size_x;
    let origin_z = index.z as Real * size_z;
    let verts = 2 + config.subdivision as usize;
    let last = (verts - 1) as f32;

    let mut grid = Vec::with_capacity(verts * verts);
    for i in 0..verts {
        for j in 0..verts {
            let u = i as f32 / last;
            let v = j as f32 / last;
            let x = origin_x + u * size_x;
            let z = origin_z + v * size_z;
            grid.push((Point::new(x, field.height(x, z), z), [u, v]));
        }
    }

    let at = |i: usize, j: usize| grid[i * verts + j];
    let mut mesh = TriangleMesh::new();
    for i in 0..verts - 1 {
        for j in 0..verts - 1 {
            let (p00, uv00) = at(i, j);
            let (p10, uv10) = at(i + 1, j);
            let (p01, uv01) = at(i, j + 1);
            let (p11, uv11) = at(i + 1, j + 1);

            // counter-clockwise seen from above
            mesh.push_triangle([p00, p11, p10], [uv00, uv11, uv10]);
            mesh.push_triangle([p00, p01, p11], [uv00, uv01, uv11]);
        }
    }
    mesh.weld();
    mesh
}

/// Tracks which chunks have been requested and collects finished meshes.
pub struct ChunkStreamer {
    field: Arc<HeightField>,
    config: ChunkConfig,
    requested: HashSet<ChunkIndex>,
    tx: UnboundedSender<(ChunkIndex, TriangleMesh)>,
    rx: UnboundedReceiver<(ChunkIndex, TriangleMesh)>,
}

impl ChunkStreamer {
    pub fn new(field: Arc<HeightField>, config: ChunkConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        Self { field, config, requested: HashSet::new(), tx, rx }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn is_requested(&self, index: ChunkIndex) -> bool {
        self.requested.contains(&index)
    }

    /// Queue builds for every visible chunk not yet requested. Builds run on
    /// the tokio blocking pool when a runtime is present, inline otherwise.
    /// Returns how many new builds were started.
    pub fn request_visible(&mut self, x: Real, z: Real) -> usize {
        let mut started = 0;
        for index in self.config.visible_chunks(x, z) {
            if !self.requested.insert(index) {
                continue;
            }
            started += 1;

            let field = Arc::clone(&self.field);
            let config = self.config.clone();
            let tx = self.tx.clone();
            let build = move || {
                let mesh = build_chunk_mesh(&field, index, &config);
                // receiver gone means the world was dropped mid-build
                let _ = tx.send((index, mesh));
            };

            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(build);
                }
                Err(_) => build(),
            }
        }
        if started > 0 {
            debug!(started, total = self.requested.len(), "terrain chunk builds queued");
        }
        started
    }

    /// Meshes finished since the last call. Never blocks.
    pub fn drain_ready(&mut self) -> Vec<(ChunkIndex, TriangleMesh)> {
        let mut ready = Vec::new();
        while let Ok((index, mesh)) = self.rx.try_recv() {
            if mesh.is_empty() {
                warn!(?index, "terrain chunk produced an empty mesh");
                continue;
            }
            ready.push((index, mesh));
        }
        ready
    }
}
