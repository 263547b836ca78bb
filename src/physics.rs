// ==============================================================================
// physics.rs — RAPIER WORLD BRIDGE
// ------------------------------------------------------------------------------
// Owns the rapier sets and drives one fixed tick:
// 1) stream terrain: queue chunk builds around the focus vehicle, insert every
//    finished chunk as a fixed trimesh collider
// 2) refresh the query pipeline so wheel rays see the new colliders
// 3) per vehicle: copy the rapier body into a RigidBodyState, run the wheel
//    pipeline against a BodyRayCaster, write velocities/pose back and hand the
//    accumulated force/torque to rapier
// 4) step the rapier pipeline (gravity, chassis contacts, integration)
// 5) safety: reset bodies that went non-finite or ran away
//
// Collision groups: terrain and road are GROUP_GROUND and only interact with
// GROUP_CHASSIS. Wheels are rays, not colliders.
// ==============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::body::{RayCaster, RayHit, RayQuery, RigidBodyState};
use crate::debug_builders::DebugOverlay;
use crate::error::{ensure_positive, ConfigError};
use crate::math::is_finite_vec;
use crate::mesh::TriangleMesh;
use crate::road::RoadBuild;
use crate::state::{DriverInput, ScriptedInput, Snapshot};
use crate::terrain::{ChunkConfig, ChunkIndex, ChunkStreamer, HeightField};
use crate::vehicle::{Vehicle, VehicleConfig};

pub const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
pub const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub dt: Real,                       // fixed step, seconds
    pub gravity: [f32; 3],
    pub linear_damping: Real,           // chassis drag
    pub angular_damping: Real,          // chassis rotational drag
    pub spawn_height: Real,             // drop height above the terrain
    pub runaway_limit: Real,            // |coordinate| beyond this resets the body
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: [0.0, -9.81, 0.0],
            linear_damping: 0.05,
            angular_damping: 0.5,
            spawn_height: 2.0,
            runaway_limit: 1_000.0,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("physics.dt", self.dt)?;
        ensure_positive("physics.runaway_limit", self.runaway_limit)?;
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::NonPositive { field: "physics.gravity", value: f32::NAN });
        }
        Ok(())
    }
}

/// Scene ray queries for one vehicle, excluding its own chassis.
pub struct BodyRayCaster<'a> {
    pub query_pipeline: &'a QueryPipeline,
    pub bodies: &'a RigidBodySet,
    pub colliders: &'a ColliderSet,
    pub exclude: RigidBodyHandle,
}

impl RayCaster for BodyRayCaster<'_> {
    fn cast_ray(&self, query: &RayQuery) -> Option<RayHit> {
        let ray = Ray::new(query.origin, query.dir);
        let mask = Group::from_bits_truncate(query.collision_mask);
        let filter = QueryFilter::default()
            .exclude_rigid_body(self.exclude)
            .groups(InteractionGroups::new(GROUP_CHASSIS, mask));

        self.query_pipeline
            .cast_ray_and_get_normal(self.bodies, self.colliders, &ray, query.max_distance, true, filter)
            .map(|(_, hit)| RayHit {
                point: ray.point_at(hit.time_of_impact),
                normal: hit.normal,
            })
    }
}

/// Copy a rapier body into the wheel-facing state.
fn read_body(rb: &RigidBody, dt: Real) -> RigidBodyState {
    let mprops = &rb.mass_properties().local_mprops;
    RigidBodyState {
        position: *rb.position(),
        local_com: mprops.local_com,
        linvel: *rb.linvel(),
        angvel: *rb.angvel(),
        dt,
        inv_mass: mprops.inv_mass,
        inv_inertia_local: mprops.reconstruct_inverse_inertia_matrix(),
        force: Vector::zeros(),
        torque: Vector::zeros(),
    }
}

/// Write the wheel results back. Returns false (and leaves the body alone)
/// when the wheels produced a non-finite state.
fn write_body(rb: &mut RigidBody, state: &RigidBodyState) -> bool {
    if !state.is_finite() {
        return false;
    }
    rb.set_position(state.position, true);
    rb.set_linvel(state.linvel, true);
    rb.set_angvel(state.angvel, true);

    // rapier keeps user forces until reset
    rb.reset_forces(true);
    rb.reset_torques(true);
    rb.add_force(state.force, true);
    rb.add_torque(state.torque, true);
    true
}

fn trimesh_collider(mesh: &TriangleMesh) -> Option<Collider> {
    if mesh.is_empty() {
        warn!(vertices = mesh.vertices.len(), "skipped empty trimesh");
        return None;
    }
    Some(
        ColliderBuilder::trimesh(mesh.vertices.clone(), mesh.indices.clone())
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(0.0)
            .build(),
    )
}

pub struct VehicleEntry {
    pub vehicle: Vehicle,
    pub body: RigidBodyHandle,
    pub input: ScriptedInput,
    spawn: Point<Real>,             // where a runaway reset puts it back
}

pub struct PhysicsWorld {
    pub config: PhysicsConfig,
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for raycasting

    pub terrain: Arc<HeightField>, // analytic heights for spawning
    pub chunks: ChunkStreamer, // async terrain meshing
    pub chunk_colliders: HashMap<ChunkIndex, ColliderHandle>, // chunk → collider
    pub road_collider: Option<ColliderHandle>, // current road strip
    pub vehicles: Vec<VehicleEntry>, // id = index
    pub debug_overlay: DebugOverlay, // for debug visualization
    pub tick: u64,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig, terrain: Arc<HeightField>, chunks: ChunkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        chunks.validate()?;

        Ok(Self {
            gravity: config.gravity.into(),
            config,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            chunks: ChunkStreamer::new(Arc::clone(&terrain), chunks),
            terrain,
            chunk_colliders: HashMap::new(),
            road_collider: None,
            vehicles: Vec::new(),
            debug_overlay: DebugOverlay::default(),
            tick: 0,
        })
    }

    pub fn debug_snapshot(&self) -> DebugOverlay {
        self.debug_overlay.clone()
    }

    /// Spawn a vehicle `spawn_height` above the terrain at (x, z). Returns its id.
    pub fn spawn_vehicle(&mut self, config: VehicleConfig, x: Real, z: Real) -> Result<usize, ConfigError> {
        let vehicle = Vehicle::new(config)?;
        let cfg = &vehicle.config;
        let spawn = point![x, self.terrain.height(x, z) + self.config.spawn_height, z];

        let rb = RigidBodyBuilder::dynamic()
            .translation(spawn.coords)
            .linear_damping(self.config.linear_damping)
            .angular_damping(self.config.angular_damping)
            .ccd_enabled(true)
            .build();

        let [hx, hy, hz] = cfg.half_extents;
        let [cx, cy, cz] = cfg.com_offset;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .mass_properties(MassProperties::new(
                point![cx, cy, cz],
                cfg.mass,
                inertia_of_box(cfg.mass, hx, hy, hz),
            ))
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb); // insert rigid body
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies); // attach to body

        let id = self.vehicles.len();
        self.vehicles.push(VehicleEntry { vehicle, body: handle, input: ScriptedInput::new(), spawn });

        info!(id, ?spawn, body = ?handle, "spawned vehicle");
        Ok(id)
    }

    pub fn input_mut(&mut self, id: usize) -> Option<&mut ScriptedInput> {
        self.vehicles.get_mut(id).map(|e| &mut e.input)
    }

    pub fn vehicle(&self, id: usize) -> Option<&Vehicle> {
        self.vehicles.get(id).map(|e| &e.vehicle)
    }

    /// Replace the road strip collider with a freshly generated one.
    pub fn set_road(&mut self, road: &RoadBuild) -> bool {
        if let Some(old) = self.road_collider.take() {
            self.colliders.remove(old, &mut self.island_manager, &mut self.bodies, false);
        }
        let Some(collider) = trimesh_collider(&road.mesh) else {
            return false;
        };
        self.road_collider = Some(self.colliders.insert(collider));
        self.query_pipeline.update(&self.colliders);

        info!(points = road.path.points.len(), triangles = road.mesh.triangle_count(), "road collider installed");
        true
    }

    /// Queue chunk builds around the focus point and insert every chunk that
    /// has finished since the last call. Returns how many were inserted.
    pub fn stream_terrain(&mut self) -> usize {
        let focus = self
            .vehicles
            .first()
            .and_then(|e| self.bodies.get(e.body))
            .map(|rb| *rb.translation())
            .unwrap_or_else(Vector::zeros);
        self.chunks.request_visible(focus.x, focus.z);

        let mut inserted = 0;
        for (index, mesh) in self.chunks.drain_ready() {
            let Some(collider) = trimesh_collider(&mesh) else { continue };
            let handle = self.colliders.insert(collider);
            if let Some(old) = self.chunk_colliders.insert(index, handle) {
                self.colliders.remove(old, &mut self.island_manager, &mut self.bodies, false);
            }
            inserted += 1;
        }
        if inserted > 0 {
            self.query_pipeline.update(&self.colliders);
            debug!(inserted, total = self.chunk_colliders.len(), "terrain chunks inserted");
        }
        inserted
    }

    pub fn ray_caster(&self, exclude: RigidBodyHandle) -> BodyRayCaster<'_> {
        BodyRayCaster {
            query_pipeline: &self.query_pipeline,
            bodies: &self.bodies,
            colliders: &self.colliders,
            exclude,
        }
    }

    fn apply_vehicles(&mut self) {
        let dt = self.config.dt;
        let Self { vehicles, bodies, colliders, query_pipeline, debug_overlay, tick, .. } = self;

        for (id, entry) in vehicles.iter_mut().enumerate() {
            let Some(rb) = bodies.get(entry.body) else { continue };
            let mut state = read_body(rb, dt);

            {
                let rays = BodyRayCaster {
                    query_pipeline: &*query_pipeline,
                    bodies: &*bodies,
                    colliders: &*colliders,
                    exclude: entry.body,
                };
                let input = DriverInput::poll(&entry.input);
                entry.vehicle.update(&input, &mut state, &rays, &mut debug_overlay.lines);
            }
            entry.vehicle.push_debug(&state, debug_overlay);

            let Some(rb) = bodies.get_mut(entry.body) else { continue };
            if !write_body(rb, &state) {
                warn!(id, tick = *tick, "dropped non-finite wheel result");
            }
        }
    }

    fn reset_runaways(&mut self) {
        let limit = self.config.runaway_limit;
        for (id, entry) in self.vehicles.iter_mut().enumerate() {
            let Some(body) = self.bodies.get_mut(entry.body) else { continue };
            let pos = *body.translation();

            let bad = !is_finite_vec(&pos) || pos.iter().any(|c| c.abs() > limit);
            if bad {
                // back to where it spawned, at rest
                body.set_position(Isometry::translation(entry.spawn.x, entry.spawn.y, entry.spawn.z), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                body.reset_forces(true);
                body.reset_torques(true);

                warn!(id, ?pos, spawn = ?entry.spawn, "reset runaway body");
            }
        }
    }

    pub fn step(&mut self) {
        self.debug_overlay.clear();

        let hooks = ();
        let mut events = ();

        // 1) Terrain colliders that finished meshing
        self.stream_terrain();

        // 2) Wheel rays see this tick's scene
        self.query_pipeline.update(&self.colliders);

        // 3) Driver input → wheel forces
        self.apply_vehicles();

        // 4) Step physics.
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt: self.config.dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &mut events,
            &hooks,
        );

        // 5) Safety: prevent bodies from exploding to insane coordinates
        self.reset_runaways();

        // mirror the integrated pose
        for entry in &mut self.vehicles {
            if let Some(rb) = self.bodies.get(entry.body) {
                entry.vehicle.read_back(&read_body(rb, self.config.dt));
            }
        }
        self.tick += 1;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            vehicles: self.vehicles.iter().enumerate().map(|(id, e)| e.vehicle.snapshot(id)).collect(),
            terrain_chunks: self.chunk_colliders.len(),
            road_ready: self.road_collider.is_some(),
        }
    }
}

/// Principal inertia of a solid box, matching RigidBodyState::new.
fn inertia_of_box(mass: Real, hx: Real, hy: Real, hz: Real) -> Vector<Real> {
    let (x2, y2, z2) = ((2.0 * hx).powi(2), (2.0 * hy).powi(2), (2.0 * hz).powi(2));
    let k = mass / 12.0;
    vector![k * (y2 + z2), k * (x2 + z2), k * (x2 + y2)]
}
