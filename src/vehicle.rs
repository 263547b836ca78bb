// ==============================================================================
// vehicle.rs — VEHICLE CONFIG + DRIVER CONTROLLER
// ------------------------------------------------------------------------------
// Per tick:
// - steering: desired = steer * π clamped to ±max_steering_angle (degrees in
//   config), smoothed toward with factor 1 - exp(-steering_rate * dt)
// - motor: net = (accelerate ? motor_force : 0) - (reverse ? reverse_force : 0),
//   split evenly across motor wheels so the per-wheel torques sum to net
// - drift: every wheel's side friction multiplier is 0.5, otherwise 1.0
// - wheels update in array order against the shared body state
// - afterwards the vehicle mirrors the body's pose/velocities (read-back only)
// ==============================================================================

use std::f32::consts::PI;

use rapier3d::prelude::{Isometry, Real, Vector};
use serde::{Deserialize, Serialize};

use crate::body::{RayCaster, RigidBodyState};
use crate::debug_builders::{DebugChassis, DebugOverlay, DebugSink, DebugWheel};
use crate::error::{ensure_positive, ConfigError};
use crate::state::{DriverInput, InputSource, VehicleSnapshot};
use crate::wheel::{wheel_frame, Wheel, WheelConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub motor_force: Real,              // net forward drive, split across motor wheels
    pub reverse_force: Real,
    pub max_steering_angle: Real,       // degrees
    pub steering_rate: Real,            // 1/s, exponential smoothing rate

    // --- Chassis ---
    pub mass: Real,
    pub half_extents: [f32; 3],         // [hx, hy, hz]
    pub com_offset: [f32; 3],           // local centre of mass offset

    pub wheels: Vec<WheelConfig>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self::arcade()
    }
}

impl VehicleConfig {
    /// Light four-wheeler: front steering, rear drive.
    pub fn arcade() -> Self {
        Self {
            motor_force: 64.0,
            reverse_force: 32.0,
            max_steering_angle: 30.0,
            steering_rate: 8.0,
            mass: 4.0,
            half_extents: [0.9, 0.3, 1.8],
            com_offset: [0.0, -0.2, 0.0],
            wheels: vec![
                WheelConfig::at(0.9, -0.2, 1.4).steering(),     // FL
                WheelConfig::at(-0.9, -0.2, 1.4).steering(),    // FR
                WheelConfig::at(0.9, -0.2, -1.4).motor(),       // RL
                WheelConfig::at(-0.9, -0.2, -1.4).motor(),      // RR
            ],
        }
    }

    /// Heavier body, all-wheel drive, softer steering.
    pub fn truck() -> Self {
        let corner = |x: f32, z: f32| WheelConfig {
            spring_force: 160.0,
            radius: 0.4,
            ..WheelConfig::at(x, -0.3, z)
        }
        .motor();

        Self {
            motor_force: 96.0,
            reverse_force: 48.0,
            max_steering_angle: 22.0,
            steering_rate: 4.0,
            mass: 6.0,
            half_extents: [1.1, 0.5, 2.4],
            com_offset: [0.0, -0.3, 0.0],
            wheels: vec![
                corner(1.1, 1.8).steering(),
                corner(-1.1, 1.8).steering(),
                corner(1.1, -1.8),
                corner(-1.1, -1.8),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wheels.is_empty() {
            return Err(ConfigError::NoWheels);
        }
        ensure_positive("vehicle.mass", self.mass)?;
        ensure_positive("vehicle.steering_rate", self.steering_rate)?;
        ensure_positive("vehicle.half_extents.x", self.half_extents[0])?;
        ensure_positive("vehicle.half_extents.y", self.half_extents[1])?;
        ensure_positive("vehicle.half_extents.z", self.half_extents[2])?;
        for wheel in &self.wheels {
            wheel.validate()?;
        }
        Ok(())
    }

    #[inline]
    pub fn half_extents(&self) -> Vector<Real> {
        Vector::new(self.half_extents[0], self.half_extents[1], self.half_extents[2])
    }

    /// Headless body matching this chassis, at the origin.
    pub fn body_state(&self, dt: Real) -> RigidBodyState {
        let mut body = RigidBodyState::new(self.mass, self.half_extents(), dt);
        body.local_com = self.com_offset.into();
        body
    }
}

pub struct Vehicle {
    pub config: VehicleConfig,
    pub wheels: Vec<Wheel>,

    pub steering_angle: Real,       // smoothed, radians, positive = left
    pub drifting: bool,
    pub front_offset: Real,         // max wheel z
    pub rear_offset: Real,          // min wheel z

    // mirrored from the physics body after every update
    pub position: Isometry<Real>,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
}

impl Vehicle {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut wheels = config
            .wheels
            .iter()
            .cloned()
            .map(Wheel::new)
            .collect::<Result<Vec<_>, _>>()?;

        let zs = wheels.iter().map(|w| w.config.attach[2]);
        let front_offset = zs.clone().fold(Real::NEG_INFINITY, Real::max);
        let rear_offset = zs.fold(Real::INFINITY, Real::min);
        let wheelbase = front_offset - rear_offset;

        for wheel in wheels.iter_mut().filter(|w| w.config.steer) {
            wheel.state.wheelbase = wheelbase;
        }

        Ok(Self {
            config,
            wheels,
            steering_angle: 0.0,
            drifting: false,
            front_offset,
            rear_offset,
            position: Isometry::identity(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
        })
    }

    #[inline]
    pub fn wheelbase(&self) -> Real {
        self.front_offset - self.rear_offset
    }

    pub fn motor_wheel_count(&self) -> usize {
        self.wheels.iter().filter(|w| w.config.motor).count()
    }

    /// Net drive for this input, before the per-wheel split.
    pub fn net_torque(&self, input: &DriverInput) -> Real {
        let mut torque = 0.0;
        if input.accelerate {
            torque += self.config.motor_force;
        }
        if input.reverse {
            torque -= self.config.reverse_force;
        }
        torque
    }

    fn smooth_steering(&mut self, steer: Real, dt: Real) {
        let max = self.config.max_steering_angle.to_radians();
        let desired = (steer * PI).clamp(-max, max);
        let blend = 1.0 - (-self.config.steering_rate * dt).exp();
        self.steering_angle += (desired - self.steering_angle) * blend;
    }

    pub fn update(
        &mut self,
        input: &DriverInput,
        body: &mut RigidBodyState,
        rays: &dyn RayCaster,
        debug: &mut dyn DebugSink,
    ) {
        self.smooth_steering(input.steer, body.dt);
        self.drifting = input.drift;

        let motors = self.motor_wheel_count();
        let per_wheel = if motors > 0 { self.net_torque(input) / motors as Real } else { 0.0 };
        let side_multiply = if self.drifting { 0.5 } else { 1.0 };

        for wheel in &mut self.wheels {
            wheel.state.torque = if wheel.config.motor { per_wheel } else { 0.0 };
            if wheel.config.steer {
                wheel.state.steering_angle = self.steering_angle;
            }
            wheel.state.side_friction_multiply = side_multiply;
            wheel.update(body, rays, debug);
        }

        self.read_back(body);
    }

    pub fn update_from(
        &mut self,
        source: &dyn InputSource,
        body: &mut RigidBodyState,
        rays: &dyn RayCaster,
        debug: &mut dyn DebugSink,
    ) {
        let input = DriverInput::poll(source);
        self.update(&input, body, rays, debug);
    }

    pub fn read_back(&mut self, body: &RigidBodyState) {
        self.position = body.position;
        self.linvel = body.linvel;
        self.angvel = body.angvel;
    }

    /// Sum of the motor forces the wheels applied on the last update.
    pub fn applied_motor_force(&self) -> Vector<Real> {
        self.wheels.iter().map(|w| w.state.forces.motor).sum()
    }

    pub fn grounded_wheels(&self) -> usize {
        self.wheels.iter().filter(|w| w.state.colliding()).count()
    }

    pub fn snapshot(&self, id: usize) -> VehicleSnapshot {
        let q = self.position.rotation.coords;
        VehicleSnapshot {
            id,
            position: self.position.translation.vector.into(),
            rotation: [q.x, q.y, q.z, q.w],
            speed: self.linvel.norm(),
            steering_angle: self.steering_angle,
            drifting: self.drifting,
            grounded_wheels: self.grounded_wheels(),
        }
    }

    pub fn push_debug(&self, body: &RigidBodyState, overlay: &mut DebugOverlay) {
        overlay.chassis = Some(DebugChassis::new(&self.position, self.config.half_extents()));
        for (index, wheel) in self.wheels.iter().enumerate() {
            let frame = wheel_frame(body, &wheel.config);
            overlay.wheels.push(DebugWheel {
                index,
                attach: frame.origin.into(),
                radius: wheel.config.radius,
                grounded: wheel.state.colliding(),
                tension: wheel.state.suspension_tension,
                distance: wheel.state.suspension_distance,
                steering_angle: wheel.state.steering_angle,
                steering: wheel.config.steer,
                drive: wheel.config.motor,
            });
        }
    }
}
