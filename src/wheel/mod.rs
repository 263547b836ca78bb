// ==============================================================================
// wheel/mod.rs — RAYCAST WHEEL (SIX-PHASE PIPELINE)
// ------------------------------------------------------------------------------
// Per wheel, per fixed step, strictly in this order:
//   1. raycast   suspension ray          (suspension.rs)
//   2. clamp     hard stop at min_range  (suspension.rs)
//   3. spring    spring + dampers        (suspension.rs)
//   4. friction  slip-based drag         (friction.rs)
//   5. motor     drive force             (friction.rs)  motor wheels only
//   6. steer     yaw torque              (steering.rs)  steering wheels only
//
// Every phase runs airborne too; tension 0 zeroes its output.
// ==============================================================================

pub mod friction;
pub mod kinematics;
pub mod steering;
pub mod suspension;
pub mod types;

use rapier3d::na::{Matrix4, Rotation3, Translation3, Vector3};
use rapier3d::prelude::Real;

use crate::body::{RayCaster, RigidBodyState};
use crate::debug_builders::{push_arrow, DebugSink, COLOR_AIRBORNE, COLOR_FRICTION, COLOR_GROUNDED, COLOR_SPRING};
use crate::error::ConfigError;

pub use kinematics::{wheel_frame, WheelFrame};
pub use types::{Contact, WheelConfig, WheelForces, WheelState};

#[derive(Debug, Clone)]
pub struct Wheel {
    pub config: WheelConfig,
    pub state: WheelState,
}

impl Wheel {
    pub fn new(config: WheelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = WheelState::new(&config);
        Ok(Self { config, state })
    }

    pub fn update(&mut self, body: &mut RigidBodyState, rays: &dyn RayCaster, debug: &mut dyn DebugSink) {
        self.state.forces = WheelForces::default();
        let cfg = &self.config;
        let state = &mut self.state;

        let frame = wheel_frame(body, cfg);
        suspension::raycast(state, cfg, &frame, rays);
        suspension::clamp(state, cfg, &frame, body);

        // the hard stop may have moved the body
        let frame = wheel_frame(body, cfg);
        suspension::spring(state, cfg, &frame, body);
        friction::friction(state, cfg, &frame, body);
        if cfg.motor {
            friction::motor(state, &frame, body);
        }
        if cfg.steer {
            steering::steer(state, cfg, &frame, body);
        }

        self.draw(&frame, debug);
    }

    fn draw(&self, frame: &WheelFrame, debug: &mut dyn DebugSink) {
        let state = &self.state;
        let end = friction::contact_or_virtual(state, &self.config, frame);
        let color = if state.colliding() { COLOR_GROUNDED } else { COLOR_AIRBORNE };
        debug.add_line(frame.origin, end, color);

        if state.colliding() {
            push_arrow(debug, frame.origin, state.forces.spring, COLOR_SPRING);
            push_arrow(debug, end, state.forces.side_friction, COLOR_FRICTION);
        }
    }

    /// Local transform of the visual wheel model relative to its attachment:
    /// mirrored on the left side, dropped by the suspension distance, and
    /// yawed by the steering angle on steering wheels.
    pub fn model_matrix(&self) -> Matrix4<Real> {
        let drop = Translation3::new(0.0, -self.state.suspension_distance, 0.0).to_homogeneous();

        let yaw = if self.config.steer {
            Rotation3::from_axis_angle(&Vector3::y_axis(), self.state.steering_angle).to_homogeneous()
        } else {
            Matrix4::identity()
        };

        let mirror = if self.config.attach[0] > 0.0 {
            Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0))
        } else {
            Matrix4::identity()
        };

        drop * yaw * mirror
    }
}
