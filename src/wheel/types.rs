//! Wheel tunables, per-step state and the force breakdown each step produces.
// wheel/types.rs

use rapier3d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

use crate::curve::ResponseCurve;
use crate::error::{ensure_positive, ensure_range, ConfigError};

// ============================================
// ----- config -------------------------------
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub attach: [f32; 3],               // attachment point in body space
    pub radius: Real,

    pub min_range: Real,                // suspension fully compressed
    pub max_range: Real,                // suspension fully extended

    pub spring_force: Real,
    pub spring_drag: Real,              // vertical linear damping
    pub spring_angular_drag: Real,      // pitch/roll damping
    pub spring_steer_drag: Real,        // yaw damping

    pub side_friction: Real,
    pub forward_friction: Real,
    pub side_friction_curve: Option<ResponseCurve>,
    pub forward_friction_curve: Option<ResponseCurve>,
    pub side_friction_transfer: Real,   // share of side grip fed back as forward push
    pub side_slip_max: Real,            // m/s of lateral slip counted as full slip
    pub forward_slip_max: Real,         // m/s of longitudinal slip counted as full slip
    pub force_multiply: Real,           // global scale on every wheel force
    pub max_steer_force: Real,

    pub motor: bool,
    pub steer: bool,
    pub collision_mask: u32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            attach: [0.0, 0.0, 0.0],
            radius: 0.25,
            min_range: 0.25,
            max_range: 1.0,
            spring_force: 100.0,
            spring_drag: 8.0,
            spring_angular_drag: 4.0,
            spring_steer_drag: 1.0,
            side_friction: 2.0,
            forward_friction: 1.0,
            side_friction_curve: None,
            forward_friction_curve: None,
            side_friction_transfer: 0.5,
            side_slip_max: 32.0,
            forward_slip_max: 16.0,
            force_multiply: 0.25,
            max_steer_force: 0.75,
            motor: false,
            steer: false,
            collision_mask: 0b0001,
        }
    }
}

impl WheelConfig {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { attach: [x, y, z], ..Default::default() }
    }

    pub fn motor(mut self) -> Self {
        self.motor = true;
        self
    }

    pub fn steering(mut self) -> Self {
        self.steer = true;
        self
    }

    #[inline]
    pub fn attach_point(&self) -> Point<Real> {
        Point::new(self.attach[0], self.attach[1], self.attach[2])
    }

    /// Ray length: full extension plus the tire itself.
    #[inline]
    pub fn max_ray_distance(&self) -> Real {
        self.max_range + self.radius
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("wheel.radius", self.radius)?;
        ensure_positive("wheel.max_range", self.max_range)?;
        ensure_range("wheel.range", self.min_range, self.max_range)?;
        ensure_positive("wheel.side_slip_max", self.side_slip_max)?;
        ensure_positive("wheel.forward_slip_max", self.forward_slip_max)?;
        for curve in [&self.side_friction_curve, &self.forward_friction_curve].into_iter().flatten() {
            curve.validate()?;
        }
        Ok(())
    }
}

// ============================================
// ----- state --------------------------------
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
}

/// What each phase pushed into the body on the last step (world space).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelForces {
    pub spring: Vector<Real>,
    pub forward_friction: Vector<Real>,
    pub side_friction: Vector<Real>,
    pub friction_transfer: Vector<Real>,
    pub motor: Vector<Real>,
    pub steer_torque: Vector<Real>,
    pub clamp_impulse: Vector<Real>,
}

#[derive(Debug, Clone)]
pub struct WheelState {
    pub suspension_tension: Real,       // 0 = extended / airborne, 1 = fully compressed
    pub suspension_distance: Real,
    pub contact: Option<Contact>,

    // smoothed slip ratios
    pub forward_slip: Real,
    pub side_slip: Real,

    // driven by the vehicle controller
    pub torque: Real,
    pub steering_angle: Real,           // radians, positive turns left
    pub side_friction_multiply: Real,
    pub wheelbase: Real,                // front-to-rear axle distance, steering wheels only

    pub forces: WheelForces,
}

impl WheelState {
    pub fn new(config: &WheelConfig) -> Self {
        Self {
            suspension_tension: 0.0,
            suspension_distance: config.max_range,
            contact: None,
            forward_slip: 0.0,
            side_slip: 0.0,
            torque: 0.0,
            steering_angle: 0.0,
            side_friction_multiply: 1.0,
            wheelbase: 0.0,
            forces: WheelForces::default(),
        }
    }

    #[inline]
    pub fn colliding(&self) -> bool {
        self.contact.is_some()
    }
}
