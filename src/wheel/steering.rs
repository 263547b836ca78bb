// ==============================================================================
// steering.rs — STEER TORQUE PHASE (KINEMATIC BICYCLE MODEL)
// ------------------------------------------------------------------------------
// Phase 6 steer():
// - Body-space forward speed at the contact point, or the virtual contact
//   at full extension when airborne (lateral/vertical dropped).
// - Two sample points on the body's centre line:
//     front = (0, 0, attach.z)
//     rear  = front - forward * wheelbase
// - Advance both by one step: rear straight ahead, front along the steered
//   direction rot_y(steering_angle) * v.
// - The new front-rear heading says how far the chassis wants to yaw this
//   step. Its angle to forward (degrees, signed toward left, halved, clamped
//   to max_steer_force) becomes a yaw torque scaled by tension.
// ==============================================================================

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};

use crate::body::RigidBodyState;
use crate::math::{self, safe_normalize};
use crate::wheel::friction::contact_or_virtual;
use crate::wheel::kinematics::WheelFrame;
use crate::wheel::types::{WheelConfig, WheelState};

/// Body-space heading of the advanced front/rear sample pair.
pub fn steer_heading(
    forward_speed: Real,
    steering_angle: Real,
    attach_z: Real,
    wheelbase: Real,
    dt: Real,
) -> Vector<Real> {
    let fwd = math::forward();
    let v = fwd * forward_speed;

    let front = Point::new(0.0, 0.0, attach_z);
    let rear = front - fwd * wheelbase;

    let steer = UnitQuaternion::from_axis_angle(&Vector::y_axis(), steering_angle);
    let rear = rear + v * dt;
    let front = front + (steer * v) * dt;

    safe_normalize(front - rear, fwd)
}

/// Signed yaw request in degrees, halved and clamped to `±max_steer_force`.
pub fn steer_delta(heading: &Vector<Real>, max_steer_force: Real) -> Real {
    let fwd = math::forward();
    let degrees = heading.angle(&fwd).to_degrees();
    let side = heading.dot(&math::left());
    let sign = if side > 0.0 {
        1.0
    } else if side < 0.0 {
        -1.0
    } else {
        0.0
    };
    (degrees * sign * 0.5).clamp(-max_steer_force, max_steer_force)
}

pub fn steer(
    state: &mut WheelState,
    config: &WheelConfig,
    frame: &WheelFrame,
    body: &mut RigidBodyState,
) {
    let contact = contact_or_virtual(state, config, frame);
    let world_vel = body.point_velocity(&contact);
    let local_vel = body.rotation().inverse() * world_vel;

    let heading = steer_heading(
        local_vel.z,
        state.steering_angle,
        config.attach[2],
        state.wheelbase,
        body.dt,
    );
    let delta = steer_delta(&heading, config.max_steer_force);

    let torque = frame.up * (delta * state.suspension_tension);
    body.add_torque(torque);
    state.forces.steer_torque = torque;
}
