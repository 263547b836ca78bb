// ==============================================================================
// kinematics.rs — WHEEL FRAME + SLIP DECOMPOSITION (WORLD SPACE)
// ------------------------------------------------------------------------------
// Wheels carry no rotation of their own: their frame is the chassis frame
// placed at the attachment point. Steering only shapes the steer torque phase,
// never the friction axes.
//
// wheel_frame(...):
// - origin:  body isometry * attachment point
// - up/forward/right: body rotation * body-space axes
//
// slip_components(point_vel, frame):
// - v_long = dot(v, forward)
// - v_lat  = dot(v, right)
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};

use crate::body::RigidBodyState;
use crate::math;
use crate::wheel::types::WheelConfig;

#[derive(Debug, Clone, Copy)]
pub struct WheelFrame {
    pub origin: Point<Real>,
    pub up: Vector<Real>,
    pub forward: Vector<Real>,
    pub right: Vector<Real>,
}

#[inline]
pub fn wheel_frame(body: &RigidBodyState, config: &WheelConfig) -> WheelFrame {
    let rot = body.rotation();
    WheelFrame {
        origin: body.position * config.attach_point(),
        up: rot * math::up(),
        forward: rot * math::forward(),
        right: rot * math::right(),
    }
}

/// Compute (v_long, v_lat) of a point velocity in the wheel frame.
#[inline]
pub fn slip_components(point_vel: Vector<Real>, frame: &WheelFrame) -> (Real, Real) {
    (point_vel.dot(&frame.forward), point_vel.dot(&frame.right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::na::UnitQuaternion;

    #[test]
    fn test_frame_follows_body_yaw() {
        let mut body = RigidBodyState::new(1.0, Vector::new(1.0, 1.0, 1.0), 1.0 / 60.0)
            .with_translation(0.0, 2.0, 0.0);
        body.position.rotation = UnitQuaternion::from_axis_angle(&Vector::y_axis(), std::f32::consts::FRAC_PI_2);

        let frame = wheel_frame(&body, &WheelConfig::at(0.0, 0.0, 1.0));
        // +Z yawed 90° left lands on +X
        assert!((frame.forward - Vector::new(1.0, 0.0, 0.0)).norm() < 1e-5);
        assert!((frame.origin - Point::new(1.0, 2.0, 0.0)).norm() < 1e-5);
        assert!((frame.up - Vector::new(0.0, 1.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn test_slip_components_split_velocity() {
        let body = RigidBodyState::new(1.0, Vector::new(1.0, 1.0, 1.0), 1.0 / 60.0);
        let frame = wheel_frame(&body, &WheelConfig::default());
        let (v_long, v_lat) = slip_components(Vector::new(-3.0, 0.0, 4.0), &frame);
        assert_eq!(v_long, 4.0);
        assert_eq!(v_lat, 3.0);
    }
}
