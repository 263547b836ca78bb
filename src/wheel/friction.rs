// ==============================================================================
// friction.rs — SLIP-BASED TIRE DRAG + MOTOR TORQUE PHASES
// ------------------------------------------------------------------------------
// Phase 4 friction():
// - Sample the body velocity at the contact point. An airborne wheel samples
//   the virtual contact at full extension instead (tension is 0 there, so the
//   resulting forces are zero but the slip accumulators still follow).
// - Decompose into forward/right components of the chassis frame.
// - Slip ratio per axis = |speed| / slip_max, smoothed at rate clamp(2 * dt).
// - Optional curves scale the drag by the instantaneous (clamped) slip.
// - Forces at the contact point:
//     -forward * fwd                          (rolling drag)
//     -right   * side                         (lateral grip)
//     +forward * |side| * side_friction_transfer
//
// Phase 5 motor():
// - Central force forward * torque * tension. No grip, no push.
// ==============================================================================

use rapier3d::prelude::{Point, Real};

use crate::body::RigidBodyState;
use crate::math::{lerp, slip_ratio};
use crate::wheel::kinematics::{slip_components, WheelFrame};
use crate::wheel::types::{WheelConfig, WheelState};

/// Contact point, or where the tire would touch at full extension.
#[inline]
pub fn contact_or_virtual(state: &WheelState, config: &WheelConfig, frame: &WheelFrame) -> Point<Real> {
    match state.contact {
        Some(contact) => contact.point,
        None => frame.origin - frame.up * config.max_ray_distance(),
    }
}

pub fn friction(
    state: &mut WheelState,
    config: &WheelConfig,
    frame: &WheelFrame,
    body: &mut RigidBodyState,
) {
    let point = contact_or_virtual(state, config, frame);
    let vel = body.point_velocity(&point);
    let (mut fwd, mut side) = slip_components(vel, frame);

    let forward_slip = slip_ratio(fwd, config.forward_slip_max);
    let side_slip = slip_ratio(side, config.side_slip_max);
    let rate = (body.dt * 2.0).clamp(0.0, 1.0);
    state.forward_slip = lerp(state.forward_slip, forward_slip, rate);
    state.side_slip = lerp(state.side_slip, side_slip, rate);

    if let Some(curve) = &config.forward_friction_curve {
        fwd *= curve.sample(forward_slip.clamp(0.0, 1.0));
    }
    if let Some(curve) = &config.side_friction_curve {
        side *= curve.sample(side_slip.clamp(0.0, 1.0));
    }

    let tension = state.suspension_tension;
    fwd *= config.forward_friction * tension * config.force_multiply;
    side *= config.side_friction * tension * config.force_multiply * state.side_friction_multiply;

    let rel = body.relative(&point);
    let forward_force = -frame.forward * fwd;
    let side_force = -frame.right * side;
    let transfer = frame.forward * side.abs() * config.side_friction_transfer;

    body.add_force(forward_force, rel);
    body.add_force(side_force, rel);
    body.add_force(transfer, rel);

    state.forces.forward_friction = forward_force;
    state.forces.side_friction = side_force;
    state.forces.friction_transfer = transfer;
}

pub fn motor(state: &mut WheelState, frame: &WheelFrame, body: &mut RigidBodyState) {
    let force = frame.forward * (state.torque * state.suspension_tension);
    body.add_central_force(force);
    state.forces.motor = force;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ResponseCurve;
    use crate::wheel::kinematics::wheel_frame;
    use crate::wheel::types::Contact;
    use rapier3d::prelude::Vector;

    fn grounded(cfg: &WheelConfig, tension: Real) -> WheelState {
        let mut s = WheelState::new(cfg);
        s.suspension_tension = tension;
        s.contact = Some(Contact { point: Point::new(0.0, -0.5, 0.0), normal: Vector::y() });
        s
    }

    fn sliding_body(vel: Vector<Real>) -> RigidBodyState {
        let mut b = RigidBodyState::new(1.0, Vector::new(1.0, 0.5, 2.0), 1.0 / 60.0);
        b.linvel = vel;
        b
    }

    #[test]
    fn test_side_friction_opposes_lateral_motion() {
        let cfg = WheelConfig::default();
        let mut state = grounded(&cfg, 1.0);
        // moving left (+X) is negative along right (-X)
        let mut body = sliding_body(Vector::new(4.0, 0.0, 0.0));
        let frame = wheel_frame(&body, &cfg);

        friction(&mut state, &cfg, &frame, &mut body);
        // side = -4 * 2 * 1 * 0.25 = -2, force = -right * side = (-2, 0, 0)
        assert!((state.forces.side_friction - Vector::new(-2.0, 0.0, 0.0)).norm() < 1e-5);
        // transfer pushes forward by |side| * 0.5
        assert!((state.forces.friction_transfer - Vector::new(0.0, 0.0, 1.0)).norm() < 1e-5);
        assert_eq!(state.forces.forward_friction, Vector::zeros());
    }

    #[test]
    fn test_drift_halves_side_force() {
        let cfg = WheelConfig::default();
        let vel = Vector::new(3.0, 0.0, 5.0);

        let mut grip = grounded(&cfg, 0.8);
        let mut body = sliding_body(vel);
        let frame = wheel_frame(&body, &cfg);
        friction(&mut grip, &cfg, &frame, &mut body);

        let mut drift = grounded(&cfg, 0.8);
        drift.side_friction_multiply = 0.5;
        let mut body = sliding_body(vel);
        friction(&mut drift, &cfg, &frame, &mut body);

        assert!((drift.forces.side_friction * 2.0 - grip.forces.side_friction).norm() < 1e-6);
        assert_eq!(drift.forces.forward_friction, grip.forces.forward_friction);
    }

    #[test]
    fn test_airborne_friction_is_zero_but_slip_tracks() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        let mut body = sliding_body(Vector::new(0.0, 0.0, 16.0));
        let frame = wheel_frame(&body, &cfg);

        friction(&mut state, &cfg, &frame, &mut body);
        assert_eq!(body.force, Vector::zeros());
        // full forward slip, smoothed by 2 * dt
        assert!((state.forward_slip - 2.0 / 60.0).abs() < 1e-6);
        assert_eq!(state.side_slip, 0.0);
    }

    #[test]
    fn test_zero_slip_max_never_produces_nan() {
        let cfg = WheelConfig { side_slip_max: 0.0, forward_slip_max: 0.0, ..Default::default() };
        let mut state = grounded(&cfg, 1.0);
        let mut body = sliding_body(Vector::new(1.0, 0.0, 1.0));
        let frame = wheel_frame(&body, &cfg);
        friction(&mut state, &cfg, &frame, &mut body);
        assert!(state.forward_slip.is_finite() && state.side_slip.is_finite());
        assert!(body.is_finite());
    }

    #[test]
    fn test_curve_scales_drag_by_instant_slip() {
        let cfg = WheelConfig {
            forward_friction_curve: Some(ResponseCurve::slip_falloff(0.2)),
            ..Default::default()
        };
        let mut state = grounded(&cfg, 1.0);
        // 32 m/s over a 16 m/s max clamps to full slip, curve reads the floor
        let mut body = sliding_body(Vector::new(0.0, 0.0, 32.0));
        let frame = wheel_frame(&body, &cfg);
        friction(&mut state, &cfg, &frame, &mut body);
        let expected = -32.0 * 0.2 * 1.0 * 0.25;
        assert!((state.forces.forward_friction.z - expected).abs() < 1e-4);
    }

    #[test]
    fn test_motor_scales_with_tension() {
        let cfg = WheelConfig::default().motor();
        let mut state = grounded(&cfg, 0.5);
        state.torque = 10.0;
        let mut body = sliding_body(Vector::zeros());
        let frame = wheel_frame(&body, &cfg);
        motor(&mut state, &frame, &mut body);
        assert_eq!(state.forces.motor, Vector::new(0.0, 0.0, 5.0));
        assert_eq!(body.torque, Vector::zeros());
    }
}
