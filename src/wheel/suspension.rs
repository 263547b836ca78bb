// ==============================================================================
// suspension.rs — RAYCAST + HARD STOP + SPRING/DAMPER PHASES
// ------------------------------------------------------------------------------
// Phase 1 raycast():
// - Ray from the wheel attachment point along -up for max_range + radius
// - hit  => distance = |contact - origin| - radius
//           tension  = inverse_lerp(max_range, min_range, distance)
// - miss => distance = max_range, tension = 0, no contact
//
// Phase 2 clamp():
// - distance < min_range is over-compression. The wheel acts as a hard stop:
//   kill the velocity into the contact normal, push along up with an impulse
//   equal to the penetration, move the body out by the penetration, and pin the
//   distance to exactly min_range.
//
// Phase 3 spring():
// - Spring:  up * spring_force * tension * force_multiply at the attachment
// - Angular: wheel-space angular velocity, yaw by steer drag, pitch/roll by
//            angular drag, times tension, removed at rate dt * force_multiply
// - Linear:  vertical velocity times tension removed at
//            rate dt * spring_drag * force_multiply
// - Both damping rates clamp to [0, 1] so a long step can't overshoot.
// ==============================================================================

use rapier3d::prelude::Real;

use crate::body::{RayCaster, RayQuery, RigidBodyState};
use crate::math::inverse_lerp;
use crate::wheel::kinematics::WheelFrame;
use crate::wheel::types::{Contact, WheelConfig, WheelState};

#[inline]
fn tension_at(config: &WheelConfig, distance: Real) -> Real {
    inverse_lerp(config.max_range, config.min_range, distance).clamp(0.0, 1.0)
}

pub fn raycast(
    state: &mut WheelState,
    config: &WheelConfig,
    frame: &WheelFrame,
    rays: &dyn RayCaster,
) {
    let query = RayQuery {
        origin: frame.origin,
        dir: -frame.up,
        max_distance: config.max_ray_distance(),
        collision_mask: config.collision_mask,
    };

    state.suspension_tension = 0.0;
    state.suspension_distance = config.max_range;
    state.contact = None;

    if let Some(hit) = rays.cast_ray(&query) {
        state.suspension_distance = (hit.point - frame.origin).norm() - config.radius;
        state.suspension_tension = tension_at(config, state.suspension_distance);
        state.contact = Some(Contact { point: hit.point, normal: hit.normal });
    }
}

pub fn clamp(
    state: &mut WheelState,
    config: &WheelConfig,
    frame: &WheelFrame,
    body: &mut RigidBodyState,
) {
    if state.suspension_distance >= config.min_range {
        return;
    }
    let Some(contact) = state.contact else { return };

    let diff = config.min_range - state.suspension_distance;
    state.suspension_distance = config.min_range;
    state.suspension_tension = tension_at(config, state.suspension_distance);

    let into_ground = contact.normal * contact.normal.dot(&body.linvel);
    body.linvel -= into_ground;

    let impulse = frame.up * diff;
    let rel = body.relative(&frame.origin);
    body.apply_impulse(impulse, rel);
    body.translate(frame.up * diff);

    state.forces.clamp_impulse = impulse;
}

pub fn spring(
    state: &mut WheelState,
    config: &WheelConfig,
    frame: &WheelFrame,
    body: &mut RigidBodyState,
) {
    let tension = state.suspension_tension;
    let rel = body.relative(&frame.origin);

    let spring = frame.up * (config.spring_force * tension * config.force_multiply);
    body.add_force(spring, rel);
    state.forces.spring = spring;

    // angular damping in wheel space
    let rot = *body.rotation();
    let mut ang = rot.inverse() * body.angvel;
    ang.y *= config.spring_steer_drag;
    ang.x *= config.spring_angular_drag;
    ang.z *= config.spring_angular_drag;
    ang *= tension;
    let ang = rot * ang;
    body.angvel -= ang * (body.dt * config.force_multiply).clamp(0.0, 1.0);

    let vertical = frame.up * frame.up.dot(&body.linvel) * tension;
    body.linvel -= vertical * (body.dt * config.spring_drag * config.force_multiply).clamp(0.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RayHit;
    use crate::wheel::kinematics::wheel_frame;
    use rapier3d::prelude::{Point, Vector};

    struct Plane(Real);

    impl RayCaster for Plane {
        fn cast_ray(&self, q: &RayQuery) -> Option<RayHit> {
            let t = (q.origin.y - self.0) / -q.dir.y;
            (t >= 0.0 && t <= q.max_distance).then(|| RayHit {
                point: q.origin + q.dir * t,
                normal: Vector::new(0.0, 1.0, 0.0),
            })
        }
    }

    struct Nothing;

    impl RayCaster for Nothing {
        fn cast_ray(&self, _: &RayQuery) -> Option<RayHit> {
            None
        }
    }

    fn body_at(y: Real) -> RigidBodyState {
        RigidBodyState::new(1.0, Vector::new(0.5, 0.5, 0.5), 1.0 / 60.0).with_translation(0.0, y, 0.0)
    }

    #[test]
    fn test_airborne_wheel_has_zero_tension_and_spring() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        let mut body = body_at(10.0);
        let frame = wheel_frame(&body, &cfg);

        raycast(&mut state, &cfg, &frame, &Nothing);
        assert_eq!(state.suspension_tension, 0.0);
        assert_eq!(state.suspension_distance, cfg.max_range);
        assert!(!state.colliding());

        spring(&mut state, &cfg, &frame, &mut body);
        assert_eq!(state.forces.spring, Vector::zeros());
        assert_eq!(body.force, Vector::zeros());
    }

    #[test]
    fn test_contact_at_max_range_is_zero_tension() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        // attachment sits exactly max_range + radius above the ground
        let body = body_at(1.25);
        let frame = wheel_frame(&body, &cfg);

        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        assert!(state.colliding());
        assert!((state.suspension_distance - cfg.max_range).abs() < 1e-6);
        assert!(state.suspension_tension.abs() < 1e-6);
    }

    #[test]
    fn test_midway_compression_is_half_tension() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        // distance = 0.625 - halfway between 0.25 and 1.0
        let body = body_at(0.875);
        let frame = wheel_frame(&body, &cfg);
        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        assert!((state.suspension_tension - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_resolves_penetration_exactly() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        // distance = 0.35 - 0.25 = 0.1, which is 0.15 past min_range
        let mut body = body_at(0.35);
        body.linvel = Vector::new(2.0, -3.0, 0.0);
        let frame = wheel_frame(&body, &cfg);

        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        assert!(state.suspension_distance < cfg.min_range);

        clamp(&mut state, &cfg, &frame, &mut body);
        assert_eq!(state.suspension_distance, cfg.min_range);
        assert_eq!(state.suspension_tension, 1.0);
        assert!((body.position.translation.y - 0.5).abs() < 1e-6);

        // downward velocity removed, then the impulse pushes up by diff / mass
        assert!((body.linvel.y - 0.15).abs() < 1e-5);
        assert_eq!(body.linvel.x, 2.0);

        // re-probing from the corrected pose lands exactly on min_range
        let frame = wheel_frame(&body, &cfg);
        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        assert!((state.suspension_distance - cfg.min_range).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_ignores_normal_compression() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        let mut body = body_at(0.875);
        let frame = wheel_frame(&body, &cfg);
        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        clamp(&mut state, &cfg, &frame, &mut body);
        assert_eq!(body.position.translation.y, 0.875);
        assert_eq!(state.forces.clamp_impulse, Vector::zeros());
    }

    #[test]
    fn test_spring_damps_vertical_velocity() {
        let cfg = WheelConfig::default();
        let mut state = WheelState::new(&cfg);
        let mut body = body_at(0.875);
        body.linvel = Vector::new(0.0, -2.0, 0.0);
        let frame = wheel_frame(&body, &cfg);
        raycast(&mut state, &cfg, &frame, &Plane(0.0));
        spring(&mut state, &cfg, &frame, &mut body);

        let expected_force = 100.0 * 0.5 * 0.25;
        assert!((state.forces.spring.y - expected_force).abs() < 1e-3);
        assert!(body.linvel.y > -2.0 && body.linvel.y < 0.0);
        assert_eq!(Point::from(body.position.translation.vector).y, 0.875);
    }
}
