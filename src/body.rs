// ==============================================================================
// body.rs — PHYSICS COLLABORATOR CONTRACT (BODY STATE + RAY QUERIES)
// ------------------------------------------------------------------------------
// The wheel pipeline never touches the rigid-body engine directly. Each step the
// engine's body is copied into a RigidBodyState, the wheels read/modify it in
// array order, and physics.rs writes the result back:
// - velocity changes (clamp impulses, drag) are applied immediately, the same
//   way a direct body state behaves inside a force-integration callback
// - forces/torques accumulate and are handed to the engine for integration
// - positional corrections (suspension hard stop) move the isometry directly
//
// RayCaster is the only scene query the wheels need.
// ==============================================================================

use rapier3d::na::{Matrix3, Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector};

use crate::math::is_finite_vec;

/// A downward suspension ray.
#[derive(Debug, Clone, Copy)]
pub struct RayQuery {
    pub origin: Point<Real>,
    pub dir: Vector<Real>,       // unit
    pub max_distance: Real,
    pub collision_mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
}

/// Scene ray intersection. Implementations exclude the querying vehicle's own body.
pub trait RayCaster {
    fn cast_ray(&self, query: &RayQuery) -> Option<RayHit>;
}

#[derive(Debug, Clone)]
pub struct RigidBodyState {
    pub position: Isometry<Real>,       // body frame in world space
    pub local_com: Point<Real>,         // centre of mass in body space
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
    pub dt: Real,                       // duration of the current step
    pub inv_mass: Real,
    pub inv_inertia_local: Matrix3<Real>,

    // accumulated this step, consumed by the engine (or integrate())
    pub force: Vector<Real>,
    pub torque: Vector<Real>,
}

impl RigidBodyState {
    /// Body of `mass` with a solid-box inertia of the given half extents.
    pub fn new(mass: Real, half_extents: Vector<Real>, dt: Real) -> Self {
        let (x2, y2, z2) = (
            (2.0 * half_extents.x).powi(2),
            (2.0 * half_extents.y).powi(2),
            (2.0 * half_extents.z).powi(2),
        );
        let k = mass / 12.0;
        let inertia = Vector::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2));
        let inv = inertia.map(|i| if i > 0.0 { 1.0 / i } else { 0.0 });

        Self {
            position: Isometry::identity(),
            local_com: Point::origin(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            dt,
            inv_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            inv_inertia_local: Matrix3::from_diagonal(&inv),
            force: Vector::zeros(),
            torque: Vector::zeros(),
        }
    }

    pub fn with_translation(mut self, x: Real, y: Real, z: Real) -> Self {
        self.position.translation = Translation3::new(x, y, z);
        self
    }

    #[inline]
    pub fn rotation(&self) -> &UnitQuaternion<Real> {
        &self.position.rotation
    }

    #[inline]
    pub fn world_com(&self) -> Point<Real> {
        self.position * self.local_com
    }

    /// Inverse inertia rotated into world space: R * I⁻¹ * Rᵀ.
    pub fn inv_inertia_world(&self) -> Matrix3<Real> {
        let r = self.position.rotation.to_rotation_matrix();
        r.matrix() * self.inv_inertia_local * r.matrix().transpose()
    }

    /// Velocity of a world point rigidly attached to the body: v + ω × (p - com).
    #[inline]
    pub fn point_velocity(&self, p: &Point<Real>) -> Vector<Real> {
        let r = p - self.world_com();
        self.linvel + self.angvel.cross(&r)
    }

    /// World-space offset of `p` from the centre of mass, the lever arm every
    /// force/impulse below expects.
    #[inline]
    pub fn relative(&self, p: &Point<Real>) -> Vector<Real> {
        p - self.world_com()
    }

    /// Instantaneous velocity change.
    pub fn apply_impulse(&mut self, impulse: Vector<Real>, rel: Vector<Real>) {
        self.linvel += impulse * self.inv_mass;
        self.angvel += self.inv_inertia_world() * rel.cross(&impulse);
    }

    pub fn add_force(&mut self, force: Vector<Real>, rel: Vector<Real>) {
        self.force += force;
        self.torque += rel.cross(&force);
    }

    pub fn add_central_force(&mut self, force: Vector<Real>) {
        self.force += force;
    }

    pub fn add_torque(&mut self, torque: Vector<Real>) {
        self.torque += torque;
    }

    pub fn translate(&mut self, offset: Vector<Real>) {
        self.position.translation.vector += offset;
    }

    pub fn clear_forces(&mut self) {
        self.force = Vector::zeros();
        self.torque = Vector::zeros();
    }

    /// Semi-implicit Euler step of the accumulated forces plus gravity, then
    /// clears the accumulators. Used when no engine owns the body (headless
    /// scenarios); the rapier bridge hands forces to the engine instead.
    pub fn integrate(&mut self, gravity: Vector<Real>) {
        let dt = self.dt;
        self.linvel += (self.force * self.inv_mass + gravity) * dt;
        self.angvel += self.inv_inertia_world() * self.torque * dt;

        self.position.translation.vector += self.linvel * dt;
        let spin = UnitQuaternion::from_scaled_axis(self.angvel * dt);
        self.position.rotation = spin * self.position.rotation;
        self.position.rotation.renormalize();

        self.clear_forces();
    }

    pub fn is_finite(&self) -> bool {
        is_finite_vec(&self.position.translation.vector)
            && self.position.rotation.coords.iter().all(|c| c.is_finite())
            && is_finite_vec(&self.linvel)
            && is_finite_vec(&self.angvel)
            && is_finite_vec(&self.force)
            && is_finite_vec(&self.torque)
    }
}
