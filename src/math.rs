// ==============================================================================
// math.rs — AXIS CONVENTIONS + SMALL SCALAR/VECTOR HELPERS
// ------------------------------------------------------------------------------
// Body space is right-handed with:
//   up      = +Y
//   forward = +Z
//   right   = -X   (so +X is the left side of the vehicle)
//
// Everything that needs a "forward" or "right" axis reads it from here so the
// wheel pipeline, the controller and the road walker agree on signs.
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};

pub const EPSILON: Real = 1e-6;

#[inline] pub fn up() -> Vector<Real> { Vector::new(0.0, 1.0, 0.0) }
#[inline] pub fn forward() -> Vector<Real> { Vector::new(0.0, 0.0, 1.0) }
#[inline] pub fn right() -> Vector<Real> { Vector::new(-1.0, 0.0, 0.0) }
#[inline] pub fn left() -> Vector<Real> { -right() }

#[inline]
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}

/// Where `value` sits between `a` and `b` (0 at `a`, 1 at `b`). Unclamped.
/// A degenerate `a == b` range maps everything to 0.
#[inline]
pub fn inverse_lerp(a: Real, b: Real, value: Real) -> Real {
    let span = b - a;
    if span.abs() < EPSILON { 0.0 } else { (value - a) / span }
}

/// Normalize, or return `fallback` for (near) zero-length and non-finite input.
#[inline]
pub fn safe_normalize(v: Vector<Real>, fallback: Vector<Real>) -> Vector<Real> {
    let n = v.norm();
    if n > EPSILON && n.is_finite() { v / n } else { fallback }
}

/// `speed / max`, never NaN: a zero max means any motion is full slip.
#[inline]
pub fn slip_ratio(speed: Real, max: Real) -> Real {
    let speed = speed.abs();
    if max > EPSILON {
        speed / max
    } else if speed > EPSILON {
        1.0
    } else {
        0.0
    }
}

/// Project onto the XZ plane.
#[inline]
pub fn horizontal(v: Vector<Real>) -> Vector<Real> {
    Vector::new(v.x, 0.0, v.z)
}

#[inline]
pub fn horizontal_distance(a: &Point<Real>, b: &Point<Real>) -> Real {
    horizontal(b - a).norm()
}

#[inline]
pub fn is_finite_vec(v: &Vector<Real>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_lerp_reverse_range() {
        // max_range → 0, min_range → 1, which is how suspension tension reads
        assert_eq!(inverse_lerp(1.0, 0.25, 1.0), 0.0);
        assert_eq!(inverse_lerp(1.0, 0.25, 0.25), 1.0);
        assert!((inverse_lerp(1.0, 0.25, 0.625) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_inverse_lerp_degenerate_range() {
        assert_eq!(inverse_lerp(2.0, 2.0, 5.0), 0.0);
    }

    #[test]
    fn test_safe_normalize_zero_uses_fallback() {
        let n = safe_normalize(Vector::zeros(), forward());
        assert_eq!(n, forward());
        let n = safe_normalize(Vector::new(Real::NAN, 0.0, 0.0), up());
        assert_eq!(n, up());
    }

    #[test]
    fn test_slip_ratio_zero_max() {
        assert_eq!(slip_ratio(0.0, 0.0), 0.0);
        assert_eq!(slip_ratio(3.0, 0.0), 1.0);
        assert_eq!(slip_ratio(-8.0, 16.0), 0.5);
    }

    #[test]
    fn test_axes_are_right_handed() {
        // up × forward lands on +X, which is the left side
        assert_eq!(up().cross(&forward()), Vector::new(1.0, 0.0, 0.0));
        assert_eq!(left(), Vector::new(1.0, 0.0, 0.0));
    }
}
