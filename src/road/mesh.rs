//! Road strip mesh: a quad of `road_width` between every pair of consecutive
//! path points, plus a flat cap of `cap_length` off each end.
//!
//! U runs along the road (metres / width when tiling, 0..1 over the total
//! length otherwise), V runs across it. Both are multiplied by `uv_scale`.
//! Caps continue the same U mapping past either end.

use rapier3d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, ConfigError};
use crate::math::{self, safe_normalize, EPSILON};
use crate::mesh::TriangleMesh;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadMeshConfig {
    pub road_width: Real,
    pub cap_length: Real,
    pub tile_uv: bool,
    pub uv_scale: [f32; 2],
}

impl Default for RoadMeshConfig {
    fn default() -> Self {
        Self {
            road_width: 16.0,
            cap_length: 64.0,
            tile_uv: false,
            uv_scale: [1.0, 1.0],
        }
    }
}

impl RoadMeshConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("road.mesh.road_width", self.road_width)
    }
}

/// Per-point frame along a polyline.
struct Strip {
    forward: Vec<Vector<Real>>,
    right: Vec<Vector<Real>>,
    length: Vec<Real>,          // cumulative distance from the first point
    total: Real,
}

fn strip(points: &[Point<Real>]) -> Strip {
    let n = points.len();
    let mut forward = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    let mut length = Vec::with_capacity(n);

    let mut prev = points[0];
    let mut current_forward = math::forward();
    let mut total = 0.0;

    for i in 0..n {
        // the last point keeps the final segment's direction
        if i + 1 < n {
            current_forward = safe_normalize(points[i + 1] - points[i], current_forward);
        }
        total += (points[i] - prev).norm();

        forward.push(current_forward);
        right.push(safe_normalize(current_forward.cross(&math::up()), math::right()));
        length.push(total);
        prev = points[i];
    }

    Strip { forward, right, length, total }
}

pub fn build_road_mesh(points: &[Point<Real>], config: &RoadMeshConfig) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    if points.len() < 2 {
        return mesh;
    }

    let s = strip(points);
    let half = config.road_width * 0.5;
    let [su, sv] = config.uv_scale;
    let u_of = |l: Real| {
        if config.tile_uv || s.total < EPSILON {
            l / config.road_width
        } else {
            l / s.total
        }
    };
    let uv = |u: Real, v: Real| [u * su, v * sv];

    let mut quad = |a: Point<Real>, a_right: Vector<Real>, ua: Real, b: Point<Real>, b_right: Vector<Real>, ub: Real| {
        let v1 = a + a_right * half;
        let v2 = a - a_right * half;
        let v3 = b - b_right * half;
        let v4 = b + b_right * half;
        let (uv1, uv2, uv3, uv4) = (uv(ua, 0.0), uv(ua, 1.0), uv(ub, 1.0), uv(ub, 0.0));

        // counter-clockwise seen from above
        mesh.push_triangle([v1, v4, v2], [uv1, uv4, uv2]);
        mesh.push_triangle([v4, v3, v2], [uv4, uv3, uv2]);
    };

    for i in 0..points.len() - 1 {
        quad(points[i], s.right[i], u_of(s.length[i]), points[i + 1], s.right[i + 1], u_of(s.length[i + 1]));
    }

    let last = points.len() - 1;
    let (start, end) = (points[0], points[last]);
    let cap_start = start - s.forward[0] * config.cap_length;
    let cap_end = end + s.forward[last] * config.cap_length;
    let cap = config.cap_length;

    quad(cap_start, s.right[0], u_of(-cap), start, s.right[0], u_of(0.0));
    quad(end, s.right[last], u_of(s.total), cap_end, s.right[last], u_of(s.total + cap));

    mesh.weld();
    mesh
}
