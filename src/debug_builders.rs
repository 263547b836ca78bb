// ==============================================================================
// debug_builders.rs — DEBUG LINE SINK + OVERLAY PRIMITIVES
// ------------------------------------------------------------------------------
// DebugSink is the one debug surface the simulation writes into. It is passed
// explicitly (&mut dyn DebugSink) to wheel updates and road generation.
//
// - DebugLines: collects serializable line segments, index-addressable so a
//   caller can move an existing line instead of adding a new one every step
// - NullDebug: discards everything (headless runs, tests)
// - DebugOverlay: per-frame snapshot for a viewer (chassis box, per-wheel
//   numeric state, plus the collected lines)
//
// Nothing in here has physics side effects.
// ==============================================================================

use rapier3d::prelude::{Isometry, Point, Real, Vector};
use serde::Serialize;

pub type Color = [f32; 3];

pub const COLOR_GROUNDED: Color = [0.0, 1.0, 0.0];
pub const COLOR_AIRBORNE: Color = [1.0, 0.0, 0.0];
pub const COLOR_SPRING: Color = [0.2, 0.6, 1.0];
pub const COLOR_FRICTION: Color = [1.0, 0.6, 0.0];
pub const COLOR_ANCHOR: Color = [1.0, 1.0, 0.0];
pub const COLOR_WALKER: Color = [0.0, 1.0, 1.0];

pub trait DebugSink {
    /// Add a segment, returning an index usable with `update_line`.
    fn add_line(&mut self, a: Point<Real>, b: Point<Real>, color: Color) -> usize;

    /// Move an existing segment. Unknown indices are ignored.
    fn update_line(&mut self, index: usize, a: Point<Real>, b: Point<Real>, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebugLine {
    pub a: [f32; 3],
    pub b: [f32; 3],
    pub color: Color,
}

impl DebugLine {
    fn new(a: Point<Real>, b: Point<Real>, color: Color) -> Self {
        Self { a: a.into(), b: b.into(), color }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DebugLines {
    lines: Vec<DebugLine>,
}

impl DebugLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl DebugSink for DebugLines {
    fn add_line(&mut self, a: Point<Real>, b: Point<Real>, color: Color) -> usize {
        self.lines.push(DebugLine::new(a, b, color));
        self.lines.len() - 1
    }

    fn update_line(&mut self, index: usize, a: Point<Real>, b: Point<Real>, color: Color) {
        if let Some(line) = self.lines.get_mut(index) {
            *line = DebugLine::new(a, b, color);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullDebug;

impl DebugSink for NullDebug {
    fn add_line(&mut self, _: Point<Real>, _: Point<Real>, _: Color) -> usize {
        0
    }

    fn update_line(&mut self, _: usize, _: Point<Real>, _: Point<Real>, _: Color) {}
}

/// Short line along `dir` starting at `origin`, used for force arrows.
pub fn push_arrow(sink: &mut dyn DebugSink, origin: Point<Real>, dir: Vector<Real>, color: Color) -> usize {
    sink.add_line(origin, origin + dir, color)
}

// ============================================
// ----- overlay snapshot ---------------------
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct DebugChassis {
    pub position: [f32; 3],
    pub rotation: [f32; 4],     // quaternion (i, j, k, w)
    pub half_extents: [f32; 3],
}

impl DebugChassis {
    pub fn new(pose: &Isometry<Real>, half_extents: Vector<Real>) -> Self {
        let q = pose.rotation.coords;
        Self {
            position: pose.translation.vector.into(),
            rotation: [q.x, q.y, q.z, q.w],
            half_extents: half_extents.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugWheel {
    pub index: usize,
    pub attach: [f32; 3],       // world space
    pub radius: f32,
    pub grounded: bool,
    pub tension: f32,
    pub distance: f32,
    pub steering_angle: f32,
    pub steering: bool,
    pub drive: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugOverlay {
    pub chassis: Option<DebugChassis>,
    pub wheels: Vec<DebugWheel>,
    pub lines: DebugLines,
}

impl DebugOverlay {
    pub fn clear(&mut self) {
        self.chassis = None;
        self.wheels.clear();
        self.lines.clear();
    }
}
