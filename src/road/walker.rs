// ==============================================================================
// walker.rs — GREEDY TERRAIN-CONFORMING ROAD WALKER
// ------------------------------------------------------------------------------
// One step:
// - sweep offsets -look_angle..=+look_angle (1° increments) around heading
// - candidate = position + (cos, 0, sin)(heading + offset) * look_spacing,
//   y sampled from the terrain
// - slope = (candidate.y - position.y) / look_spacing, |slope| > max_slope is
//   rejected as untraversable
// - fitness = dir(candidate) · dir(target) - |slope|, first strict max wins
// - nothing admissible => Blocked, the walker stays put
//
// Heading is an angle in the XZ plane measured as atan2(dz, dx).
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, ConfigError, RoadError};
use crate::math::{horizontal_distance, safe_normalize};
use crate::terrain::HeightSampler;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    pub look_angle: Real,               // degrees either side of the heading
    pub look_spacing: Real,             // step length
    pub max_slope: Real,                // rise over run
    pub max_steps_per_segment: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            look_angle: 70.0,
            look_spacing: 8.0,
            max_slope: 0.5,
            max_steps_per_segment: 4096,
        }
    }
}

impl WalkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("road.walker.look_spacing", self.look_spacing)?;
        ensure_positive("road.walker.max_slope", self.max_slope)?;
        if !(0.0..=180.0).contains(&self.look_angle) {
            return Err(ConfigError::NonPositive { field: "road.walker.look_angle", value: self.look_angle });
        }
        if self.max_steps_per_segment == 0 {
            return Err(ConfigError::NonPositive { field: "road.walker.max_steps_per_segment", value: 0.0 });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct RoadWalker {
    pub position: Point<Real>,
    pub heading: Real,                  // radians
    config: WalkerConfig,
}

/// XZ-plane heading from `from` toward `to`.
#[inline]
pub fn heading_toward(from: &Point<Real>, to: &Point<Real>) -> Real {
    (to.z - from.z).atan2(to.x - from.x)
}

impl RoadWalker {
    pub fn new(position: Point<Real>, heading: Real, config: WalkerConfig) -> Self {
        Self { position, heading, config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Within one step of `target` on the XZ plane.
    pub fn arrived(&self, target: &Point<Real>) -> bool {
        horizontal_distance(&self.position, target) <= self.config.look_spacing
    }

    pub fn step(&mut self, terrain: &dyn HeightSampler, target: &Point<Real>) -> StepOutcome {
        let spacing = self.config.look_spacing;
        let target_dir = safe_normalize(target - self.position, Vector::zeros());

        let mut best: Option<(Real, Point<Real>, Real)> = None;
        let sweep = (2.0 * self.config.look_angle).floor() as i32;

        for k in 0..=sweep {
            let offset = (k as Real - self.config.look_angle).to_radians();
            let heading = self.heading + offset;

            let mut candidate = self.position + Vector::new(heading.cos(), 0.0, heading.sin()) * spacing;
            candidate.y = terrain.height(candidate.x, candidate.z);

            let slope = (candidate.y - self.position.y) / spacing;
            if slope.abs() > self.config.max_slope {
                continue;
            }

            let dir = safe_normalize(candidate - self.position, Vector::zeros());
            let fitness = dir.dot(&target_dir) - slope.abs();
            if best.is_none_or(|(f, _, _)| fitness > f) {
                best = Some((fitness, candidate, heading));
            }
        }

        match best {
            Some((_, position, heading)) => {
                self.position = position;
                self.heading = heading;
                StepOutcome::Moved
            }
            None => StepOutcome::Blocked,
        }
    }

    /// One resumable unit of a segment walk. `Ok(None)` once arrived,
    /// `Ok(Some(p))` after moving to `p`. `steps` is how many moves this
    /// segment has already taken.
    pub fn advance(
        &mut self,
        terrain: &dyn HeightSampler,
        target: &Point<Real>,
        segment: usize,
        steps: usize,
    ) -> Result<Option<Point<Real>>, RoadError> {
        if self.arrived(target) {
            return Ok(None);
        }
        if steps >= self.config.max_steps_per_segment {
            return Err(RoadError::StepBudget { segment, steps });
        }
        match self.step(terrain, target) {
            StepOutcome::Moved => Ok(Some(self.position)),
            StepOutcome::Blocked => Err(RoadError::WalkerStalled { segment, position: self.position }),
        }
    }

    /// Walk a whole segment in one go, collecting every visited position.
    /// The road generator drives `advance` itself so it can yield mid-segment.
    pub fn walk_to(
        &mut self,
        terrain: &dyn HeightSampler,
        target: &Point<Real>,
        segment: usize,
    ) -> Result<Vec<Point<Real>>, RoadError> {
        let mut trail = Vec::new();
        while let Some(p) = self.advance(terrain, target, segment, trail.len())? {
            trail.push(p);
        }
        Ok(trail)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `height = rise * x + rise_z * z`
    pub(crate) struct Ramp {
        pub rise: Real,
        pub rise_z: Real,
    }

    impl HeightSampler for Ramp {
        fn height(&self, x: Real, z: Real) -> Real {
            self.rise * x + self.rise_z * z
        }
    }

    pub(crate) fn flat() -> Ramp {
        Ramp { rise: 0.0, rise_z: 0.0 }
    }

    #[test]
    fn test_flat_terrain_walks_straight_at_target() {
        let target = Point::new(100.0, 0.0, 0.0);
        let mut w = RoadWalker::new(Point::origin(), heading_toward(&Point::origin(), &target), WalkerConfig::default());
        assert_eq!(w.step(&flat(), &target), StepOutcome::Moved);
        assert!(w.heading.abs() < 1e-6);
        assert!((w.position - Point::new(8.0, 0.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn test_steep_candidates_are_never_chosen() {
        // straight ahead rises 0.8 per unit, too steep
        let ramp = Ramp { rise: 0.8, rise_z: 0.0 };
        let target = Point::new(200.0, 160.0, 0.0);
        let mut w = RoadWalker::new(Point::origin(), 0.0, WalkerConfig::default());

        for _ in 0..20 {
            let before = w.position;
            if w.step(&ramp, &target) == StepOutcome::Blocked {
                break;
            }
            let slope = (w.position.y - before.y) / 8.0;
            assert!(slope.abs() <= 0.5 + 1e-5, "slope {slope}");
        }
    }

    #[test]
    fn test_wall_blocks_without_moving() {
        let wall = Ramp { rise: 10.0, rise_z: 0.0 };
        let mut w = RoadWalker::new(Point::new(1.0, 10.0, 2.0), 0.0, WalkerConfig::default());
        assert_eq!(w.step(&wall, &Point::new(50.0, 0.0, 2.0)), StepOutcome::Blocked);
        assert_eq!(w.position, Point::new(1.0, 10.0, 2.0));
        assert_eq!(w.heading, 0.0);
    }

    #[test]
    fn test_walk_to_arrives_within_one_step() {
        let target = Point::new(-30.0, 0.0, 45.0);
        let start = Point::origin();
        let mut w = RoadWalker::new(start, heading_toward(&start, &target), WalkerConfig::default());
        let trail = w.walk_to(&flat(), &target, 0).unwrap();
        assert!(!trail.is_empty());
        assert!(horizontal_distance(&w.position, &target) <= 8.0);
        assert_eq!(trail.last().copied(), Some(w.position));
    }

    #[test]
    fn test_walk_to_reports_stall_and_budget() {
        let wall = Ramp { rise: 10.0, rise_z: 0.0 };
        let mut w = RoadWalker::new(Point::origin(), 0.0, WalkerConfig::default());
        let err = w.walk_to(&wall, &Point::new(100.0, 0.0, 0.0), 3).unwrap_err();
        assert!(matches!(err, RoadError::WalkerStalled { segment: 3, .. }));

        let cfg = WalkerConfig { max_steps_per_segment: 2, ..Default::default() };
        let mut w = RoadWalker::new(Point::origin(), 0.0, cfg);
        let err = w.walk_to(&flat(), &Point::new(100.0, 0.0, 0.0), 1).unwrap_err();
        assert_eq!(err, RoadError::StepBudget { segment: 1, steps: 2 });
    }

    #[test]
    fn test_advance_reports_arrival_without_moving() {
        let target = Point::new(4.0, 0.0, 0.0);
        let mut w = RoadWalker::new(Point::origin(), 0.0, WalkerConfig::default());
        assert_eq!(w.advance(&flat(), &target, 0, 0), Ok(None));
        assert_eq!(w.position, Point::origin());

        // the budget is checked against the caller's count, not an internal one
        let far = Point::new(100.0, 0.0, 0.0);
        assert_eq!(w.advance(&flat(), &far, 2, 4096), Err(RoadError::StepBudget { segment: 2, steps: 4096 }));
        assert_eq!(w.advance(&flat(), &far, 2, 0), Ok(Some(Point::new(8.0, 0.0, 0.0))));
    }

    #[test]
    fn test_target_behind_turns_at_most_look_angle() {
        let mut w = RoadWalker::new(Point::origin(), 0.0, WalkerConfig::default());
        w.step(&flat(), &Point::new(-100.0, 0.0, 0.0));
        // best available is a full 70° swing, either side scores the same so
        // the first (most negative) offset is kept
        assert!((w.heading - (-70f32).to_radians()).abs() < 1e-5);
    }
}
