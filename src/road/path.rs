// ==============================================================================
// path.rs — RESUMABLE ROAD PATH GENERATOR
// ------------------------------------------------------------------------------
// Phases, each advanced a bounded amount per step(budget) call:
//
// Relaxing   N anchors start on a circle of initial_radius. For iteration j
//            and anchor i:
//              t       = i / N
//              desired = lerp(range, tileable_noise(t * freq, freq) * .5 + .5)
//              diff    = (desired - y) * (1 - (j % 100) / 100)^0.25
//            diff > threshold => slide horizontally against the terrain
//            normal's horizontal part by diff * correction, plus a seeded
//            random kick every 100th iteration, then resample height.
//            One budget unit per anchor visit.
// Smoothing  tangent handles from the ring neighbours. One unit.
// Walking    RoadWalker traces anchor[i] -> anchor[i+1] around the ring.
//            One unit per walker step.
// Done       the finished RoadPath is handed out.
// ==============================================================================

use std::f32::consts::PI;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rapier3d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::debug_builders::{DebugSink, COLOR_ANCHOR, COLOR_WALKER};
use crate::error::{ensure_positive, ensure_range, ConfigError, RoadError};
use crate::math::{horizontal, lerp, safe_normalize};
use crate::road::walker::{heading_toward, RoadWalker, WalkerConfig};
use crate::terrain::{FractalNoise, HeightSampler, NoiseLayer};

const EPOCH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    pub num_points: usize,
    pub iterations: usize,
    pub initial_radius: Real,
    pub smooth_weight: Real,
    pub elevation_noise: NoiseLayer,
    pub elevation_frequency: Real,
    pub elevation_range: [f32; 2],
    pub elevation_correction: Real,
    pub elevation_diff_threshold: Real,
    pub kick_distance: Real,            // random horizontal jump every 100th iteration
    pub seed: u64,                      // kick direction generator
    pub debug_normal_length: Real,
    pub walker: WalkerConfig,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            num_points: 8,
            iterations: 1000,
            initial_radius: 4.0,
            smooth_weight: 0.25,
            elevation_noise: NoiseLayer::default(),
            elevation_frequency: 64.0,
            elevation_range: [-16.0, 64.0],
            elevation_correction: 0.5,
            elevation_diff_threshold: 1.0,
            kick_distance: 256.0,
            seed: 137,
            debug_normal_length: 16.0,
            walker: WalkerConfig::default(),
        }
    }
}

impl RoadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_points < 3 {
            return Err(ConfigError::TooFewAnchors(self.num_points));
        }
        ensure_positive("road.elevation_frequency", self.elevation_frequency)?;
        ensure_range("road.elevation_range", self.elevation_range[0], self.elevation_range[1])?;
        self.elevation_noise.validate("road.elevation_noise.period")?;
        self.walker.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoadAnchor {
    pub position: Point<Real>,
    pub handle_in: Vector<Real>,
    pub handle_out: Vector<Real>,
}

impl RoadAnchor {
    fn at(position: Point<Real>) -> Self {
        Self { position, handle_in: Vector::zeros(), handle_out: Vector::zeros() }
    }
}

/// A finished road: the relaxed, smoothed loop plus the dense walked trail.
#[derive(Debug, Clone, Serialize)]
pub struct RoadPath {
    pub anchors: Vec<RoadAnchor>,
    pub points: Vec<Point<Real>>,
}

#[derive(Debug, Clone)]
pub enum GenerationStatus {
    Pending,
    Done(RoadPath),
}

impl GenerationStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, GenerationStatus::Done(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Relaxing { iteration: usize, anchor: usize },
    Smoothing,
    Walking { segment: usize, steps: usize },
    Done,
}

/// 1D noise that wraps with period `w`: blends F(x) and F(x - w) so that
/// x = 0 and x = w sample the same value.
pub fn tileable_noise_1d(noise: &FractalNoise, x: Real, w: Real) -> Real {
    let x = x as f64;
    let w = w as f64;
    let curr = noise.sample_1d(x) * (w - x);
    let prev = noise.sample_1d(x - w) * x;
    ((curr + prev) / w) as Real
}

pub struct RoadPathGenerator {
    config: RoadConfig,
    terrain: Arc<dyn HeightSampler>,
    noise: FractalNoise,
    rng: Pcg32,

    anchors: Vec<RoadAnchor>,
    anchor_lines: Vec<usize>,
    phase: Phase,

    walker: Option<RoadWalker>,
    points: Vec<Point<Real>>,
    finished: Option<RoadPath>,
}

impl RoadPathGenerator {
    pub fn new(config: RoadConfig, terrain: Arc<dyn HeightSampler>) -> Result<Self, ConfigError> {
        config.validate()?;

        let n = config.num_points;
        let anchors = (0..n)
            .map(|i| {
                let a = i as Real / n as Real * PI * 2.0;
                let x = a.cos() * config.initial_radius;
                let z = a.sin() * config.initial_radius;
                let y = clamp_elevation(&config, terrain.height(x, z));
                RoadAnchor::at(Point::new(x, y, z))
            })
            .collect();

        let noise = FractalNoise::new(config.elevation_noise.clone());
        let rng = Pcg32::seed_from_u64(config.seed);
        let phase = if config.iterations > 0 {
            Phase::Relaxing { iteration: 0, anchor: 0 }
        } else {
            Phase::Smoothing
        };

        Ok(Self {
            config,
            terrain,
            noise,
            rng,
            anchors,
            anchor_lines: Vec::new(),
            phase,
            walker: None,
            points: Vec::new(),
            finished: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn anchors(&self) -> &[RoadAnchor] {
        &self.anchors
    }

    pub fn points(&self) -> &[Point<Real>] {
        &self.points
    }

    /// Advance by at most `budget` units of work.
    pub fn step(&mut self, budget: usize, debug: &mut dyn DebugSink) -> Result<GenerationStatus, RoadError> {
        if self.anchor_lines.is_empty() {
            self.draw_anchors(debug);
        }

        let mut remaining = budget.max(1);
        while remaining > 0 {
            match self.phase {
                Phase::Relaxing { iteration, anchor } => {
                    self.relax_anchor(iteration, anchor, debug);
                    self.phase = self.next_relax_phase(iteration, anchor);
                }
                Phase::Smoothing => {
                    self.smooth();
                    self.start_walk();
                    self.phase = Phase::Walking { segment: 0, steps: 0 };
                }
                Phase::Walking { segment, steps } => {
                    self.phase = self.walk_step(segment, steps, debug)?;
                }
                Phase::Done => break,
            }
            remaining -= 1;
        }

        if self.phase == Phase::Done {
            let path = match &self.finished {
                Some(path) => path.clone(),
                None => {
                    let path = RoadPath { anchors: self.anchors.clone(), points: self.points.clone() };
                    info!(anchors = path.anchors.len(), points = path.points.len(), "road path generated");
                    self.finished = Some(path.clone());
                    path
                }
            };
            return Ok(GenerationStatus::Done(path));
        }
        Ok(GenerationStatus::Pending)
    }

    fn draw_anchors(&mut self, debug: &mut dyn DebugSink) {
        let len = self.config.debug_normal_length;
        self.anchor_lines = self
            .anchors
            .iter()
            .map(|a| {
                let p = a.position;
                debug.add_line(p, p + self.terrain.normal(p.x, p.z) * len, COLOR_ANCHOR)
            })
            .collect();
    }

    fn next_relax_phase(&self, iteration: usize, anchor: usize) -> Phase {
        if anchor + 1 < self.anchors.len() {
            return Phase::Relaxing { iteration, anchor: anchor + 1 };
        }
        if iteration + 1 < self.config.iterations {
            if (iteration + 1) % EPOCH == 0 {
                debug!(iteration = iteration + 1, "road relaxation epoch");
            }
            return Phase::Relaxing { iteration: iteration + 1, anchor: 0 };
        }
        Phase::Smoothing
    }

    /// Target elevation for anchor `index` from the looping noise profile.
    pub fn desired_height(&self, index: usize) -> Real {
        let cfg = &self.config;
        let t = index as Real / self.anchors.len() as Real;
        let n = tileable_noise_1d(&self.noise, t * cfg.elevation_frequency, cfg.elevation_frequency);
        lerp(cfg.elevation_range[0], cfg.elevation_range[1], n * 0.5 + 0.5)
    }

    fn relax_anchor(&mut self, iteration: usize, index: usize, debug: &mut dyn DebugSink) {
        let desired = self.desired_height(index);
        let cfg = &self.config;
        let mut p = self.anchors[index].position;

        let weight = (1.0 - (iteration % EPOCH) as Real / EPOCH as Real).powf(0.25);
        let diff = (desired - p.y) * weight;
        if diff <= cfg.elevation_diff_threshold {
            return;
        }

        let terrain_normal = self.terrain.normal(p.x, p.z);
        let slide = safe_normalize(horizontal(terrain_normal), Vector::zeros());
        p.x -= slide.x * diff * cfg.elevation_correction;
        p.z -= slide.z * diff * cfg.elevation_correction;

        if (iteration + 1) % EPOCH == 0 {
            let angle = self.rng.gen_range(0.0..1.0) * PI * 4.0;
            p.x += angle.cos() * cfg.kick_distance;
            p.z += angle.sin() * cfg.kick_distance;
        }

        p.y = clamp_elevation(cfg, self.terrain.height(p.x, p.z));
        self.anchors[index].position = p;

        if let Some(&line) = self.anchor_lines.get(index) {
            let normal = self.terrain.normal(p.x, p.z);
            debug.update_line(line, p, p + normal * cfg.debug_normal_length, COLOR_ANCHOR);
        }
    }

    /// Tangent handles from the ring neighbours of every anchor.
    fn smooth(&mut self) {
        let n = self.anchors.len();
        let w = self.config.smooth_weight;
        let positions: Vec<Point<Real>> = self.anchors.iter().map(|a| a.position).collect();

        for (i, anchor) in self.anchors.iter_mut().enumerate() {
            let p = positions[i];
            let to_prev = positions[(i + n - 1) % n] - p;
            let to_next = positions[(i + 1) % n] - p;

            let dir = safe_normalize(
                safe_normalize(to_prev, Vector::zeros()) - safe_normalize(to_next, Vector::zeros()),
                Vector::zeros(),
            );
            anchor.handle_in = dir * to_prev.norm() * w;
            anchor.handle_out = -dir * to_next.norm() * w;
        }
    }

    fn start_walk(&mut self) {
        let first = self.anchors[0].position;
        let start = Point::new(first.x, self.terrain.height(first.x, first.z), first.z);
        let heading = heading_toward(&start, &self.anchors[1].position);

        self.points.clear();
        self.points.push(start);
        self.walker = Some(RoadWalker::new(start, heading, self.config.walker.clone()));
    }

    fn walk_step(&mut self, segment: usize, steps: usize, debug: &mut dyn DebugSink) -> Result<Phase, RoadError> {
        let n = self.anchors.len();
        let target = self.anchors[(segment + 1) % n].position;
        let Some(walker) = self.walker.as_mut() else {
            return Ok(Phase::Smoothing);
        };

        match walker.advance(self.terrain.as_ref(), &target, segment, steps)? {
            Some(p) => {
                self.points.push(p);
                let normal = self.terrain.normal(p.x, p.z);
                debug.add_line(p, p + normal * self.config.debug_normal_length, COLOR_WALKER);
                Ok(Phase::Walking { segment, steps: steps + 1 })
            }
            None => {
                debug!(segment, steps, "road segment walked");
                Ok(if segment + 1 < n {
                    Phase::Walking { segment: segment + 1, steps: 0 }
                } else {
                    Phase::Done
                })
            }
        }
    }
}

#[inline]
fn clamp_elevation(config: &RoadConfig, y: Real) -> Real {
    y.clamp(config.elevation_range[0], config.elevation_range[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_builders::{DebugLines, NullDebug};
    use crate::road::walker::tests::flat;
    use crate::terrain::{HeightField, HeightFieldConfig};

    fn quick_config() -> RoadConfig {
        RoadConfig { iterations: 200, ..Default::default() }
    }

    fn run_to_end(generator: &mut RoadPathGenerator) -> RoadPath {
        for _ in 0..100_000 {
            if let GenerationStatus::Done(path) = generator.step(64, &mut NullDebug).unwrap() {
                return path;
            }
        }
        panic!("generation never finished");
    }

    #[test]
    fn test_rejects_fewer_than_three_anchors() {
        let cfg = RoadConfig { num_points: 2, ..Default::default() };
        let err = RoadPathGenerator::new(cfg, Arc::new(flat())).err();
        assert!(matches!(err, Some(ConfigError::TooFewAnchors(2))));
    }

    #[test]
    fn test_initial_anchors_sit_on_circle() {
        let generator = RoadPathGenerator::new(RoadConfig::default(), Arc::new(flat())).unwrap();
        assert_eq!(generator.anchors().len(), 8);
        for a in generator.anchors() {
            let r = (a.position.x.powi(2) + a.position.z.powi(2)).sqrt();
            assert!((r - 4.0).abs() < 1e-5);
            assert_eq!(a.position.y, 0.0);
        }
    }

    #[test]
    fn test_tileable_noise_wraps() {
        let noise = FractalNoise::new(NoiseLayer::default());
        let a = tileable_noise_1d(&noise, 0.0, 64.0);
        let b = tileable_noise_1d(&noise, 64.0, 64.0);
        assert!((a - b).abs() < 1e-6);
        for i in 0..64 {
            let v = tileable_noise_1d(&noise, i as f32, 64.0);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_step_respects_budget() {
        let mut generator = RoadPathGenerator::new(RoadConfig::default(), Arc::new(flat())).unwrap();
        let status = generator.step(5, &mut NullDebug).unwrap();
        assert!(!status.is_done());
        assert_eq!(generator.phase(), Phase::Relaxing { iteration: 0, anchor: 5 });

        generator.step(3, &mut NullDebug).unwrap();
        assert_eq!(generator.phase(), Phase::Relaxing { iteration: 1, anchor: 0 });
    }

    #[test]
    fn test_anchor_heights_stay_in_elevation_range() {
        let field = HeightField::new(&HeightFieldConfig::default()).unwrap();
        let cfg = RoadConfig { iterations: 300, ..Default::default() };
        let [lo, hi] = cfg.elevation_range;
        let mut generator = RoadPathGenerator::new(cfg, Arc::new(field)).unwrap();

        while matches!(generator.phase(), Phase::Relaxing { .. }) {
            generator.step(64, &mut NullDebug).unwrap();
        }
        for a in generator.anchors() {
            assert!(a.position.y >= lo && a.position.y <= hi, "anchor y {}", a.position.y);
        }
    }

    /// Uphill along +x, centred on 1002 so the 4-unit ring never leaves [1000, 1004].
    struct Slope;

    impl HeightSampler for Slope {
        fn height(&self, x: Real, _z: Real) -> Real {
            1002.0 + 0.5 * x
        }
    }

    #[test]
    fn test_relaxation_moves_anchors_toward_desired_height() {
        // fewer iterations than one kick epoch, and a range the slope never clamps against
        let cfg = RoadConfig { iterations: 50, elevation_range: [1000.0, 3000.0], ..Default::default() };
        let threshold = cfg.elevation_diff_threshold;
        let mut g = RoadPathGenerator::new(cfg, Arc::new(Slope)).unwrap();

        let before: Vec<Real> = g.anchors().iter().map(|a| a.position.y).collect();
        let desired: Vec<Real> = (0..before.len()).map(|i| g.desired_height(i)).collect();
        while matches!(g.phase(), Phase::Relaxing { .. }) {
            g.step(64, &mut NullDebug).unwrap();
        }

        let mut moved = 0;
        for (i, a) in g.anchors().iter().enumerate() {
            let (y0, y1, want) = (before[i], a.position.y, desired[i]);
            // anchors stay on the terrain surface
            assert!((y1 - Slope.height(a.position.x, a.position.z)).abs() < 1e-2);
            if want - y0 > threshold {
                assert!(y1 > y0, "anchor {i} did not climb: {y0} -> {y1}");
                assert!((want - y1).abs() < (want - y0).abs(), "anchor {i} moved away from {want}");
                moved += 1;
            } else {
                assert_eq!(y1, y0);
            }
        }
        assert!(moved > 0);
    }

    #[test]
    fn test_finished_path_serializes_points_as_arrays() {
        let mut g = RoadPathGenerator::new(quick_config(), Arc::new(flat())).unwrap();
        let path = run_to_end(&mut g);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json["anchors"].as_array().map(Vec::len), Some(8));
        assert_eq!(json["anchors"][0]["position"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["anchors"][0]["handle_in"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["points"].as_array().map(Vec::len), Some(path.points.len()));
    }

    #[test]
    fn test_relaxation_is_deterministic() {
        let run = || {
            let field = HeightField::new(&HeightFieldConfig::default()).unwrap();
            let mut g = RoadPathGenerator::new(quick_config(), Arc::new(field)).unwrap();
            while matches!(g.phase(), Phase::Relaxing { .. }) {
                g.step(100, &mut NullDebug).unwrap();
            }
            g.anchors().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_kicks_move_anchors_on_flat_terrain() {
        // flat ground never nudges, so any horizontal motion is a kick
        let cfg = RoadConfig { iterations: 100, elevation_range: [100.0, 200.0], ..Default::default() };
        let mut g = RoadPathGenerator::new(cfg, Arc::new(flat())).unwrap();
        while matches!(g.phase(), Phase::Relaxing { .. }) {
            g.step(64, &mut NullDebug).unwrap();
        }
        for a in g.anchors() {
            let r = (a.position.x.powi(2) + a.position.z.powi(2)).sqrt();
            assert!(r > 200.0, "anchor was not kicked: r = {r}");
        }
    }

    #[test]
    fn test_smoothing_handles_follow_ring_neighbours() {
        let cfg = RoadConfig { iterations: 0, ..Default::default() };
        let mut g = RoadPathGenerator::new(cfg, Arc::new(flat())).unwrap();
        g.step(1, &mut NullDebug).unwrap();

        let anchors = g.anchors();
        let side = 2.0 * 4.0 * (PI / 8.0).sin();
        for a in anchors {
            assert!((a.handle_in.norm() - side * 0.25).abs() < 1e-4);
            assert!((a.handle_out.norm() - side * 0.25).abs() < 1e-4);
            // on a circle the handles are tangent, perpendicular to the radius
            let radial = a.position.coords.normalize();
            assert!(a.handle_in.dot(&radial).abs() < 1e-4);
            assert!((a.handle_in + a.handle_out).norm() < 1e-4);
        }
    }

    #[test]
    fn test_walk_closes_the_loop() {
        let mut g = RoadPathGenerator::new(quick_config(), Arc::new(flat())).unwrap();
        let path = run_to_end(&mut g);
        assert_eq!(path.anchors.len(), 8);
        assert!(path.points.len() > 8);

        let start = path.points[0];
        let end = path.points.last().copied().unwrap_or(start);
        assert!(crate::math::horizontal_distance(&start, &end) <= 8.0 + 1e-3);
        // consecutive points are one walker step apart
        for w in path.points.windows(2) {
            assert!((crate::math::horizontal_distance(&w[0], &w[1]) - 8.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_done_is_sticky() {
        let cfg = RoadConfig { iterations: 0, ..Default::default() };
        let mut g = RoadPathGenerator::new(cfg, Arc::new(flat())).unwrap();
        let first = run_to_end(&mut g);
        let again = g.step(1, &mut NullDebug).unwrap();
        match again {
            GenerationStatus::Done(path) => assert_eq!(path.points, first.points),
            GenerationStatus::Pending => panic!("finished generator went back to pending"),
        }
    }

    /// Level only in a small patch around (40, 0), sheer everywhere else.
    struct Pit;

    impl HeightSampler for Pit {
        fn height(&self, x: Real, z: Real) -> Real {
            if (x - 40.0).abs() < 1.0 && z.abs() < 1.0 { 0.0 } else { 100.0 }
        }
    }

    #[test]
    fn test_blocked_walker_surfaces_stall() {
        let cfg = RoadConfig {
            iterations: 0,
            initial_radius: 40.0,
            elevation_range: [-1000.0, 1000.0],
            ..Default::default()
        };
        let mut g = RoadPathGenerator::new(cfg, Arc::new(Pit)).unwrap();
        let err = loop {
            match g.step(64, &mut NullDebug) {
                Ok(GenerationStatus::Pending) => continue,
                Ok(GenerationStatus::Done(_)) => panic!("walked out of the pit"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, RoadError::WalkerStalled { segment: 0, .. }));
    }

    #[test]
    fn test_debug_lines_track_anchors_and_steps() {
        let cfg = RoadConfig { iterations: 0, ..Default::default() };
        let mut g = RoadPathGenerator::new(cfg, Arc::new(flat())).unwrap();
        let mut lines = DebugLines::new();
        g.step(1, &mut lines).unwrap();
        assert_eq!(lines.len(), 8);
        while !g.step(16, &mut lines).unwrap().is_done() {}
        // one line per anchor plus one per walked point after the start
        assert_eq!(lines.len(), 8 + g.points().len() - 1);
    }
}
