//! Deterministic terrain sampler built from two stacked OpenSimplex fields.
//!
//! `height = lerp(min, max, base01 * curve(mountain01))` where each field is a
//! fractal (multi-octave) noise remapped from `[-1,1]` into `[0,1]`. The normal
//! is a forward finite difference at unit offsets. Nothing is cached: the same
//! input always yields the same output, and the sampler is `Send + Sync` so
//! chunk builders on worker threads can share it.

use noise::{NoiseFn, OpenSimplex};
use rapier3d::prelude::{Real, Vector};
use serde::{Deserialize, Serialize};

use crate::curve::ResponseCurve;
use crate::error::{ensure_positive, ensure_range, ConfigError};

/// One fractal noise layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayer {
    /// Random seed
    pub seed: u32,
    /// World units per noise cycle of the first octave
    pub period: f64,
    /// Number of octaves for fractal noise
    pub octaves: u32,
    /// Amplitude multiplier per octave
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self {
            seed: 0,
            period: 64.0,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseLayer {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed, ..Default::default() }
    }

    pub fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        ensure_positive(field, self.period as f32)?;
        if self.octaves == 0 {
            return Err(ConfigError::NonPositive { field, value: 0.0 });
        }
        Ok(())
    }
}

/// A built noise layer, ready to sample.
#[derive(Clone)]
pub struct FractalNoise {
    layer: NoiseLayer,
    source: OpenSimplex,
}

impl FractalNoise {
    pub fn new(layer: NoiseLayer) -> Self {
        let source = OpenSimplex::new(layer.seed);
        Self { layer, source }
    }

    /// Fractal Brownian motion in roughly `[-1, 1]`.
    pub fn sample_2d(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0 / self.layer.period;
        let mut max_value = 0.0;

        for _ in 0..self.layer.octaves {
            total += self.source.get([x * frequency, y * frequency]) * amplitude;
            max_value += amplitude;
            amplitude *= self.layer.persistence;
            frequency *= self.layer.lacunarity;
        }

        if max_value > 0.0 { total / max_value } else { 0.0 }
    }

    /// 1D slice through the 2D field.
    pub fn sample_1d(&self, x: f64) -> f64 {
        self.sample_2d(x, 1.0)
    }

    /// `sample_2d` remapped into `[0, 1]`.
    pub fn sample_01(&self, x: f64, y: f64) -> f32 {
        ((self.sample_2d(x, y) * 0.5 + 0.5).clamp(0.0, 1.0)) as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightFieldConfig {
    pub base_noise: NoiseLayer,
    pub mountain_noise: NoiseLayer,
    pub mountain_curve: Option<ResponseCurve>,
    pub height_range: [f32; 2],     // [min, max] elevation
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        Self {
            base_noise: NoiseLayer { seed: 1, period: 256.0, ..Default::default() },
            mountain_noise: NoiseLayer { seed: 2, period: 512.0, octaves: 2, ..Default::default() },
            mountain_curve: None,
            height_range: [-32.0, 64.0],
        }
    }
}

impl HeightFieldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_noise.validate("terrain.base_noise.period")?;
        self.mountain_noise.validate("terrain.mountain_noise.period")?;
        if let Some(curve) = &self.mountain_curve {
            curve.validate()?;
        }
        ensure_range("terrain.height_range", self.height_range[0], self.height_range[1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightSample {
    pub height: Real,
    pub normal: Vector<Real>,
}

/// Anything that answers height queries on the XZ plane. The road walker and
/// generator only need this much of the terrain.
pub trait HeightSampler: Send + Sync {
    fn height(&self, x: Real, z: Real) -> Real;

    fn normal(&self, x: Real, z: Real) -> Vector<Real> {
        let hc = self.height(x, z);
        let hx = self.height(x + 1.0, z);
        let hz = self.height(x, z + 1.0);

        // y component is always 1, so this never degenerates
        Vector::new(-(hx - hc), 1.0, -(hz - hc)).normalize()
    }
}

#[derive(Clone)]
pub struct HeightField {
    base: FractalNoise,
    mountain: FractalNoise,
    mountain_curve: Option<ResponseCurve>,
    height_range: [f32; 2],
}

impl HeightField {
    pub fn new(config: &HeightFieldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base: FractalNoise::new(config.base_noise.clone()),
            mountain: FractalNoise::new(config.mountain_noise.clone()),
            mountain_curve: config.mountain_curve.clone(),
            height_range: config.height_range,
        })
    }

    pub fn height_range(&self) -> [f32; 2] {
        self.height_range
    }

    pub fn height(&self, x: Real, z: Real) -> Real {
        let base = self.base.sample_01(x as f64, z as f64);
        let mut mountain = self.mountain.sample_01(x as f64, z as f64);

        if let Some(curve) = &self.mountain_curve {
            mountain = curve.sample(mountain);
        }

        let [min, max] = self.height_range;
        min + (max - min) * (base * mountain)
    }

    pub fn normal(&self, x: Real, z: Real) -> Vector<Real> {
        HeightSampler::normal(self, x, z)
    }

    pub fn sample(&self, x: Real, z: Real) -> HeightSample {
        HeightSample { height: self.height(x, z), normal: self.normal(x, z) }
    }
}

impl HeightSampler for HeightField {
    fn height(&self, x: Real, z: Real) -> Real {
        HeightField::height(self, x, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> HeightField {
        HeightField::new(&HeightFieldConfig::default()).unwrap()
    }

    #[test]
    fn test_height_is_deterministic() {
        let a = field();
        let b = field();
        for &(x, z) in &[(0.0, 0.0), (12.5, -40.0), (1000.0, 333.3), (-77.7, 5.0)] {
            assert_eq!(a.height(x, z), a.height(x, z));
            assert_eq!(a.height(x, z), b.height(x, z));
        }
    }

    #[test]
    fn test_height_stays_in_range() {
        let f = field();
        let [min, max] = f.height_range();
        for i in 0..200 {
            let x = i as f32 * 13.7 - 900.0;
            let z = i as f32 * -7.3 + 250.0;
            let h = f.height(x, z);
            assert!(h >= min && h <= max, "height {h} outside [{min}, {max}]");
        }
    }

    #[test]
    fn test_normal_is_unit_and_points_up() {
        let f = field();
        for i in 0..50 {
            let n = f.normal(i as f32 * 31.0, i as f32 * -17.0);
            assert!((n.norm() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.0);
        }
    }

    #[test]
    fn test_flat_range_gives_flat_terrain() {
        let cfg = HeightFieldConfig { height_range: [5.0, 5.0], ..Default::default() };
        let f = HeightField::new(&cfg).unwrap();
        let s = f.sample(42.0, -3.0);
        assert_eq!(s.height, 5.0);
        assert!((s.normal - Vector::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_mountain_curve_zero_flattens_to_min() {
        let cfg = HeightFieldConfig {
            mountain_curve: Some(ResponseCurve::new(vec![[0.0, 0.0], [1.0, 0.0]]).unwrap()),
            ..Default::default()
        };
        let f = HeightField::new(&cfg).unwrap();
        assert_eq!(f.height(10.0, 20.0), cfg.height_range[0]);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let cfg = HeightFieldConfig { height_range: [10.0, -10.0], ..Default::default() };
        assert!(matches!(HeightField::new(&cfg), Err(ConfigError::InvertedRange { .. })));
    }

    #[test]
    fn test_sampler_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HeightField>();
    }
}
