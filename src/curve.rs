// ==============================================================================
// curve.rs — PIECEWISE-LINEAR RESPONSE CURVES
// ------------------------------------------------------------------------------
// Used for:
// - mountain remap in the height field (noise value → mountain weight)
// - tire slip falloff (slip ratio 0..1 → friction multiplier)
//
// Points are (x, y) pairs with ascending x. Sampling outside the covered range
// holds the first/last y.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCurve {
    points: Vec<[f32; 2]>,
}

impl ResponseCurve {
    pub fn new(points: Vec<[f32; 2]>) -> Result<Self, ConfigError> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    /// Tire-style falloff: full grip at zero slip, dropping to `floor` at full slip.
    pub fn slip_falloff(floor: f32) -> Self {
        Self { points: vec![[0.0, 1.0], [0.3, 0.9], [1.0, floor]] }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points.is_empty() {
            return Err(ConfigError::MalformedCurve);
        }
        let ascending = self.points.windows(2).all(|w| w[0][0] <= w[1][0]);
        let finite = self.points.iter().all(|p| p[0].is_finite() && p[1].is_finite());
        if ascending && finite { Ok(()) } else { Err(ConfigError::MalformedCurve) }
    }

    pub fn sample(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if x <= first[0] {
            return first[1];
        }
        if x >= last[0] {
            return last[1];
        }

        for w in self.points.windows(2) {
            let ([x0, y0], [x1, y1]) = (w[0], w[1]);
            if x <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                return y0 + (y1 - y0) * ((x - x0) / span);
            }
        }
        last[1]
    }
}
