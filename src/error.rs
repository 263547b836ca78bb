//! Error types shared by configuration, vehicle setup and road generation.

use rapier3d::prelude::{Point, Real};

/// Rejected configuration. Raised at setup so bad tunables never reach the
/// simulation as NaN geometry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("vehicle has no wheels")]
    NoWheels,

    #[error("road needs at least 3 anchors, got {0}")]
    TooFewAnchors(usize),

    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} range is inverted: min {min} > max {max}")]
    InvertedRange { field: &'static str, min: f32, max: f32 },

    #[error("response curve needs at least one point with ascending x")]
    MalformedCurve,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of an in-flight road generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoadError {
    #[error("a road generation is already in flight")]
    AlreadyGenerating,

    #[error("road generation cancelled")]
    Cancelled,

    #[error("walker stalled on segment {segment} at {position:?}: no traversable heading")]
    WalkerStalled { segment: usize, position: Point<Real> },

    #[error("walker exceeded {steps} steps on segment {segment}")]
    StepBudget { segment: usize, steps: usize },

    #[error("road config rejected: {0}")]
    InvalidConfig(String),
}

/// Check `value > 0` for a named tunable.
pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_range(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field, min, max })
    }
}
