use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SteerLeft,
    SteerRight,
    Accelerate,
    Reverse,
    Drift,
}

/// Named-action input, polled once per tick.
pub trait InputSource {
    /// Analog strength in [0, 1].
    fn strength(&self, action: Action) -> f32;
    fn pressed(&self, action: Action) -> bool;
}

/// One tick of driver intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverInput {
    pub steer: f32,         // +1 full left .. -1 full right
    pub accelerate: bool,
    pub reverse: bool,
    pub drift: bool,
}

impl DriverInput {
    pub fn poll(source: &dyn InputSource) -> Self {
        Self {
            steer: source.strength(Action::SteerLeft) - source.strength(Action::SteerRight),
            accelerate: source.pressed(Action::Accelerate),
            reverse: source.pressed(Action::Reverse),
            drift: source.pressed(Action::Drift),
        }
    }
}

/// Fixed action strengths, for headless runs and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub actions: HashMap<Action, f32>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: Action, strength: f32) -> Self {
        self.set(action, strength);
        self
    }

    pub fn set(&mut self, action: Action, strength: f32) {
        self.actions.insert(action, strength.clamp(0.0, 1.0));
    }

    pub fn release(&mut self, action: Action) {
        self.actions.remove(&action);
    }
}

impl InputSource for ScriptedInput {
    fn strength(&self, action: Action) -> f32 {
        self.actions.get(&action).copied().unwrap_or(0.0)
    }

    fn pressed(&self, action: Action) -> bool {
        self.strength(action) > 0.5
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: usize,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub speed: f32,
    pub steering_angle: f32,
    pub drifting: bool,
    pub grounded_wheels: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
    pub terrain_chunks: usize,
    pub road_ready: bool,
}
