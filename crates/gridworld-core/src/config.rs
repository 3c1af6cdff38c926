//! World configuration loading.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::GridShape;

/// How the scheduler paces ticks against wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFocus {
    /// Sleep the remainder of each tick.
    #[default]
    ConstantTick,
    /// Sleep so total elapsed time tracks `ticks * tick_duration`.
    GlobalDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub grid: GridShape,

    /// Target wall-clock seconds per tick; 0 disables pacing.
    #[serde(default = "default_tick_duration")]
    pub tick_duration_secs: f64,

    pub time_focus: TimeFocus,

    /// Root of every per-agent seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_tick_duration() -> f64 {
    0.1
}
fn default_seed() -> u64 {
    1
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid: GridShape::default(),
            tick_duration_secs: default_tick_duration(),
            time_focus: TimeFocus::default(),
            seed: default_seed(),
        }
    }
}

impl WorldConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: GridShape::new(width, height),
            ..Self::default()
        }
    }

    pub fn with_tick_duration(mut self, secs: f64) -> Self {
        self.tick_duration_secs = secs;
        self
    }

    pub fn with_time_focus(mut self, focus: TimeFocus) -> Self {
        self.time_focus = focus;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Target duration of one tick, `None` when pacing is off. Zero, negative,
    /// non-finite and unrepresentably long durations all turn pacing off.
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_duration_secs > 0.0 {
            Duration::try_from_secs_f64(self.tick_duration_secs).ok()
        } else {
            None
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read world config from {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse world config from {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }
}
