//! Startup constants for the simulation.
//!
//! These are not player-facing settings. The defaults are the shipped
//! tuning; a JSON file may override any subset of them at startup.

use crate::types::Seconds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How often the engine writes the snapshot during a tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// One save after every sweep that changed state (up to three per tick).
    #[default]
    PerSweep,
    /// At most one save per tick, after all sweeps.
    PerTick,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Catalog size above which generation pauses.
    pub max_available_missions: usize,
    /// Minimum spacing between two generated missions.
    pub generation_interval: Seconds,
    /// How long a generated mission stays in the catalog before expiring.
    pub mission_lifespan: Seconds,
    /// Real time between two ticks while the host is running.
    pub tick_interval: Seconds,
    /// Offline gaps at or below this are ignored at startup.
    pub offline_threshold: Seconds,
    /// Hard floor on rolled mission durations.
    pub min_mission_duration: Seconds,
    /// Difficulty roll is uniform in `-difficulty_jitter..=difficulty_jitter`.
    pub difficulty_jitter: u32,
    /// Duration ratio is uniform in `1 ± duration_jitter`.
    pub duration_jitter: f64,
    /// Per-reward quantity ratio is uniform in `1 ± reward_jitter`.
    pub reward_jitter: f64,
    /// Master seed for a fresh snapshot. Drawn once from OS entropy if absent.
    pub seed: Option<u64>,
    pub save_policy: SavePolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_available_missions: 5,
            generation_interval: 120.0,
            mission_lifespan: 600.0,
            tick_interval: 1.0,
            offline_threshold: 1.0,
            min_mission_duration: 10.0,
            difficulty_jitter: 1,
            duration_jitter: 0.2,
            reward_jitter: 0.2,
            seed: None,
            save_policy: SavePolicy::PerSweep,
        }
    }
}

impl SimConfig {
    /// Load overrides from a JSON file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with a fixed seed. Used by tests and tooling.
    pub fn default_test(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.generation_interval > 0.0,
            "generation_interval must be positive (got {})",
            self.generation_interval
        );
        anyhow::ensure!(
            self.tick_interval > 0.0,
            "tick_interval must be positive (got {})",
            self.tick_interval
        );
        anyhow::ensure!(
            self.min_mission_duration > 0.0,
            "min_mission_duration must be positive (got {})",
            self.min_mission_duration
        );
        anyhow::ensure!(self.mission_lifespan >= 0.0, "mission_lifespan must not be negative");
        anyhow::ensure!(
            (0.0..1.0).contains(&self.duration_jitter) && (0.0..1.0).contains(&self.reward_jitter),
            "jitter ratios must lie in [0, 1)"
        );
        Ok(())
    }
}
