//! Simulation configuration with documented constants
//!
//! All tuning numbers for the cognition core are collected here. The config
//! is passed explicitly to the world and the scheduler; there is no global
//! instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Configuration for the simulation systems
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === DETERMINISM ===
    /// Base seed for every per-being random stream
    ///
    /// Each being draws from a stream seeded by `(seed, tick, being)`, so a
    /// tick's outcome does not depend on which worker ran which think.
    pub seed: u64,

    // === TIME ===
    /// Logical tick rate of the fixed-rate driver
    pub ticks_per_second: u32,

    /// Length of a day in ticks (drives [`crate::core::TimePeriod`])
    pub ticks_per_day: u64,

    // === SCHEDULER ===
    /// Worker thread override for the think pool
    ///
    /// `None` uses `max(1, available_parallelism - 1)`, leaving one core to
    /// the tick driver.
    pub worker_threads: Option<usize>,

    // === PERCEPTION ===
    /// Broad observation radius (cells, Chebyshev) for raw observation data
    ///
    /// Everything inside this square is handed to the perception filter,
    /// which then applies sight, hearing and smell.
    pub observation_radius: i32,

    /// How long a perceived entity stays in memory after it was last sensed
    ///
    /// At 8 ticks/sec the default of 3000 ticks is a little over six minutes.
    pub memory_retention_ticks: u64,

    // === MOVEMENT ===
    /// Movement points added per tick while a step is in progress
    ///
    /// A cardinal step on plain ground costs 1.0, so 0.5 means two ticks per
    /// cell. Overflow carries into the next step.
    pub movement_points_per_tick: f32,

    // === NAVIGATION ===
    /// Failed path (re)computations before a navigating activity gives up
    pub stuck_threshold_ticks: u32,

    /// Upper bound on nodes expanded by a single A* search
    pub max_path_expansions: usize,

    // === NEEDS ===
    /// Hunger added per tick (0.0 = fed, 1.0 = starving)
    pub hunger_per_tick: f32,

    /// Fatigue added per tick (0.0 = rested, 1.0 = exhausted)
    pub fatigue_per_tick: f32,

    /// Need level at which survival behavior interrupts routine work
    pub critical_need: f32,

    /// Damage dealt to a vital body part per tick at full hunger
    pub starvation_damage_per_tick: f32,

    /// Fatigue recovered per Rest action
    pub rest_per_tick: f32,

    // === ACTIVITIES ===
    /// Maximum depth of the interrupted-activity stack per being
    pub max_suspended_activities: usize,

    // === DIAGNOSTICS ===
    /// Timeout for auxiliary background tasks tracked by the watchdog
    pub watchdog_timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,

            ticks_per_second: 8,
            ticks_per_day: 2400,

            worker_threads: None,

            observation_radius: 16,
            memory_retention_ticks: 3000,

            movement_points_per_tick: 0.5,

            stuck_threshold_ticks: 50,
            max_path_expansions: 20_000,

            hunger_per_tick: 0.0004,
            fatigue_per_tick: 0.0003,
            critical_need: 0.8,
            starvation_damage_per_tick: 0.01,
            rest_per_tick: 0.004,

            max_suspended_activities: 4,

            watchdog_timeout_ms: 2000,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Number of think workers to run
    pub fn think_workers(&self) -> usize {
        match self.worker_threads {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1),
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_second == 0 {
            return Err(SimError::InvalidConfig("ticks_per_second must be > 0".into()));
        }
        if self.ticks_per_day < 24 {
            return Err(SimError::InvalidConfig(format!(
                "ticks_per_day ({}) must cover at least one tick per hour",
                self.ticks_per_day
            )));
        }
        if self.movement_points_per_tick <= 0.0 {
            return Err(SimError::InvalidConfig(
                "movement_points_per_tick must be positive".into(),
            ));
        }
        if self.observation_radius <= 0 {
            return Err(SimError::InvalidConfig("observation_radius must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.critical_need) {
            return Err(SimError::InvalidConfig(format!(
                "critical_need ({}) must lie in 0.0..=1.0",
                self.critical_need
            )));
        }
        if self.hunger_per_tick < 0.0 || self.fatigue_per_tick < 0.0 {
            return Err(SimError::InvalidConfig("need decay rates must not be negative".into()));
        }
        if self.stuck_threshold_ticks == 0 {
            return Err(SimError::InvalidConfig("stuck_threshold_ticks must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            movement_points_per_tick = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.movement_points_per_tick, 1.0);
        assert_eq!(config.memory_retention_ticks, 3000);
        assert_eq!(config.stuck_threshold_ticks, 50);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let err = SimulationConfig::from_toml_str("movement_points_per_tick = 0.0").unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let err = SimulationConfig::from_toml_str("seed = \"abc\"").unwrap_err();
        assert!(matches!(err, SimError::Toml(_)));
    }

    #[test]
    fn test_think_workers_at_least_one() {
        let mut config = SimulationConfig::default();
        assert!(config.think_workers() >= 1);
        config.worker_threads = Some(0);
        assert_eq!(config.think_workers(), 1);
        config.worker_threads = Some(3);
        assert_eq!(config.think_workers(), 3);
    }
}
