//! Engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use overflight_core::constants::*;
use overflight_core::types::FactionId;

/// Configuration for a simulation run. Every field has a default from
/// `overflight_core::constants`, so scenario files only list overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Installations hostile to this faction field active defenses.
    pub player_faction: FactionId,
    pub base_progress_per_tick: f64,
    pub min_flight_speed: f64,
    pub max_flight_speed: f64,
    pub holding_progress_per_tick: f64,
    /// Circle over the destination until low enough to land.
    pub holding_pattern_on_arrival: bool,
    pub fuel_efficiency_multiplier: f64,
    pub sweep_rate_deg: f64,
    pub tracking_rate_deg: f64,
    pub tracking_tolerance_deg: f64,
    /// Re-sample registry candidates when a flight's speed changes mid-flight.
    pub resample_on_speed_change: bool,
    pub projectile_lifetime_ticks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            player_faction: FactionId(PLAYER_FACTION),
            base_progress_per_tick: BASE_PROGRESS_PER_TICK,
            min_flight_speed: MIN_FLIGHT_SPEED,
            max_flight_speed: MAX_FLIGHT_SPEED,
            holding_progress_per_tick: HOLDING_PROGRESS_PER_TICK,
            holding_pattern_on_arrival: true,
            fuel_efficiency_multiplier: FUEL_EFFICIENCY_MULTIPLIER,
            sweep_rate_deg: SWEEP_RATE_DEG,
            tracking_rate_deg: TRACKING_RATE_DEG,
            tracking_tolerance_deg: TRACKING_TOLERANCE_DEG,
            resample_on_speed_change: true,
            projectile_lifetime_ticks: PROJECTILE_LIFETIME_TICKS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("flight speed range is inverted: min {min} > max {max}")]
    InvertedSpeedRange { min: f64, max: f64 },
    #[error("projectile lifetime must be at least one tick")]
    ZeroProjectileLifetime,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_progress_per_tick", self.base_progress_per_tick),
            ("min_flight_speed", self.min_flight_speed),
            ("max_flight_speed", self.max_flight_speed),
            ("holding_progress_per_tick", self.holding_progress_per_tick),
            ("fuel_efficiency_multiplier", self.fuel_efficiency_multiplier),
            ("sweep_rate_deg", self.sweep_rate_deg),
            ("tracking_rate_deg", self.tracking_rate_deg),
            ("tracking_tolerance_deg", self.tracking_tolerance_deg),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.min_flight_speed > self.max_flight_speed {
            return Err(ConfigError::InvertedSpeedRange {
                min: self.min_flight_speed,
                max: self.max_flight_speed,
            });
        }
        if self.projectile_lifetime_ticks == 0 {
            return Err(ConfigError::ZeroProjectileLifetime);
        }
        Ok(())
    }
}
