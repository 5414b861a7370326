//! ECS components and collaborator-owned records.
//!
//! Components are plain data structs. Game logic lives in systems.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{FactionId, FlightId, InstallationId, LocationId, VehicleId};

/// The aircraft carried by a flight. Owned by the flight entity while airborne.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub faction: FactionId,
    pub label: String,
}

/// Stable identity of a flight entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightIdent {
    pub id: FlightId,
}

/// Horizontal and vertical integration state of a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightKinematics {
    /// Embedded position at the start of the current leg.
    pub origin: DVec3,
    /// Location the current leg started from.
    pub last_location: LocationId,
    /// Interpolation fraction along the current leg, in [0, 1].
    pub fraction: f64,
    pub altitude: f64,
    /// Fraction of the current leg covered per tick.
    pub speed_pct_per_tick: f64,
    /// Clamped flight speed the current leg speed was computed with.
    pub speed: f64,
    /// Recon flights fly over their destination instead of landing.
    pub recon: bool,
    pub phase: FlightPhase,
}

/// Travel statistics of one vehicle, supplied by the statistics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightStats {
    pub flight_speed: f64,
    /// Altitude change per tick at full climb-profile rate.
    pub climb_rate: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    /// Altitude at or below which the aircraft may land.
    pub landing_altitude: f64,
}

/// Damage delivered to a flight by a defense.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    pub amount: f64,
    pub kind: DamageKind,
}

/// Damage collaborator verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub crash: bool,
}

/// A fixed installation known to the installation directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub location: LocationId,
    pub faction: FactionId,
    #[serde(default)]
    pub defense: Option<DefenseProfile>,
}

/// Air-defense capability of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DefenseProfile {
    Area(AreaDefenseProfile),
    Stationary(StationaryDefenseProfile),
}

impl DefenseProfile {
    /// Radius within which this defense can interact with a flight.
    pub fn reach(&self) -> f64 {
        match self {
            DefenseProfile::Area(p) => p.max_distance,
            DefenseProfile::Stationary(p) => p.max_range,
        }
    }
}

/// Mobile, sweeping search-and-track defense.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaDefenseProfile {
    pub max_distance: f64,
    /// Width of the search cone in degrees.
    pub sweep_arc_deg: f64,
    /// +1 clockwise, -1 counter-clockwise.
    #[serde(default = "default_sweep_direction")]
    pub sweep_direction: i8,
    #[serde(default)]
    pub initial_angle_deg: f64,
    #[serde(default)]
    pub strategy: EngagementStrategy,
    pub damage: f64,
    #[serde(default = "default_hit_chance")]
    pub hit_chance: f64,
    /// Ticks between shots while locked on.
    #[serde(default)]
    pub refire_ticks: u32,
}

/// Fixed, rate-limited round-robin defense.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationaryDefenseProfile {
    pub max_range: f64,
    pub fire_interval_ticks: u32,
    pub damage: f64,
    /// Projectile travel per tick (world units).
    pub projectile_speed: f64,
}

fn default_sweep_direction() -> i8 {
    1
}

fn default_hit_chance() -> f64 {
    1.0
}
