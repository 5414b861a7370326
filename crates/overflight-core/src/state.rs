//! Read-only snapshot produced after each tick for presentation.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::DefenseKind;
use crate::events::FlightEvent;
use crate::types::{FlightId, InstallationId, LocationId, SimTime, VehicleId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSnapshot {
    pub time: SimTime,
    pub flights: Vec<FlightView>,
    pub defenses: Vec<DefenseView>,
    pub events: Vec<FlightEvent>,
}

/// One airborne flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightView {
    pub flight: FlightId,
    pub vehicle: VehicleId,
    /// Interpolated embedded position.
    pub position: DVec3,
    /// Nearest valid location to `position`.
    pub location: Option<LocationId>,
    pub altitude: f64,
    pub fraction: f64,
    pub ticks_remaining: u64,
    pub waypoints: usize,
    pub recon: bool,
}

/// One defense with work this tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseView {
    pub installation: InstallationId,
    pub kind: DefenseKind,
    /// Current sweep angle in degrees (area defenses only).
    pub sweep_angle: Option<f64>,
    pub targets: Vec<FlightId>,
    /// Fire countdown (stationary defenses only).
    pub countdown: Option<i32>,
}
