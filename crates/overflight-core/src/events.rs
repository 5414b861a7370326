//! Events emitted by the simulation for presentation and incident handling.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{FlightId, InstallationId, LocationId, VehicleId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlightEvent {
    Launched {
        flight: FlightId,
        vehicle: VehicleId,
        waypoints: usize,
    },
    /// A real (non-holding) waypoint was reached.
    WaypointReached {
        flight: FlightId,
        location: LocationId,
        remaining: usize,
    },
    /// A holding loop over `location` completed.
    HoldingLoop {
        flight: FlightId,
        location: LocationId,
    },
    Arrived {
        flight: FlightId,
        location: LocationId,
        outcome: ArrivalOutcome,
    },
    Crashed {
        flight: FlightId,
        location: Option<LocationId>,
        cause: CrashCause,
        attacker: Option<InstallationId>,
    },
    TargetAcquired {
        installation: InstallationId,
        flight: FlightId,
    },
    TargetLost {
        installation: InstallationId,
        flight: FlightId,
    },
    Fired {
        installation: InstallationId,
        flight: FlightId,
        kind: DamageKind,
    },
    /// Damage landed on a flight, before the damage collaborator's verdict.
    Hit {
        installation: InstallationId,
        flight: FlightId,
        kind: DamageKind,
        amount: f64,
    },
    /// A unit of tick work failed and was skipped.
    TickFault {
        flight: Option<FlightId>,
        installation: Option<InstallationId>,
        message: String,
    },
}
