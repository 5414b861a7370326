//! Fundamental identifiers, waypoints and angle helpers.

use serde::{Deserialize, Serialize};

use crate::enums::Vertical;

/// A discrete world location (one cell of the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub u32);

/// Stable identifier of one flight, unique for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightId(pub u64);

/// Identifier of a carried vehicle in the vehicle/travel statistics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u32);

/// A settlement, outpost or other fixed installation owned by a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstallationId(pub u32);

/// One destination in a flight path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub destination: LocationId,
    pub vertical: Vertical,
    /// Synthetic waypoint appended while waiting for landing conditions.
    #[serde(default)]
    pub holding: bool,
}

impl Waypoint {
    pub fn new(destination: LocationId, vertical: Vertical) -> Self {
        Self {
            destination,
            vertical,
            holding: false,
        }
    }

    pub fn ascend(destination: LocationId) -> Self {
        Self::new(destination, Vertical::Ascend)
    }

    pub fn descend(destination: LocationId) -> Self {
        Self::new(destination, Vertical::Descend)
    }

    /// Holding loop at `location`, always descending.
    pub fn holding_loop(location: LocationId) -> Self {
        Self {
            destination: location,
            vertical: Vertical::Descend,
            holding: true,
        }
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
}

impl SimTime {
    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Wrap an angle in degrees into [0, 360).
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to` in degrees, in (-180, 180].
pub fn angle_delta(from: f64, to: f64) -> f64 {
    let diff = wrap_degrees(to - from);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}
