//! Error types for tick work and persistence.

use thiserror::Error;

use overflight_core::types::{FlightId, InstallationId, LocationId, VehicleId};

use crate::config::ConfigError;

/// A unit of tick work that could not complete. The engine logs it, skips
/// the unit and carries on with the rest of the tick.
#[derive(Debug, Error)]
pub enum TickFault {
    #[error("flight entity query failed: {0}")]
    Query(#[from] hecs::QueryOneError),
    #[error("flight component access failed: {0}")]
    Component(#[from] hecs::ComponentError),
    #[error("location {0:?} is not on the world grid")]
    UnknownLocation(LocationId),
    #[error("vehicle {0:?} reported unusable travel statistics")]
    InvalidStats(VehicleId),
    #[error("non-finite {what} at installation {installation:?}")]
    NonFinite {
        what: &'static str,
        installation: Option<InstallationId>,
    },
}

/// Failure exporting or restoring durable state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("save file access failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("saved state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("saved config is invalid: {0}")]
    Config(#[from] ConfigError),
    #[error("saved flight {0:?} appears more than once")]
    DuplicateFlight(FlightId),
    #[error("saved flight {0:?} names a location off the grid")]
    InvalidPath(FlightId),
    #[error("defense state references unknown flight {0:?}")]
    UnknownFlight(FlightId),
}
