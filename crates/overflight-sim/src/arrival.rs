//! Arrival actions: what a flight does once it reaches its final waypoint.

use serde::{Deserialize, Serialize};

use overflight_core::components::Vehicle;
use overflight_core::enums::{ArrivalOutcome, LandingMode};
use overflight_core::types::{InstallationId, LocationId};

use crate::services::ArrivalEffects;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArrivalAction {
    /// Land troops at a settlement and raid it.
    AttackSettlement {
        settlement: InstallationId,
        #[serde(default)]
        mode: LandingMode,
    },
    /// Land on the local map at the destination.
    LandInMap {
        #[serde(default)]
        mode: LandingMode,
    },
    FormCaravan,
    Trade {
        settlement: InstallationId,
    },
    VisitSettlement {
        settlement: InstallationId,
    },
    /// Gun run over `target`; the aircraft keeps flying.
    Strafe {
        target: LocationId,
    },
    /// Fly-over reconnaissance; the aircraft keeps flying.
    Recon,
}

impl ArrivalAction {
    /// Run the action's effects at `destination`. The effects collaborator
    /// decides what happens to the flight.
    pub fn invoke(
        &self,
        vehicle: &Vehicle,
        destination: LocationId,
        effects: &mut dyn ArrivalEffects,
    ) -> ArrivalOutcome {
        match *self {
            ArrivalAction::AttackSettlement { settlement, mode } => {
                effects.attack_settlement(vehicle, settlement, destination, mode)
            }
            ArrivalAction::LandInMap { mode } => effects.land_in_map(vehicle, destination, mode),
            ArrivalAction::FormCaravan => effects.form_caravan(vehicle, destination),
            ArrivalAction::Trade { settlement } => effects.trade(vehicle, settlement, destination),
            ArrivalAction::VisitSettlement { settlement } => {
                effects.visit_settlement(vehicle, settlement, destination)
            }
            ArrivalAction::Strafe { target } => effects.strafe(vehicle, target, destination),
            ArrivalAction::Recon => effects.recon(vehicle, destination),
        }
    }

    /// Outcome when the effects go ahead as planned.
    pub fn usual_outcome(&self) -> ArrivalOutcome {
        match self {
            ArrivalAction::AttackSettlement { .. } | ArrivalAction::LandInMap { .. } => {
                ArrivalOutcome::Destroy
            }
            ArrivalAction::FormCaravan
            | ArrivalAction::Trade { .. }
            | ArrivalAction::VisitSettlement { .. } => ArrivalOutcome::Convert,
            ArrivalAction::Strafe { .. } | ArrivalAction::Recon => ArrivalOutcome::Continue,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArrivalAction::AttackSettlement { .. } => "attack_settlement",
            ArrivalAction::LandInMap { .. } => "land_in_map",
            ArrivalAction::FormCaravan => "form_caravan",
            ArrivalAction::Trade { .. } => "trade",
            ArrivalAction::VisitSettlement { .. } => "visit_settlement",
            ArrivalAction::Strafe { .. } => "strafe",
            ArrivalAction::Recon => "recon",
        }
    }
}

/// Arrival action waiting for the final waypoint. At most one per flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingArrival {
    pub action: Option<ArrivalAction>,
    /// The action already ran and let the flight keep going.
    #[serde(default)]
    pub spent: bool,
}

impl PendingArrival {
    pub fn new(action: Option<ArrivalAction>) -> Self {
        Self {
            action,
            spent: false,
        }
    }
}
