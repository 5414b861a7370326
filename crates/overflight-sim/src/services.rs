//! Collaborator interfaces consumed by the simulation.
//!
//! Everything behind these traits is owned elsewhere: statistics, fuel,
//! damage resolution, arrival effects, diplomacy and the installation list.
//! `crate::reference` has in-memory implementations.

use overflight_core::components::{DamageInfo, DamageOutcome, FlightStats, Installation, Vehicle};
use overflight_core::enums::{ArrivalOutcome, LandingMode};
use overflight_core::types::{FactionId, InstallationId, LocationId, VehicleId};
use overflight_world::WorldGrid;

/// Vehicle/travel statistics store.
pub trait TravelStats {
    fn stats(&self, vehicle: &Vehicle) -> FlightStats;
}

/// Fuel/resource store.
pub trait FuelStore {
    fn level(&self, vehicle: VehicleId) -> f64;
    fn consumption_per_tick(&self, vehicle: VehicleId) -> f64;
    fn is_empty(&self, vehicle: VehicleId) -> bool;
    fn consume(&mut self, vehicle: VehicleId, amount: f64);
}

/// Damage and incident resolver.
pub trait DamageResolver {
    /// Apply damage to the carried vehicle and decide whether it goes down.
    fn apply_damage(&mut self, vehicle: &Vehicle, damage: &DamageInfo) -> DamageOutcome;

    /// Take over a downed vehicle: wreck, casualties, diplomatic fallout.
    fn handle_downed(
        &mut self,
        vehicle: Vehicle,
        location: Option<LocationId>,
        attacker: Option<InstallationId>,
    );
}

/// Domain effects of arrival actions, one method per action. Each reports
/// what becomes of the flight, so an action that could not go ahead (say,
/// the settlement is gone) can leave the aircraft flying.
pub trait ArrivalEffects {
    fn attack_settlement(
        &mut self,
        vehicle: &Vehicle,
        settlement: InstallationId,
        destination: LocationId,
        mode: LandingMode,
    ) -> ArrivalOutcome;
    fn land_in_map(
        &mut self,
        vehicle: &Vehicle,
        destination: LocationId,
        mode: LandingMode,
    ) -> ArrivalOutcome;
    fn form_caravan(&mut self, vehicle: &Vehicle, destination: LocationId) -> ArrivalOutcome;
    fn trade(
        &mut self,
        vehicle: &Vehicle,
        settlement: InstallationId,
        destination: LocationId,
    ) -> ArrivalOutcome;
    fn visit_settlement(
        &mut self,
        vehicle: &Vehicle,
        settlement: InstallationId,
        destination: LocationId,
    ) -> ArrivalOutcome;
    fn strafe(
        &mut self,
        vehicle: &Vehicle,
        target: LocationId,
        destination: LocationId,
    ) -> ArrivalOutcome;
    fn recon(&mut self, vehicle: &Vehicle, destination: LocationId) -> ArrivalOutcome;

    /// Receive the vehicle of a flight that ended at `destination`.
    fn release(&mut self, vehicle: Vehicle, destination: LocationId, outcome: ArrivalOutcome);
}

/// Faction-relationship query.
pub trait FactionRelations {
    fn is_hostile(&self, a: FactionId, b: FactionId) -> bool;
}

/// Source of the installations that may carry air defenses.
pub trait InstallationDirectory {
    fn installations(&self) -> Vec<Installation>;
}

/// All collaborators the engine talks to.
pub struct Services {
    pub grid: Box<dyn WorldGrid>,
    pub stats: Box<dyn TravelStats>,
    pub fuel: Box<dyn FuelStore>,
    pub damage: Box<dyn DamageResolver>,
    pub arrivals: Box<dyn ArrivalEffects>,
    pub relations: Box<dyn FactionRelations>,
    pub installations: Box<dyn InstallationDirectory>,
}
