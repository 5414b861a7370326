//! In-memory collaborators for tests and the headless runner.
//!
//! Each type shares its state through `Rc<RefCell<_>>`, so a clone kept by
//! the caller observes (and can steer) what the engine does with the boxed
//! original.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use overflight_core::components::{DamageInfo, DamageOutcome, FlightStats, Installation, Vehicle};
use overflight_core::enums::{ArrivalOutcome, LandingMode};
use overflight_core::types::{FactionId, InstallationId, LocationId, VehicleId};

use overflight_world::SphereGrid;

use crate::services::*;

/// Travel statistics with a fleet-wide default and per-vehicle overrides.
#[derive(Debug, Clone)]
pub struct FixedStats {
    inner: Rc<RefCell<StatsTable>>,
}

#[derive(Debug)]
struct StatsTable {
    default: FlightStats,
    overrides: HashMap<VehicleId, FlightStats>,
}

impl FixedStats {
    pub fn new(default: FlightStats) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StatsTable {
                default,
                overrides: HashMap::new(),
            })),
        }
    }

    pub fn set(&self, vehicle: VehicleId, stats: FlightStats) {
        self.inner.borrow_mut().overrides.insert(vehicle, stats);
    }
}

impl TravelStats for FixedStats {
    fn stats(&self, vehicle: &Vehicle) -> FlightStats {
        let table = self.inner.borrow();
        table
            .overrides
            .get(&vehicle.id)
            .copied()
            .unwrap_or(table.default)
    }
}

/// Per-vehicle fuel tanks. Vehicles without a tank never run dry.
#[derive(Debug, Clone, Default)]
pub struct FuelTanks {
    inner: Rc<RefCell<HashMap<VehicleId, Tank>>>,
}

#[derive(Debug, Clone, Copy)]
struct Tank {
    level: f64,
    consumption: f64,
}

impl FuelTanks {
    pub fn fill(&self, vehicle: VehicleId, level: f64, consumption_per_tick: f64) {
        self.inner.borrow_mut().insert(
            vehicle,
            Tank {
                level,
                consumption: consumption_per_tick,
            },
        );
    }
}

impl FuelStore for FuelTanks {
    fn level(&self, vehicle: VehicleId) -> f64 {
        self.inner
            .borrow()
            .get(&vehicle)
            .map_or(f64::INFINITY, |t| t.level)
    }

    fn consumption_per_tick(&self, vehicle: VehicleId) -> f64 {
        self.inner
            .borrow()
            .get(&vehicle)
            .map_or(0.0, |t| t.consumption)
    }

    fn is_empty(&self, vehicle: VehicleId) -> bool {
        self.level(vehicle) <= 0.0
    }

    fn consume(&mut self, vehicle: VehicleId, amount: f64) {
        if let Some(tank) = self.inner.borrow_mut().get_mut(&vehicle) {
            tank.level = (tank.level - amount).max(0.0);
        }
    }
}

/// A vehicle handed to `handle_downed`.
#[derive(Debug, Clone, PartialEq)]
pub struct DownedRecord {
    pub vehicle: Vehicle,
    pub location: Option<LocationId>,
    pub attacker: Option<InstallationId>,
}

/// Hit-point damage model: a vehicle crashes once its hull reaches zero.
#[derive(Debug, Clone)]
pub struct HullDamage {
    inner: Rc<RefCell<HullState>>,
}

#[derive(Debug)]
struct HullState {
    max_hull: f64,
    hull: HashMap<VehicleId, f64>,
    downed: Vec<DownedRecord>,
}

impl HullDamage {
    pub fn new(max_hull: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HullState {
                max_hull,
                hull: HashMap::new(),
                downed: Vec::new(),
            })),
        }
    }

    pub fn hull(&self, vehicle: VehicleId) -> f64 {
        let state = self.inner.borrow();
        state.hull.get(&vehicle).copied().unwrap_or(state.max_hull)
    }

    pub fn downed(&self) -> Vec<DownedRecord> {
        self.inner.borrow().downed.clone()
    }
}

impl DamageResolver for HullDamage {
    fn apply_damage(&mut self, vehicle: &Vehicle, damage: &DamageInfo) -> DamageOutcome {
        let mut state = self.inner.borrow_mut();
        let max_hull = state.max_hull;
        let hull = state.hull.entry(vehicle.id).or_insert(max_hull);
        *hull = (*hull - damage.amount).max(0.0);
        DamageOutcome { crash: *hull <= 0.0 }
    }

    fn handle_downed(
        &mut self,
        vehicle: Vehicle,
        location: Option<LocationId>,
        attacker: Option<InstallationId>,
    ) {
        self.inner.borrow_mut().downed.push(DownedRecord {
            vehicle,
            location,
            attacker,
        });
    }
}

/// One arrival effect invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalRecord {
    pub vehicle: VehicleId,
    pub action: &'static str,
    pub destination: LocationId,
}

/// Records arrival effects instead of performing them. Each action reports
/// its usual outcome unless overridden with `set_outcome`.
#[derive(Debug, Clone, Default)]
pub struct RecordingArrivals {
    inner: Rc<RefCell<ArrivalLog>>,
}

#[derive(Debug, Default)]
struct ArrivalLog {
    invocations: Vec<ArrivalRecord>,
    released: Vec<(Vehicle, LocationId, ArrivalOutcome)>,
    overrides: HashMap<&'static str, ArrivalOutcome>,
}

impl RecordingArrivals {
    pub fn invocations(&self) -> Vec<ArrivalRecord> {
        self.inner.borrow().invocations.clone()
    }

    pub fn released(&self) -> Vec<(Vehicle, LocationId, ArrivalOutcome)> {
        self.inner.borrow().released.clone()
    }

    /// Make every later `action` report `outcome`.
    pub fn set_outcome(&self, action: &'static str, outcome: ArrivalOutcome) {
        self.inner.borrow_mut().overrides.insert(action, outcome);
    }

    fn record(
        &self,
        vehicle: &Vehicle,
        action: &'static str,
        destination: LocationId,
        usual: ArrivalOutcome,
    ) -> ArrivalOutcome {
        let mut log = self.inner.borrow_mut();
        log.invocations.push(ArrivalRecord {
            vehicle: vehicle.id,
            action,
            destination,
        });
        log.overrides.get(action).copied().unwrap_or(usual)
    }
}

impl ArrivalEffects for RecordingArrivals {
    fn attack_settlement(
        &mut self,
        vehicle: &Vehicle,
        _settlement: InstallationId,
        destination: LocationId,
        _mode: LandingMode,
    ) -> ArrivalOutcome {
        self.record(vehicle, "attack_settlement", destination, ArrivalOutcome::Destroy)
    }

    fn land_in_map(
        &mut self,
        vehicle: &Vehicle,
        destination: LocationId,
        _mode: LandingMode,
    ) -> ArrivalOutcome {
        self.record(vehicle, "land_in_map", destination, ArrivalOutcome::Destroy)
    }

    fn form_caravan(&mut self, vehicle: &Vehicle, destination: LocationId) -> ArrivalOutcome {
        self.record(vehicle, "form_caravan", destination, ArrivalOutcome::Convert)
    }

    fn trade(
        &mut self,
        vehicle: &Vehicle,
        _settlement: InstallationId,
        destination: LocationId,
    ) -> ArrivalOutcome {
        self.record(vehicle, "trade", destination, ArrivalOutcome::Convert)
    }

    fn visit_settlement(
        &mut self,
        vehicle: &Vehicle,
        _settlement: InstallationId,
        destination: LocationId,
    ) -> ArrivalOutcome {
        self.record(vehicle, "visit_settlement", destination, ArrivalOutcome::Convert)
    }

    fn strafe(
        &mut self,
        vehicle: &Vehicle,
        _target: LocationId,
        destination: LocationId,
    ) -> ArrivalOutcome {
        self.record(vehicle, "strafe", destination, ArrivalOutcome::Continue)
    }

    fn recon(&mut self, vehicle: &Vehicle, destination: LocationId) -> ArrivalOutcome {
        self.record(vehicle, "recon", destination, ArrivalOutcome::Continue)
    }

    fn release(&mut self, vehicle: Vehicle, destination: LocationId, outcome: ArrivalOutcome) {
        self.inner
            .borrow_mut()
            .released
            .push((vehicle, destination, outcome));
    }
}

/// Symmetric hostility table.
#[derive(Debug, Clone, Default)]
pub struct RelationTable {
    inner: Rc<RefCell<BTreeSet<(FactionId, FactionId)>>>,
}

impl RelationTable {
    pub fn set_hostile(&self, a: FactionId, b: FactionId, hostile: bool) {
        let key = if a <= b { (a, b) } else { (b, a) };
        let mut pairs = self.inner.borrow_mut();
        if hostile {
            pairs.insert(key);
        } else {
            pairs.remove(&key);
        }
    }
}

impl FactionRelations for RelationTable {
    fn is_hostile(&self, a: FactionId, b: FactionId) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.inner.borrow().contains(&key)
    }
}

/// Mutable installation list.
#[derive(Debug, Clone, Default)]
pub struct InstallationList {
    inner: Rc<RefCell<Vec<Installation>>>,
}

impl InstallationList {
    pub fn new(installations: Vec<Installation>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(installations)),
        }
    }

    pub fn add(&self, installation: Installation) {
        self.inner.borrow_mut().push(installation);
    }

    pub fn remove(&self, id: InstallationId) {
        self.inner.borrow_mut().retain(|i| i.id != id);
    }
}

impl InstallationDirectory for InstallationList {
    fn installations(&self) -> Vec<Installation> {
        self.inner.borrow().clone()
    }
}

/// Handles to a complete set of in-memory collaborators sharing state with
/// the boxed copies in every `Services` they produce.
#[derive(Debug, Clone)]
pub struct ReferenceServices {
    pub grid: SphereGrid,
    pub stats: FixedStats,
    pub fuel: FuelTanks,
    pub damage: HullDamage,
    pub arrivals: RecordingArrivals,
    pub relations: RelationTable,
    pub installations: InstallationList,
}

impl ReferenceServices {
    pub fn new(grid: SphereGrid, stats: FlightStats, max_hull: f64) -> Self {
        Self {
            grid,
            stats: FixedStats::new(stats),
            fuel: FuelTanks::default(),
            damage: HullDamage::new(max_hull),
            arrivals: RecordingArrivals::default(),
            relations: RelationTable::default(),
            installations: InstallationList::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            grid: Box::new(self.grid.clone()),
            stats: Box::new(self.stats.clone()),
            fuel: Box::new(self.fuel.clone()),
            damage: Box::new(self.damage.clone()),
            arrivals: Box::new(self.arrivals.clone()),
            relations: Box::new(self.relations.clone()),
            installations: Box::new(self.installations.clone()),
        }
    }
}
