//! Durable state: export and restore of flights and defense engagement state.
//!
//! Flights are keyed by `FlightId`; entity handles are re-created on restore.
//! Projectiles in the air are not saved, and the RNG restarts from the
//! config seed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use glam::DVec3;
use hecs::Entity;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use overflight_core::components::{FlightIdent, FlightKinematics, Vehicle};
use overflight_core::enums::FlightPhase;
use overflight_core::types::{FlightId, InstallationId, LocationId, SimTime};

use crate::arrival::{ArrivalAction, PendingArrival};
use crate::config::SimConfig;
use crate::engine::SimulationEngine;
use crate::error::PersistError;
use crate::flight_path::FlightPath;
use crate::rotation::Rotation;
use crate::services::Services;
use crate::systems;
use crate::systems::snapshot::flight_ids;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub tick: u64,
    pub next_flight_id: u64,
    pub flights: Vec<SavedFlight>,
    #[serde(default)]
    pub area_defenses: Vec<SavedAreaDefense>,
    #[serde(default)]
    pub stationary_defenses: Vec<SavedStationaryDefense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFlight {
    pub id: FlightId,
    pub vehicle: Vehicle,
    pub path: FlightPath,
    pub kinematics: SavedKinematics,
    #[serde(default)]
    pub arrival: Option<ArrivalAction>,
    /// The arrival action already ran and the flight kept going.
    #[serde(default)]
    pub arrival_spent: bool,
}

/// `FlightKinematics` without the phase: only airborne flights are saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedKinematics {
    pub origin: DVec3,
    pub last_location: LocationId,
    pub fraction: f64,
    pub altitude: f64,
    pub speed_pct_per_tick: f64,
    pub speed: f64,
    #[serde(default)]
    pub recon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAreaDefense {
    pub installation: InstallationId,
    pub sweep_angle: f64,
    pub direction: f64,
    pub acquired: Vec<FlightId>,
    pub current: Option<FlightId>,
    pub cooldown: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStationaryDefense {
    pub installation: InstallationId,
    pub countdown: i32,
    /// Rotation order.
    pub rotation: Vec<FlightId>,
    pub cursor: usize,
}

impl SavedState {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, PersistError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

impl SimulationEngine {
    /// Snapshot everything needed to resume this engine.
    pub fn export_state(&self) -> SavedState {
        let mut flights: Vec<SavedFlight> = self
            .world
            .query::<(&FlightIdent, &Vehicle, &FlightKinematics, &FlightPath, &PendingArrival)>()
            .iter()
            .filter(|(_, (_, _, kin, _, _))| kin.phase.is_airborne())
            .map(|(_, (ident, vehicle, kin, path, pending))| SavedFlight {
                id: ident.id,
                vehicle: vehicle.clone(),
                path: path.clone(),
                kinematics: SavedKinematics {
                    origin: kin.origin,
                    last_location: kin.last_location,
                    fraction: kin.fraction,
                    altitude: kin.altitude,
                    speed_pct_per_tick: kin.speed_pct_per_tick,
                    speed: kin.speed,
                    recon: kin.recon,
                },
                arrival: pending.action.clone(),
                arrival_spent: pending.spent,
            })
            .collect();
        flights.sort_by_key(|f| f.id);

        let area_defenses = self
            .registry
            .area_defenses()
            .map(|d| SavedAreaDefense {
                installation: d.installation,
                sweep_angle: d.sweep_angle,
                direction: d.direction,
                acquired: flight_ids(&self.world, d.acquired.iter()),
                current: d
                    .current
                    .and_then(|e| self.world.get::<&FlightIdent>(e).ok().map(|i| i.id)),
                cooldown: d.cooldown,
            })
            .collect();

        let stationary_defenses = self
            .registry
            .stationary_defenses()
            .map(|d| SavedStationaryDefense {
                installation: d.installation,
                countdown: d.countdown,
                rotation: flight_ids(&self.world, d.rotation.items().iter()),
                cursor: d.rotation.cursor(),
            })
            .collect();

        SavedState {
            tick: self.time.tick,
            next_flight_id: self.next_flight_id,
            flights,
            area_defenses,
            stationary_defenses,
        }
    }

    /// Rebuild an engine from saved state. The registry is rebuilt from the
    /// installation directory and saved defense state is laid over it;
    /// defenses that no longer qualify are dropped.
    pub fn restore(
        config: SimConfig,
        services: Services,
        saved: SavedState,
    ) -> Result<Self, PersistError> {
        let mut engine = SimulationEngine::new(config, services)?;
        engine.time = SimTime { tick: saved.tick };

        let mut entities: BTreeMap<FlightId, Entity> = BTreeMap::new();
        for flight in saved.flights {
            if entities.contains_key(&flight.id) {
                return Err(PersistError::DuplicateFlight(flight.id));
            }
            let grid = engine.services.grid.as_ref();
            if !grid.is_valid(flight.kinematics.last_location)
                || !flight.path.iter().all(|w| grid.is_valid(w.destination))
            {
                return Err(PersistError::InvalidPath(flight.id));
            }
            let k = flight.kinematics;
            let entity = engine.world.spawn((
                FlightIdent { id: flight.id },
                flight.vehicle,
                FlightKinematics {
                    origin: k.origin,
                    last_location: k.last_location,
                    fraction: k.fraction.clamp(0.0, 1.0),
                    altitude: k.altitude,
                    speed_pct_per_tick: k.speed_pct_per_tick,
                    speed: k.speed,
                    recon: k.recon,
                    phase: FlightPhase::Airborne,
                },
                flight.path,
                PendingArrival {
                    action: flight.arrival,
                    spent: flight.arrival_spent,
                },
            ));
            entities.insert(flight.id, entity);
        }
        let highest = entities.keys().next_back().map_or(0, |id| id.0 + 1);
        engine.next_flight_id = saved.next_flight_id.max(highest);
        engine.flights = entities.clone();

        engine.registry.rebuild(&engine.services, &engine.config);
        for entity in systems::flight::airborne_flights(&engine.world) {
            if let Err(fault) = systems::flight::register_flight(
                &engine.world,
                entity,
                &engine.services,
                &engine.config,
                &mut engine.registry,
            ) {
                warn!("restored flight {entity:?} could not be registered: {fault}");
            }
        }

        let lookup = |id: &FlightId| entities.get(id).copied().ok_or(PersistError::UnknownFlight(*id));

        for state in saved.area_defenses {
            let Some(defense) = engine.registry.area_defense_mut(state.installation) else {
                warn!("saved area defense {:?} no longer qualifies", state.installation);
                continue;
            };
            defense.sweep_angle = state.sweep_angle;
            defense.direction = state.direction;
            defense.acquired = state
                .acquired
                .iter()
                .map(lookup)
                .collect::<Result<_, _>>()?;
            defense.current = state.current.as_ref().map(lookup).transpose()?;
            defense.cooldown = state.cooldown;
        }

        for state in saved.stationary_defenses {
            let Some(defense) = engine.registry.stationary_defense_mut(state.installation) else {
                warn!("saved stationary defense {:?} no longer qualifies", state.installation);
                continue;
            };
            let order: Vec<Entity> = state
                .rotation
                .iter()
                .map(lookup)
                .collect::<Result<_, _>>()?;
            defense.targets = order.iter().copied().collect::<BTreeSet<_>>();
            defense.rotation = Rotation::from_parts(order, state.cursor);
            defense.countdown = state.countdown.clamp(-1, defense.interval() - 1);
        }

        info!(
            "restored {} flights at tick {}",
            engine.flights.len(),
            engine.time.tick
        );
        Ok(engine)
    }
}
