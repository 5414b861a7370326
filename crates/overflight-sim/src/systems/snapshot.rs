//! Snapshot system: builds a `FlightSnapshot` from the world and registry.
//!
//! This system is read-only. It never modifies the world.

use hecs::{Entity, World};

use overflight_core::components::{FlightIdent, FlightKinematics, Vehicle};
use overflight_core::enums::DefenseKind;
use overflight_core::events::FlightEvent;
use overflight_core::state::*;
use overflight_core::types::{FlightId, SimTime};
use overflight_world::WorldGrid;

use crate::config::SimConfig;
use crate::flight_path::FlightPath;
use crate::registry::FlightRegistry;
use crate::systems::flight::{current_position, ticks_remaining};

pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    registry: &FlightRegistry,
    grid: &dyn WorldGrid,
    config: &SimConfig,
    events: Vec<FlightEvent>,
) -> FlightSnapshot {
    FlightSnapshot {
        time: *time,
        flights: build_flights(world, grid, config),
        defenses: build_defenses(world, registry),
        events,
    }
}

fn build_flights(world: &World, grid: &dyn WorldGrid, config: &SimConfig) -> Vec<FlightView> {
    let mut flights: Vec<FlightView> = world
        .query::<(&FlightIdent, &Vehicle, &FlightKinematics, &FlightPath)>()
        .iter()
        .filter(|(_, (_, _, kin, _))| kin.phase.is_airborne())
        .map(|(_, (ident, vehicle, kin, path))| {
            let position = current_position(kin, path, grid);
            FlightView {
                flight: ident.id,
                vehicle: vehicle.id,
                position,
                location: grid.nearest_location(position),
                altitude: kin.altitude,
                fraction: kin.fraction,
                ticks_remaining: ticks_remaining(kin, path, grid, config),
                waypoints: path.len(),
                recon: kin.recon,
            }
        })
        .collect();
    flights.sort_by_key(|f| f.flight);
    flights
}

/// Flight ids of the live entities among `entities`.
pub(crate) fn flight_ids<'a>(world: &World, entities: impl Iterator<Item = &'a Entity>) -> Vec<FlightId> {
    entities
        .filter_map(|e| world.get::<&FlightIdent>(*e).ok().map(|ident| ident.id))
        .collect()
}

/// Defenses with candidates or live targets.
fn build_defenses(world: &World, registry: &FlightRegistry) -> Vec<DefenseView> {
    let area = registry
        .area_defenses()
        .filter(|d| !registry.candidates_of(d.installation).is_empty() || !d.acquired.is_empty())
        .map(|d| DefenseView {
            installation: d.installation,
            kind: DefenseKind::Area,
            sweep_angle: Some(d.sweep_angle),
            targets: flight_ids(world, d.acquired.iter()),
            countdown: None,
        });
    let stationary = registry
        .stationary_defenses()
        .filter(|d| !registry.candidates_of(d.installation).is_empty() || !d.targets.is_empty())
        .map(|d| DefenseView {
            installation: d.installation,
            kind: DefenseKind::Stationary,
            sweep_angle: None,
            targets: flight_ids(world, d.rotation.items().iter()),
            countdown: Some(d.countdown),
        });
    area.chain(stationary).collect()
}
