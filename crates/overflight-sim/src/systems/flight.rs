//! Flight system: horizontal advance, arrival, altitude, fuel and crashes.

use glam::DVec3;
use hecs::{Entity, World};
use log::{debug, error, info, warn};

use overflight_core::components::*;
use overflight_core::constants::{
    MAX_PATH_SAMPLES, MIN_LEG_DISTANCE, PROGRESS_EPSILON, SPEED_RESAMPLE_EPSILON,
};
use overflight_core::enums::*;
use overflight_core::events::FlightEvent;
use overflight_core::types::{FlightId, InstallationId, LocationId, VehicleId};
use overflight_world::WorldGrid;

use crate::arrival::{ArrivalAction, PendingArrival};
use crate::climb;
use crate::config::SimConfig;
use crate::defense::Shot;
use crate::error::TickFault;
use crate::flight_path::FlightPath;
use crate::registry::FlightRegistry;
use crate::services::Services;

/// Run the flight system for one tick. A flight whose update faults is
/// skipped; the rest of the tick goes ahead.
pub fn run(
    world: &mut World,
    services: &mut Services,
    config: &SimConfig,
    registry: &mut FlightRegistry,
    events: &mut Vec<FlightEvent>,
) {
    for entity in airborne_flights(world) {
        if let Err(fault) = update(world, entity, services, config, registry, events) {
            report_fault(world, entity, &fault, events);
        }
    }
}

/// Airborne flight entities in spawn order.
pub fn airborne_flights(world: &World) -> Vec<Entity> {
    let mut flights: Vec<(FlightIdent, Entity)> = world
        .query::<(&FlightIdent, &FlightKinematics)>()
        .iter()
        .filter(|(_, (_, kin))| kin.phase.is_airborne())
        .map(|(entity, (ident, _))| (*ident, entity))
        .collect();
    flights.sort_by_key(|(ident, _)| ident.id);
    flights.into_iter().map(|(_, entity)| entity).collect()
}

pub fn report_fault(
    world: &World,
    entity: Entity,
    fault: &TickFault,
    events: &mut Vec<FlightEvent>,
) {
    let flight = world.get::<&FlightIdent>(entity).ok().map(|ident| ident.id);
    error!("flight {flight:?} skipped this tick: {fault}");
    events.push(FlightEvent::TickFault {
        flight,
        installation: None,
        message: fault.to_string(),
    });
}

pub fn validate_stats(stats: &FlightStats, vehicle: VehicleId) -> Result<(), TickFault> {
    let finite = [
        stats.flight_speed,
        stats.climb_rate,
        stats.min_altitude,
        stats.max_altitude,
        stats.landing_altitude,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !finite || stats.climb_rate < 0.0 || stats.min_altitude > stats.max_altitude {
        return Err(TickFault::InvalidStats(vehicle));
    }
    Ok(())
}

pub fn clamp_speed(speed: f64, config: &SimConfig) -> f64 {
    speed.max(config.min_flight_speed).min(config.max_flight_speed)
}

/// Fraction of the leg `from -> to` covered per tick at `speed`.
/// Zero-length legs advance at the holding rate.
pub fn leg_speed(from: DVec3, to: DVec3, grid: &dyn WorldGrid, config: &SimConfig, speed: f64) -> f64 {
    let distance = grid.distance(from, to);
    if distance.is_finite() && distance >= MIN_LEG_DISTANCE {
        config.base_progress_per_tick / distance * speed
    } else {
        config.holding_progress_per_tick
    }
}

/// Interpolated embedded position along the current leg.
pub fn current_position(kin: &FlightKinematics, path: &FlightPath, grid: &dyn WorldGrid) -> DVec3 {
    path.front()
        .and_then(|w| grid.position_of(w.destination))
        .map_or(kin.origin, |dest| grid.interpolate(kin.origin, dest, kin.fraction))
}

/// Ticks until the path is flown out: the rest of the current leg plus one
/// full leg per following waypoint.
pub fn ticks_remaining(
    kin: &FlightKinematics,
    path: &FlightPath,
    grid: &dyn WorldGrid,
    config: &SimConfig,
) -> u64 {
    let mut total = 0u64;
    let mut origin = kin.origin;
    for (i, waypoint) in path.iter().enumerate() {
        let Some(dest) = grid.position_of(waypoint.destination) else {
            break;
        };
        let (pct, left) = if i == 0 {
            (kin.speed_pct_per_tick, 1.0 - kin.fraction)
        } else {
            (leg_speed(origin, dest, grid, config, kin.speed), 1.0)
        };
        if pct > 0.0 {
            total += ((left - PROGRESS_EPSILON).max(0.0) / pct).ceil() as u64;
        }
        origin = dest;
    }
    total
}

/// Positions the flight will pass through, one per tick, from its current
/// point to the end of its path.
pub fn path_samples(
    kin: &FlightKinematics,
    path: &FlightPath,
    grid: &dyn WorldGrid,
    config: &SimConfig,
) -> Vec<DVec3> {
    let mut samples = vec![current_position(kin, path, grid)];
    let mut origin = kin.origin;
    let mut fraction = kin.fraction;
    for waypoint in path.iter() {
        let Some(dest) = grid.position_of(waypoint.destination) else {
            continue;
        };
        let pct = leg_speed(origin, dest, grid, config, kin.speed);
        while fraction < 1.0 - PROGRESS_EPSILON {
            fraction = (fraction + pct).min(1.0);
            samples.push(grid.interpolate(origin, dest, fraction));
            if samples.len() >= MAX_PATH_SAMPLES {
                warn!("path sampling stopped at {MAX_PATH_SAMPLES} samples");
                return samples;
            }
        }
        origin = dest;
        fraction = 0.0;
    }
    samples
}

/// Replace the flight's registry candidates from its remaining path.
pub fn register_flight(
    world: &World,
    entity: Entity,
    services: &Services,
    config: &SimConfig,
    registry: &mut FlightRegistry,
) -> Result<usize, TickFault> {
    let faction = world.get::<&Vehicle>(entity)?.faction;
    let samples = {
        let kin = world.get::<&FlightKinematics>(entity)?;
        let path = world.get::<&FlightPath>(entity)?;
        path_samples(&kin, &path, services.grid.as_ref(), config)
    };
    Ok(registry.register(entity, faction, &samples, services))
}

fn update(
    world: &mut World,
    entity: Entity,
    services: &mut Services,
    config: &SimConfig,
    registry: &mut FlightRegistry,
    events: &mut Vec<FlightEvent>,
) -> Result<(), TickFault> {
    let (vehicle_id, stats) = {
        let vehicle = world.get::<&Vehicle>(entity)?;
        (vehicle.id, services.stats.stats(&vehicle))
    };
    validate_stats(&stats, vehicle_id)?;
    let speed = clamp_speed(stats.flight_speed, config);

    // Speed changed since the current leg was set up.
    let speed_changed = {
        let (kin, path) = world.query_one_mut::<(&mut FlightKinematics, &FlightPath)>(entity)?;
        if (speed - kin.speed).abs() > SPEED_RESAMPLE_EPSILON {
            kin.speed = speed;
            let grid = services.grid.as_ref();
            if let Some(dest) = path.front().and_then(|w| grid.position_of(w.destination)) {
                kin.speed_pct_per_tick = leg_speed(kin.origin, dest, grid, config, speed);
            }
            true
        } else {
            false
        }
    };
    if speed_changed && config.resample_on_speed_change {
        let count = register_flight(world, entity, services, config, registry)?;
        debug!("entity {entity:?} re-sampled after speed change: {count} candidates");
    }

    let (flight, arrival_due) = advance(world, entity, services.grid.as_ref(), config, events)?;
    if arrival_due && arrive(world, entity, flight, &stats, services, config, registry, events)? {
        return Ok(());
    }

    {
        let (kin, path) = world.query_one_mut::<(&mut FlightKinematics, &FlightPath)>(entity)?;
        let vertical = path.front().map_or(Vertical::Descend, |w| w.vertical);
        kin.altitude = climb::step_altitude(kin.altitude, vertical, &stats);
    }

    let burn = services.fuel.consumption_per_tick(vehicle_id) / config.fuel_efficiency_multiplier;
    services.fuel.consume(vehicle_id, burn);
    if services.fuel.is_empty(vehicle_id) {
        crash(
            world,
            entity,
            services,
            registry,
            CrashCause::FuelExhausted,
            None,
            events,
        )?;
    }
    Ok(())
}

/// Horizontal step. Returns the flight id and whether the arrival check is due.
fn advance(
    world: &mut World,
    entity: Entity,
    grid: &dyn WorldGrid,
    config: &SimConfig,
    events: &mut Vec<FlightEvent>,
) -> Result<(FlightId, bool), TickFault> {
    let (ident, kin, path) =
        world.query_one_mut::<(&FlightIdent, &mut FlightKinematics, &mut FlightPath)>(entity)?;
    let flight = ident.id;
    let Some(front) = path.front().copied() else {
        return Ok((flight, true));
    };

    kin.fraction = (kin.fraction + kin.speed_pct_per_tick).min(1.0);
    if kin.fraction < 1.0 - PROGRESS_EPSILON {
        return Ok((flight, false));
    }

    let reached = grid
        .position_of(front.destination)
        .ok_or(TickFault::UnknownLocation(front.destination))?;
    let next = match path.iter().nth(1) {
        Some(w) => Some(
            grid.position_of(w.destination)
                .ok_or(TickFault::UnknownLocation(w.destination))?,
        ),
        None => None,
    };

    path.pop_front();
    kin.origin = reached;
    kin.last_location = front.destination;
    // Overflow past the waypoint is discarded.
    kin.fraction = 0.0;
    kin.speed_pct_per_tick = next.map_or(0.0, |dest| leg_speed(reached, dest, grid, config, kin.speed));

    if front.holding {
        events.push(FlightEvent::HoldingLoop {
            flight,
            location: front.destination,
        });
    } else {
        debug!(
            "flight {flight:?} reached {:?}, {} waypoints left",
            front.destination,
            path.len()
        );
        events.push(FlightEvent::WaypointReached {
            flight,
            location: front.destination,
            remaining: path.len(),
        });
    }
    Ok((flight, path.is_empty()))
}

/// Arrival check at the end of the path. Returns whether the flight ended.
#[allow(clippy::too_many_arguments)]
fn arrive(
    world: &mut World,
    entity: Entity,
    flight: FlightId,
    stats: &FlightStats,
    services: &mut Services,
    config: &SimConfig,
    registry: &mut FlightRegistry,
    events: &mut Vec<FlightEvent>,
) -> Result<bool, TickFault> {
    let (location, outcome) = {
        let (vehicle, kin, path, pending) = world
            .query_one_mut::<(&Vehicle, &mut FlightKinematics, &mut FlightPath, &mut PendingArrival)>(
                entity,
            )?;
        let location = kin.last_location;
        let can_land =
            kin.altitude <= stats.landing_altitude || (kin.recon && pending.action.is_some());
        if !can_land {
            let grid = services.grid.as_ref();
            if config.holding_pattern_on_arrival
                && path.is_empty()
                && path.push_holding_loop(location, grid)
            {
                kin.fraction = 0.0;
                kin.speed_pct_per_tick = leg_speed(kin.origin, kin.origin, grid, config, kin.speed);
            }
            return Ok(false);
        }
        let outcome = match pending.action.take() {
            // The action already ran: the aircraft just settles here.
            None if pending.spent => ArrivalOutcome::Convert,
            action => {
                let action = action.unwrap_or(ArrivalAction::FormCaravan);
                debug!("flight {flight:?} invoking {} at {location:?}", action.name());
                pending.spent = true;
                action.invoke(vehicle, location, services.arrivals.as_mut())
            }
        };
        (location, outcome)
    };

    events.push(FlightEvent::Arrived {
        flight,
        location,
        outcome,
    });
    info!("flight {flight:?} arrived at {location:?}: {outcome:?}");

    let phase = match outcome {
        ArrivalOutcome::Continue => return Ok(false),
        ArrivalOutcome::Destroy => FlightPhase::Arrived,
        ArrivalOutcome::Convert => FlightPhase::Converted,
    };
    {
        let (kin, path) = world.query_one_mut::<(&mut FlightKinematics, &mut FlightPath)>(entity)?;
        kin.phase = phase;
        path.clear();
    }
    registry.deregister(entity);
    let vehicle = world.remove_one::<Vehicle>(entity)?;
    services.arrivals.release(vehicle, location, outcome);
    Ok(true)
}

/// Bring a flight down. Returns `false` if it was no longer airborne.
pub fn crash(
    world: &mut World,
    entity: Entity,
    services: &mut Services,
    registry: &mut FlightRegistry,
    cause: CrashCause,
    attacker: Option<InstallationId>,
    events: &mut Vec<FlightEvent>,
) -> Result<bool, TickFault> {
    let (flight, location) = {
        let (ident, kin, path) =
            world.query_one_mut::<(&FlightIdent, &mut FlightKinematics, &mut FlightPath)>(entity)?;
        if !kin.phase.is_airborne() {
            return Ok(false);
        }
        let grid = services.grid.as_ref();
        let position = current_position(kin, path, grid);
        let location: Option<LocationId> = grid.nearest_location(position);
        if let Some((snapped, at)) = location.and_then(|l| grid.position_of(l).map(|p| (l, p))) {
            kin.last_location = snapped;
            kin.origin = at;
        }
        kin.fraction = 0.0;
        kin.phase = FlightPhase::Crashed;
        path.clear();
        (ident.id, location)
    };

    registry.deregister(entity);
    let vehicle = world.remove_one::<Vehicle>(entity)?;
    info!("flight {flight:?} crashed at {location:?}: {cause:?}, attacker {attacker:?}");
    services.damage.handle_downed(vehicle, location, attacker);
    events.push(FlightEvent::Crashed {
        flight,
        location,
        cause,
        attacker,
    });
    Ok(true)
}

pub fn is_airborne(world: &World, entity: Entity) -> bool {
    world
        .get::<&FlightKinematics>(entity)
        .is_ok_and(|kin| kin.phase.is_airborne())
}

/// Forward damage to the damage collaborator; crash the flight if it says so.
/// Returns whether the flight went down.
pub fn apply_damage(
    world: &mut World,
    entity: Entity,
    services: &mut Services,
    registry: &mut FlightRegistry,
    damage: DamageInfo,
    attacker: Option<InstallationId>,
    events: &mut Vec<FlightEvent>,
) -> Result<bool, TickFault> {
    if !is_airborne(world, entity) {
        return Ok(false);
    }
    let outcome = {
        let vehicle = world.get::<&Vehicle>(entity)?;
        services.damage.apply_damage(&vehicle, &damage)
    };
    if !outcome.crash {
        return Ok(false);
    }
    crash(
        world,
        entity,
        services,
        registry,
        CrashCause::ShotDown,
        attacker,
        events,
    )
}

/// Apply defense shots and projectile hits collected this tick.
pub fn apply_shots(
    world: &mut World,
    services: &mut Services,
    registry: &mut FlightRegistry,
    shots: &[Shot],
    events: &mut Vec<FlightEvent>,
) {
    for shot in shots {
        if !is_airborne(world, shot.target) {
            continue;
        }
        events.push(FlightEvent::Hit {
            installation: shot.installation,
            flight: shot.flight,
            kind: shot.damage.kind,
            amount: shot.damage.amount,
        });
        if let Err(fault) = apply_damage(
            world,
            shot.target,
            services,
            registry,
            shot.damage,
            Some(shot.installation),
            events,
        ) {
            report_fault(world, shot.target, &fault, events);
        }
    }
}
