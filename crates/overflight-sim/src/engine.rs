//! Simulation engine: the root that owns every flight.
//!
//! `SimulationEngine` owns the hecs ECS world, the flight registry and the
//! collaborator services, runs all systems in a fixed order and produces
//! `FlightSnapshot`s. Completely headless, enabling deterministic testing.

use std::collections::BTreeMap;

use glam::DVec3;
use hecs::{Entity, World};
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use overflight_core::components::*;
use overflight_core::enums::FlightPhase;
use overflight_core::events::FlightEvent;
use overflight_core::state::FlightSnapshot;
use overflight_core::types::{FlightId, InstallationId, LocationId, SimTime, Waypoint};

use crate::arrival::{ArrivalAction, PendingArrival};
use crate::config::{ConfigError, SimConfig};
use crate::flight_path::FlightPath;
use crate::registry::FlightRegistry;
use crate::services::Services;
use crate::systems;
use crate::systems::flight::{clamp_speed, leg_speed, validate_stats};

/// Everything needed to put a vehicle in the air.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlan {
    /// Location the vehicle takes off from.
    pub origin: LocationId,
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub arrival: Option<ArrivalAction>,
    #[serde(default)]
    pub recon: bool,
}

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    pub(crate) world: World,
    pub(crate) time: SimTime,
    pub(crate) config: SimConfig,
    pub(crate) services: Services,
    pub(crate) registry: FlightRegistry,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) next_flight_id: u64,
    pub(crate) flights: BTreeMap<FlightId, Entity>,
    despawn_buffer: Vec<Entity>,
    events: Vec<FlightEvent>,
}

impl SimulationEngine {
    /// Create an engine. The registry is built lazily on the first tick.
    pub fn new(config: SimConfig, services: Services) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::new(),
            time: SimTime::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            services,
            registry: FlightRegistry::new(),
            next_flight_id: 0,
            flights: BTreeMap::new(),
            despawn_buffer: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Launch a vehicle. An unknown origin, an empty or invalid path, or
    /// unusable travel statistics reject the launch and hand the vehicle back.
    pub fn launch(&mut self, vehicle: Vehicle, plan: FlightPlan) -> Result<FlightId, Vehicle> {
        let grid = self.services.grid.as_ref();
        let Some(origin) = grid.position_of(plan.origin) else {
            warn!("launch of {:?} rejected: unknown origin {:?}", vehicle.id, plan.origin);
            return Err(vehicle);
        };
        let waypoint_count = plan.waypoints.len();
        let mut path = FlightPath::new();
        if !path.replace(plan.waypoints, grid) {
            warn!("launch of {:?} rejected: empty or invalid path", vehicle.id);
            return Err(vehicle);
        }
        let stats = self.services.stats.stats(&vehicle);
        if validate_stats(&stats, vehicle.id).is_err() {
            warn!("launch of {:?} rejected: unusable travel statistics", vehicle.id);
            return Err(vehicle);
        }

        let speed = clamp_speed(stats.flight_speed, &self.config);
        let first = path
            .front()
            .and_then(|w| grid.position_of(w.destination))
            .unwrap_or(origin);
        let kinematics = FlightKinematics {
            origin,
            last_location: plan.origin,
            fraction: 0.0,
            altitude: stats.min_altitude,
            speed_pct_per_tick: leg_speed(origin, first, grid, &self.config, speed),
            speed,
            recon: plan.recon,
            phase: FlightPhase::Airborne,
        };

        let id = FlightId(self.next_flight_id);
        self.next_flight_id += 1;
        let vehicle_id = vehicle.id;
        let entity = self.world.spawn((
            FlightIdent { id },
            vehicle,
            kinematics,
            path,
            PendingArrival::new(plan.arrival),
        ));
        self.flights.insert(id, entity);
        self.register(entity);

        info!("flight {id:?} launched: {vehicle_id:?}, {waypoint_count} waypoints");
        self.events.push(FlightEvent::Launched {
            flight: id,
            vehicle: vehicle_id,
            waypoints: waypoint_count,
        });
        Ok(id)
    }

    /// Give an airborne flight a new path and arrival action, starting from
    /// where it is now. Returns `false` (and changes nothing) if the flight is
    /// unknown or grounded, or the path is empty or invalid.
    pub fn relaunch(
        &mut self,
        flight: FlightId,
        waypoints: Vec<Waypoint>,
        arrival: Option<ArrivalAction>,
    ) -> bool {
        let Some(entity) = self.airborne_entity(flight) else {
            return false;
        };
        let grid = self.services.grid.as_ref();
        let mut path = FlightPath::new();
        if !path.replace(waypoints, grid) {
            warn!("relaunch of {flight:?} rejected: empty or invalid path");
            return false;
        }
        let speed = {
            let Ok(vehicle) = self.world.get::<&Vehicle>(entity) else {
                return false;
            };
            clamp_speed(self.services.stats.stats(&vehicle).flight_speed, &self.config)
        };

        let Ok((kin, current_path, pending)) = self
            .world
            .query_one_mut::<(&mut FlightKinematics, &mut FlightPath, &mut PendingArrival)>(entity)
        else {
            return false;
        };
        let here = systems::flight::current_position(kin, current_path, grid);
        let first = path
            .front()
            .and_then(|w| grid.position_of(w.destination))
            .unwrap_or(here);
        kin.origin = here;
        if let Some(location) = grid.nearest_location(here) {
            kin.last_location = location;
        }
        kin.fraction = 0.0;
        kin.speed = speed;
        kin.speed_pct_per_tick = leg_speed(here, first, grid, &self.config, speed);
        *current_path = path;
        *pending = PendingArrival::new(arrival);

        self.register(entity);
        info!("flight {flight:?} relaunched");
        true
    }

    /// Append a holding loop over `location` to an airborne flight's path.
    pub fn push_holding_loop(&mut self, flight: FlightId, location: LocationId) -> bool {
        let Some(entity) = self.airborne_entity(flight) else {
            return false;
        };
        let grid = self.services.grid.as_ref();
        let Ok((kin, path)) = self
            .world
            .query_one_mut::<(&mut FlightKinematics, &mut FlightPath)>(entity)
        else {
            return false;
        };
        let was_empty = path.is_empty();
        if !path.push_holding_loop(location, grid) {
            return false;
        }
        if was_empty {
            // The loop is now the current leg.
            let to = grid.position_of(location).unwrap_or(kin.origin);
            kin.fraction = 0.0;
            kin.speed_pct_per_tick = leg_speed(kin.origin, to, grid, &self.config, kin.speed);
        }
        self.register(entity);
        true
    }

    /// Damage entry point. Returns whether the flight went down.
    pub fn apply_damage(
        &mut self,
        flight: FlightId,
        damage: DamageInfo,
        attacker: Option<InstallationId>,
    ) -> bool {
        let Some(entity) = self.airborne_entity(flight) else {
            return false;
        };
        match systems::flight::apply_damage(
            &mut self.world,
            entity,
            &mut self.services,
            &mut self.registry,
            damage,
            attacker,
            &mut self.events,
        ) {
            Ok(crashed) => crashed,
            Err(fault) => {
                systems::flight::report_fault(&self.world, entity, &fault, &mut self.events);
                false
            }
        }
    }

    /// Faction relationships changed: rebuild defenses before the next tick.
    pub fn notify_relations_changed(&mut self) {
        self.registry.mark_dirty();
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> FlightSnapshot {
        self.ensure_registry();
        self.run_systems();
        self.time.advance();

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            &self.registry,
            self.services.grid.as_ref(),
            &self.config,
            events,
        )
    }

    /// Run all systems in order. Flights move before defenses look at them.
    fn run_systems(&mut self) {
        // 1. Flight movement, arrival, altitude and fuel
        systems::flight::run(
            &mut self.world,
            &mut self.services,
            &self.config,
            &mut self.registry,
            &mut self.events,
        );
        // 2. Defenses against this tick's positions
        let output = self.registry.run(
            &self.world,
            &self.services,
            &self.config,
            &mut self.rng,
            &mut self.events,
        );
        // 3. Area defense hits
        systems::flight::apply_shots(
            &mut self.world,
            &mut self.services,
            &mut self.registry,
            &output.shots,
            &mut self.events,
        );
        // 4. Projectiles: spawn new, steer all, apply hits
        systems::projectile::spawn(&mut self.world, &output.launches, &self.config);
        let hits = systems::projectile::run(
            &mut self.world,
            self.services.grid.as_ref(),
            &mut self.despawn_buffer,
        );
        systems::flight::apply_shots(
            &mut self.world,
            &mut self.services,
            &mut self.registry,
            &hits,
            &mut self.events,
        );
        // 5. Cleanup of ended flights
        systems::cleanup::run(&mut self.world, &mut self.despawn_buffer);
        let world = &self.world;
        self.flights.retain(|_, entity| world.contains(*entity));
    }

    /// Rebuild the registry if it was never built or relations changed, then
    /// re-sample every airborne flight.
    fn ensure_registry(&mut self) {
        if !self.registry.needs_rebuild() {
            return;
        }
        self.registry.rebuild(&self.services, &self.config);
        for entity in systems::flight::airborne_flights(&self.world) {
            self.register(entity);
        }
    }

    fn register(&mut self, entity: Entity) {
        if self.registry.needs_rebuild() {
            // Sampled on the rebuild at the start of the next tick.
            return;
        }
        if let Err(fault) = systems::flight::register_flight(
            &self.world,
            entity,
            &self.services,
            &self.config,
            &mut self.registry,
        ) {
            systems::flight::report_fault(&self.world, entity, &fault, &mut self.events);
        }
    }

    fn airborne_entity(&self, flight: FlightId) -> Option<Entity> {
        let entity = *self.flights.get(&flight)?;
        systems::flight::is_airborne(&self.world, entity).then_some(entity)
    }

    /// Interpolated embedded position of an airborne flight.
    pub fn position(&self, flight: FlightId) -> Option<DVec3> {
        let entity = self.airborne_entity(flight)?;
        let kin = self.world.get::<&FlightKinematics>(entity).ok()?;
        let path = self.world.get::<&FlightPath>(entity).ok()?;
        Some(systems::flight::current_position(
            &kin,
            &path,
            self.services.grid.as_ref(),
        ))
    }

    /// Nearest valid location to an airborne flight.
    pub fn nearest_location(&self, flight: FlightId) -> Option<LocationId> {
        let position = self.position(flight)?;
        self.services.grid.nearest_location(position)
    }

    pub fn altitude(&self, flight: FlightId) -> Option<f64> {
        let entity = self.airborne_entity(flight)?;
        let kin = self.world.get::<&FlightKinematics>(entity).ok()?;
        Some(kin.altitude)
    }

    pub fn ticks_remaining(&self, flight: FlightId) -> Option<u64> {
        let entity = self.airborne_entity(flight)?;
        let kin = self.world.get::<&FlightKinematics>(entity).ok()?;
        let path = self.world.get::<&FlightPath>(entity).ok()?;
        Some(systems::flight::ticks_remaining(
            &kin,
            &path,
            self.services.grid.as_ref(),
            &self.config,
        ))
    }

    pub fn is_airborne(&self, flight: FlightId) -> bool {
        self.airborne_entity(flight).is_some()
    }

    /// ECS entity of a live flight.
    pub fn flight_entity(&self, flight: FlightId) -> Option<Entity> {
        self.flights.get(&flight).copied()
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &FlightRegistry {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }
}
