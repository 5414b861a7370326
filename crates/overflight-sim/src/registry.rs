//! Flight registry: which defenses may engage which flights.
//!
//! Candidates are pre-filtered from path samples on launch/relaunch so the
//! per-tick defense pass only looks at flights that will pass within reach.
//! Owned by the engine; entries are removed as soon as a flight terminates.

use std::collections::BTreeMap;

use glam::DVec3;
use hecs::{Entity, World};
use log::{debug, error, info, warn};
use rand_chacha::ChaCha8Rng;

use overflight_core::components::{DefenseProfile, FlightIdent, FlightKinematics};
use overflight_core::events::FlightEvent;
use overflight_core::types::{FactionId, InstallationId, LocationId};

use crate::config::SimConfig;
use crate::defense::{AreaDefense, Contact, ContactMap, DefenseOutput, StationaryAreaDefense};
use crate::flight_path::FlightPath;
use crate::services::Services;
use crate::systems;

/// A qualifying installation as seen by candidate sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct DefenseSite {
    pub id: InstallationId,
    pub location: LocationId,
    pub position: DVec3,
    pub faction: FactionId,
    pub reach: f64,
}

#[derive(Debug, Default)]
pub struct FlightRegistry {
    candidates: BTreeMap<Entity, Vec<InstallationId>>,
    /// Inverse index: the defenses with per-tick work.
    by_defense: BTreeMap<InstallationId, Vec<Entity>>,
    area: BTreeMap<InstallationId, AreaDefense>,
    stationary: BTreeMap<InstallationId, StationaryAreaDefense>,
    sites: Vec<DefenseSite>,
    dirty: bool,
    built: bool,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faction relationships changed; rebuild before the next tick's work.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.dirty || !self.built
    }

    /// Rebuild the installation caches from the directory. Defenses that
    /// still qualify keep their engagement state. Candidate lists are
    /// cleared; callers must re-register every airborne flight.
    pub fn rebuild(&mut self, services: &Services, config: &SimConfig) {
        let mut installations = services.installations.installations();
        installations.sort_by_key(|i| i.id);

        let mut old_area = std::mem::take(&mut self.area);
        let mut old_stationary = std::mem::take(&mut self.stationary);
        self.sites.clear();

        for inst in installations {
            let Some(profile) = inst.defense else {
                continue;
            };
            if !services.relations.is_hostile(inst.faction, config.player_faction) {
                continue;
            }
            let Some(position) = services.grid.position_of(inst.location) else {
                warn!(
                    "installation {:?} sits on unknown location {:?}, skipped",
                    inst.id, inst.location
                );
                continue;
            };
            match profile {
                DefenseProfile::Area(p) => {
                    let defense = match old_area.remove(&inst.id) {
                        Some(mut d) => {
                            d.refresh(position, p);
                            d
                        }
                        None => AreaDefense::new(inst.id, position, p),
                    };
                    self.area.insert(inst.id, defense);
                }
                DefenseProfile::Stationary(p) => {
                    let defense = match old_stationary.remove(&inst.id) {
                        Some(mut d) => {
                            d.refresh(position, p);
                            d
                        }
                        None => StationaryAreaDefense::new(inst.id, position, p),
                    };
                    self.stationary.insert(inst.id, defense);
                }
            }
            self.sites.push(DefenseSite {
                id: inst.id,
                location: inst.location,
                position,
                faction: inst.faction,
                reach: profile.reach(),
            });
        }

        self.candidates.clear();
        self.by_defense.clear();
        self.dirty = false;
        self.built = true;
        info!(
            "flight registry rebuilt: {} area, {} stationary defenses",
            self.area.len(),
            self.stationary.len()
        );
    }

    /// Replace the candidate list of `entity` from its path samples.
    /// Returns the number of candidate defenses.
    pub fn register(
        &mut self,
        entity: Entity,
        faction: FactionId,
        samples: &[DVec3],
        services: &Services,
    ) -> usize {
        self.unlink(entity);

        let found: Vec<InstallationId> = self
            .sites
            .iter()
            .filter(|site| services.relations.is_hostile(site.faction, faction))
            .filter(|site| {
                samples
                    .iter()
                    .any(|s| services.grid.distance(site.position, *s) <= site.reach)
            })
            .map(|site| site.id)
            .collect();

        for id in &found {
            self.by_defense.entry(*id).or_default().push(entity);
        }
        debug!(
            "entity {entity:?} registered against {} defenses from {} samples",
            found.len(),
            samples.len()
        );
        let count = found.len();
        self.candidates.insert(entity, found);
        count
    }

    /// Remove `entity` from every index, acquired set and rotation.
    pub fn deregister(&mut self, entity: Entity) {
        self.unlink(entity);
        self.candidates.remove(&entity);
        for defense in self.area.values_mut() {
            defense.forget(entity);
        }
        for defense in self.stationary.values_mut() {
            defense.forget(entity);
        }
    }

    fn unlink(&mut self, entity: Entity) {
        let Some(previous) = self.candidates.get(&entity) else {
            return;
        };
        for id in previous {
            if let Some(list) = self.by_defense.get_mut(id) {
                list.retain(|e| *e != entity);
                if list.is_empty() {
                    self.by_defense.remove(id);
                }
            }
        }
    }

    pub fn candidates(&self, entity: Entity) -> &[InstallationId] {
        self.candidates.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Flights a defense is currently checking.
    pub fn candidates_of(&self, installation: InstallationId) -> &[Entity] {
        self.by_defense
            .get(&installation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_registered(&self, entity: Entity) -> bool {
        self.candidates.contains_key(&entity)
    }

    pub fn sites(&self) -> &[DefenseSite] {
        &self.sites
    }

    pub fn area_defenses(&self) -> impl Iterator<Item = &AreaDefense> {
        self.area.values()
    }

    pub fn stationary_defenses(&self) -> impl Iterator<Item = &StationaryAreaDefense> {
        self.stationary.values()
    }

    pub fn area_defense(&self, id: InstallationId) -> Option<&AreaDefense> {
        self.area.get(&id)
    }

    pub fn area_defense_mut(&mut self, id: InstallationId) -> Option<&mut AreaDefense> {
        self.area.get_mut(&id)
    }

    pub fn stationary_defense(&self, id: InstallationId) -> Option<&StationaryAreaDefense> {
        self.stationary.get(&id)
    }

    pub fn stationary_defense_mut(
        &mut self,
        id: InstallationId,
    ) -> Option<&mut StationaryAreaDefense> {
        self.stationary.get_mut(&id)
    }

    /// Run every defense with work this tick. Shots and projectile launches
    /// are returned for the engine to apply afterwards.
    pub fn run(
        &mut self,
        world: &World,
        services: &Services,
        config: &SimConfig,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<FlightEvent>,
    ) -> DefenseOutput {
        let mut output = DefenseOutput::default();
        if self.by_defense.is_empty()
            && self.area.values().all(|d| d.acquired.is_empty())
            && self.stationary.values().all(|d| d.targets.is_empty())
        {
            return output;
        }

        let contacts = collect_contacts(world, services);
        let grid = services.grid.as_ref();

        for (id, defense) in self.area.iter_mut() {
            let candidates = self.by_defense.get(id).map(Vec::as_slice).unwrap_or(&[]);
            if candidates.is_empty() && defense.acquired.is_empty() {
                continue;
            }
            if let Err(fault) = systems::area_defense::run(
                defense,
                candidates,
                &contacts,
                grid,
                config,
                rng,
                &mut output.shots,
                events,
            ) {
                error!("area defense {id:?} skipped this tick: {fault}");
                events.push(FlightEvent::TickFault {
                    flight: None,
                    installation: Some(*id),
                    message: fault.to_string(),
                });
            }
        }

        for (id, defense) in self.stationary.iter_mut() {
            let candidates = self.by_defense.get(id).map(Vec::as_slice).unwrap_or(&[]);
            if candidates.is_empty() && defense.targets.is_empty() && defense.rotation.is_empty() {
                continue;
            }
            if let Err(fault) = systems::stationary_defense::run(
                defense,
                candidates,
                &contacts,
                grid,
                &mut output.launches,
                events,
            ) {
                error!("stationary defense {id:?} skipped this tick: {fault}");
                events.push(FlightEvent::TickFault {
                    flight: None,
                    installation: Some(*id),
                    message: fault.to_string(),
                });
            }
        }

        output
    }
}

/// One contact per flight entity, positioned at this tick's interpolated point.
pub fn collect_contacts(world: &World, services: &Services) -> ContactMap {
    world
        .query::<(&FlightIdent, &FlightKinematics, &FlightPath)>()
        .iter()
        .map(|(entity, (ident, kin, path))| {
            let contact = Contact {
                entity,
                flight: ident.id,
                position: systems::flight::current_position(kin, path, services.grid.as_ref()),
                altitude: kin.altitude,
                airborne: kin.phase.is_airborne(),
            };
            (entity, contact)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceServices;
    use overflight_core::components::{
        AreaDefenseProfile, FlightStats, Installation, StationaryDefenseProfile,
    };
    use overflight_core::enums::EngagementStrategy;
    use overflight_world::SphereGrid;

    const PLAYER: FactionId = FactionId(0);
    const ENEMY: FactionId = FactionId(1);

    fn refs() -> ReferenceServices {
        let stats = FlightStats {
            flight_speed: 1.0,
            climb_rate: 10.0,
            min_altitude: 0.0,
            max_altitude: 1000.0,
            landing_altitude: 50.0,
        };
        let refs = ReferenceServices::new(SphereGrid::new(100.0, 1.0), stats, 10.0);
        refs.relations.set_hostile(ENEMY, PLAYER, true);
        refs.installations.add(Installation {
            id: InstallationId(1),
            location: refs.grid.location_at(0.5, 0.5),
            faction: ENEMY,
            defense: Some(DefenseProfile::Area(AreaDefenseProfile {
                max_distance: 3.0,
                sweep_arc_deg: 90.0,
                sweep_direction: 1,
                initial_angle_deg: 0.0,
                strategy: EngagementStrategy::Nearest,
                damage: 1.0,
                hit_chance: 1.0,
                refire_ticks: 0,
            })),
        });
        refs.installations.add(Installation {
            id: InstallationId(2),
            location: refs.grid.location_at(0.5, 10.5),
            faction: ENEMY,
            defense: Some(DefenseProfile::Stationary(StationaryDefenseProfile {
                max_range: 3.0,
                fire_interval_ticks: 2,
                damage: 1.0,
                projectile_speed: 5.0,
            })),
        });
        // Friendly and undefended installations never qualify.
        refs.installations.add(Installation {
            id: InstallationId(3),
            location: refs.grid.location_at(0.5, 5.5),
            faction: PLAYER,
            defense: Some(DefenseProfile::Stationary(StationaryDefenseProfile {
                max_range: 50.0,
                fire_interval_ticks: 1,
                damage: 1.0,
                projectile_speed: 5.0,
            })),
        });
        refs.installations.add(Installation {
            id: InstallationId(4),
            location: refs.grid.location_at(0.5, 5.5),
            faction: ENEMY,
            defense: None,
        });
        refs
    }

    fn built(refs: &ReferenceServices) -> (FlightRegistry, Services) {
        let services = refs.services();
        let mut registry = FlightRegistry::new();
        assert!(registry.needs_rebuild());
        registry.rebuild(&services, &SimConfig::default());
        assert!(!registry.needs_rebuild());
        (registry, services)
    }

    fn samples(refs: &ReferenceServices, lons: &[f64]) -> Vec<DVec3> {
        lons.iter().map(|lon| refs.grid.embed(0.5, *lon)).collect()
    }

    #[test]
    fn test_rebuild_keeps_only_hostile_defenses() {
        let refs = refs();
        let (registry, _) = built(&refs);
        let ids: Vec<InstallationId> = registry.sites().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![InstallationId(1), InstallationId(2)]);
        assert!(registry.area_defense(InstallationId(1)).is_some());
        assert!(registry.stationary_defense(InstallationId(2)).is_some());
        assert!(registry.stationary_defense(InstallationId(3)).is_none());
    }

    #[test]
    fn test_register_samples_path_against_reach() {
        let refs = refs();
        let (mut registry, services) = built(&refs);
        let mut world = World::new();
        let near_start = world.spawn(());
        let whole_way = world.spawn(());

        let count = registry.register(near_start, PLAYER, &samples(&refs, &[1.0, 3.0]), &services);
        assert_eq!(count, 1);
        assert_eq!(registry.candidates(near_start), &[InstallationId(1)]);

        let path: Vec<f64> = (0..=20).map(|i| 0.5 + i as f64 * 0.5).collect();
        registry.register(whole_way, PLAYER, &samples(&refs, &path), &services);
        assert_eq!(
            registry.candidates(whole_way),
            &[InstallationId(1), InstallationId(2)]
        );
        assert_eq!(registry.candidates_of(InstallationId(1)), &[near_start, whole_way]);
        assert_eq!(registry.candidates_of(InstallationId(2)), &[whole_way]);

        // Same-faction flights are never candidates.
        let enemy_flight = world.spawn(());
        assert_eq!(
            registry.register(enemy_flight, ENEMY, &samples(&refs, &path), &services),
            0
        );
        assert!(registry.is_registered(enemy_flight));
    }

    #[test]
    fn test_reregister_replaces_candidates() {
        let refs = refs();
        let (mut registry, services) = built(&refs);
        let mut world = World::new();
        let entity = world.spawn(());

        registry.register(entity, PLAYER, &samples(&refs, &[1.0]), &services);
        registry.register(entity, PLAYER, &samples(&refs, &[10.0]), &services);
        assert_eq!(registry.candidates(entity), &[InstallationId(2)]);
        assert!(registry.candidates_of(InstallationId(1)).is_empty());
    }

    #[test]
    fn test_deregister_clears_every_index() {
        let refs = refs();
        let (mut registry, services) = built(&refs);
        let mut world = World::new();
        let entity = world.spawn(());
        registry.register(entity, PLAYER, &samples(&refs, &[1.0, 10.0]), &services);

        if let Some(area) = registry.area_defense_mut(InstallationId(1)) {
            area.acquire(entity);
            area.current = Some(entity);
        }
        if let Some(stationary) = registry.stationary_defense_mut(InstallationId(2)) {
            stationary.add_target(entity);
        }

        registry.deregister(entity);
        assert!(!registry.is_registered(entity));
        assert!(registry.candidates(entity).is_empty());
        assert!(registry.candidates_of(InstallationId(1)).is_empty());
        assert!(registry.candidates_of(InstallationId(2)).is_empty());
        let area = registry.area_defense(InstallationId(1)).unwrap();
        assert!(area.acquired.is_empty() && area.current.is_none());
        let stationary = registry.stationary_defense(InstallationId(2)).unwrap();
        assert!(stationary.targets.is_empty() && stationary.rotation.is_empty());
    }

    #[test]
    fn test_rebuild_preserves_engagement_state() {
        let refs = refs();
        let (mut registry, services) = built(&refs);
        let mut world = World::new();
        let entity = world.spawn(());
        registry.register(entity, PLAYER, &samples(&refs, &[1.0]), &services);
        if let Some(area) = registry.area_defense_mut(InstallationId(1)) {
            area.sweep_angle = 123.0;
            area.cooldown = 4;
        }

        registry.mark_dirty();
        assert!(registry.needs_rebuild());
        registry.rebuild(&services, &SimConfig::default());

        let area = registry.area_defense(InstallationId(1)).unwrap();
        assert_eq!(area.sweep_angle, 123.0);
        assert_eq!(area.cooldown, 4);
        assert!(
            !registry.is_registered(entity),
            "candidates are cleared until flights re-register"
        );

        refs.relations.set_hostile(ENEMY, PLAYER, false);
        registry.rebuild(&services, &SimConfig::default());
        assert!(registry.sites().is_empty());
        assert!(registry.area_defense(InstallationId(1)).is_none());
    }

    #[test]
    fn test_run_without_work_is_a_no_op() {
        let refs = refs();
        let (mut registry, services) = built(&refs);
        let world = World::new();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
        let mut events = Vec::new();
        let output = registry.run(&world, &services, &SimConfig::default(), &mut rng, &mut events);
        assert!(output.shots.is_empty() && output.launches.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_faulty_defense_does_not_stop_others() {
        use overflight_core::enums::{DamageKind, FlightPhase};
        use overflight_core::types::FlightId;

        let refs = refs();
        let (mut registry, services) = built(&refs);
        let mut world = World::new();
        let mut spawn = |id: u64, lon: f64| {
            let origin = refs.grid.embed(0.5, lon);
            let entity = world.spawn((
                FlightIdent { id: FlightId(id) },
                FlightKinematics {
                    origin,
                    last_location: refs.grid.location_at(0.5, lon),
                    fraction: 0.0,
                    altitude: 200.0,
                    speed_pct_per_tick: 0.0,
                    speed: 1.0,
                    recon: false,
                    phase: FlightPhase::Airborne,
                },
                FlightPath::new(),
            ));
            (entity, origin)
        };
        let (near_area, at_area) = spawn(0, 1.0);
        let (near_site, at_site) = spawn(1, 10.0);
        registry.register(near_area, PLAYER, &[at_area], &services);
        registry.register(near_site, PLAYER, &[at_site], &services);

        registry
            .area_defense_mut(InstallationId(1))
            .unwrap()
            .sweep_angle = f64::NAN;

        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
        let mut events = Vec::new();
        let output = registry.run(&world, &services, &SimConfig::default(), &mut rng, &mut events);

        assert!(
            events.iter().any(|e| matches!(
                e,
                FlightEvent::TickFault {
                    flight: None,
                    installation: Some(InstallationId(1)),
                    ..
                }
            )),
            "broken area defense reports a fault"
        );
        assert!(
            events.iter().any(|e| matches!(
                e,
                FlightEvent::Fired {
                    installation: InstallationId(2),
                    kind: DamageKind::Projectile,
                    ..
                }
            )),
            "healthy site still fires this tick"
        );
        assert_eq!(output.launches.len(), 1);
        assert!(output.shots.is_empty());
    }
}
