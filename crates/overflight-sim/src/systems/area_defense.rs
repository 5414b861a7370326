//! Area defense system: sweep for candidates, slew onto the current target,
//! fire when locked.
//!
//! The search cone turns slowly while idle (`sweep_rate_deg`) and the mount
//! slews faster once a target is selected (`tracking_rate_deg`).

use hecs::Entity;
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use overflight_core::components::DamageInfo;
use overflight_core::enums::{DamageKind, EngagementStrategy};
use overflight_core::events::FlightEvent;
use overflight_core::types::{angle_delta, wrap_degrees};
use overflight_world::WorldGrid;

use crate::config::SimConfig;
use crate::defense::{AreaDefense, Contact, ContactMap, Shot};
use crate::error::TickFault;

/// Run one area defense for one tick against its registry candidates.
#[allow(clippy::too_many_arguments)]
pub fn run(
    defense: &mut AreaDefense,
    candidates: &[Entity],
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
    shots: &mut Vec<Shot>,
    events: &mut Vec<FlightEvent>,
) -> Result<(), TickFault> {
    if !defense.sweep_angle.is_finite() {
        return Err(TickFault::NonFinite {
            what: "sweep angle",
            installation: Some(defense.installation),
        });
    }
    defense.cooldown = defense.cooldown.saturating_sub(1);

    prune(defense, candidates, contacts, grid, events);
    if defense.current.is_none() {
        defense.current = select_target(defense, contacts, grid);
    }

    match defense.current {
        None => {
            sweep(defense, candidates, contacts, grid, config, events)?;
            defense.current = select_target(defense, contacts, grid);
        }
        Some(target) => {
            let Some(contact) = contacts.get(&target) else {
                defense.current = None;
                return Ok(());
            };
            track(defense, contact, grid, config, rng, shots, events)?;
        }
    }
    Ok(())
}

fn in_range(defense: &AreaDefense, contact: &Contact, grid: &dyn WorldGrid) -> bool {
    grid.distance(defense.position, contact.position) <= defense.profile.max_distance
}

/// Drop acquired targets that are gone, grounded, no longer candidates or
/// out of range.
fn prune(
    defense: &mut AreaDefense,
    candidates: &[Entity],
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
    events: &mut Vec<FlightEvent>,
) {
    let lost: Vec<Entity> = defense
        .acquired
        .iter()
        .copied()
        .filter(|entity| match contacts.get(entity) {
            Some(contact) => {
                !contact.airborne
                    || !candidates.contains(entity)
                    || !in_range(defense, contact, grid)
            }
            None => true,
        })
        .collect();

    for entity in lost {
        defense.forget(entity);
        if let Some(contact) = contacts.get(&entity) {
            debug!(
                "{:?} lost flight {:?}",
                defense.installation, contact.flight
            );
            events.push(FlightEvent::TargetLost {
                installation: defense.installation,
                flight: contact.flight,
            });
        }
    }
}

fn select_target(
    defense: &AreaDefense,
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
) -> Option<Entity> {
    let mut acquired = defense
        .acquired
        .iter()
        .filter_map(|entity| contacts.get(entity));
    let chosen = match defense.profile.strategy {
        EngagementStrategy::FirstAcquired => acquired.next(),
        EngagementStrategy::Nearest => acquired.min_by(|a, b| {
            let da = grid.distance(defense.position, a.position);
            let db = grid.distance(defense.position, b.position);
            da.total_cmp(&db)
        }),
        EngagementStrategy::LowestAltitude => {
            acquired.min_by(|a, b| a.altitude.total_cmp(&b.altitude))
        }
    };
    chosen.map(|contact| contact.entity)
}

/// Turn the search cone and acquire every candidate inside it.
fn sweep(
    defense: &mut AreaDefense,
    candidates: &[Entity],
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
    config: &SimConfig,
    events: &mut Vec<FlightEvent>,
) -> Result<(), TickFault> {
    defense.sweep_angle =
        wrap_degrees(defense.sweep_angle + config.sweep_rate_deg * defense.direction);
    let half_arc = defense.profile.sweep_arc_deg / 2.0;

    for entity in candidates {
        let Some(contact) = contacts.get(entity) else {
            continue;
        };
        if !contact.airborne || defense.is_acquired(*entity) || !in_range(defense, contact, grid) {
            continue;
        }
        let bearing = grid.bearing_deg(defense.position, contact.position);
        if !bearing.is_finite() {
            return Err(TickFault::NonFinite {
                what: "bearing",
                installation: Some(defense.installation),
            });
        }
        if angle_delta(defense.sweep_angle, bearing).abs() <= half_arc {
            defense.acquire(*entity);
            debug!(
                "{:?} acquired flight {:?} at bearing {bearing:.1}",
                defense.installation, contact.flight
            );
            events.push(FlightEvent::TargetAcquired {
                installation: defense.installation,
                flight: contact.flight,
            });
        }
    }
    Ok(())
}

/// Slew toward the current target; fire once within tolerance.
fn track(
    defense: &mut AreaDefense,
    contact: &Contact,
    grid: &dyn WorldGrid,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
    shots: &mut Vec<Shot>,
    events: &mut Vec<FlightEvent>,
) -> Result<(), TickFault> {
    let bearing = grid.bearing_deg(defense.position, contact.position);
    if !bearing.is_finite() {
        return Err(TickFault::NonFinite {
            what: "bearing",
            installation: Some(defense.installation),
        });
    }
    let delta = angle_delta(defense.sweep_angle, bearing);

    if delta.abs() > config.tracking_tolerance_deg {
        let step = config.tracking_rate_deg.min(delta.abs()) * delta.signum();
        defense.sweep_angle = wrap_degrees(defense.sweep_angle + step);
        return Ok(());
    }

    defense.sweep_angle = wrap_degrees(bearing);
    if defense.cooldown > 0 {
        return Ok(());
    }

    let chance = if defense.profile.hit_chance.is_finite() {
        defense.profile.hit_chance.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let hit = rng.gen_bool(chance);
    defense.cooldown = defense.profile.refire_ticks;
    debug!(
        "{:?} fired at flight {:?}: {}",
        defense.installation,
        contact.flight,
        if hit { "hit" } else { "miss" }
    );
    events.push(FlightEvent::Fired {
        installation: defense.installation,
        flight: contact.flight,
        kind: DamageKind::Flak,
    });
    if hit {
        shots.push(Shot {
            installation: defense.installation,
            target: contact.entity,
            flight: contact.flight,
            damage: DamageInfo {
                amount: defense.profile.damage,
                kind: DamageKind::Flak,
            },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overflight_core::components::AreaDefenseProfile;
    use overflight_core::types::{FlightId, InstallationId};
    use overflight_world::SphereGrid;
    use rand::SeedableRng;

    fn grid() -> SphereGrid {
        SphereGrid::new(100.0, 1.0)
    }

    fn profile(strategy: EngagementStrategy) -> AreaDefenseProfile {
        AreaDefenseProfile {
            max_distance: 10.0,
            sweep_arc_deg: 30.0,
            sweep_direction: 1,
            initial_angle_deg: 0.0,
            strategy,
            damage: 4.0,
            hit_chance: 1.0,
            refire_ticks: 0,
        }
    }

    struct Bench {
        grid: SphereGrid,
        config: SimConfig,
        defense: AreaDefense,
        entities: Vec<Entity>,
        contacts: ContactMap,
        rng: ChaCha8Rng,
        shots: Vec<Shot>,
        events: Vec<FlightEvent>,
    }

    impl Bench {
        /// Defense at (0°N, 0°E); one contact per (lat, lon, altitude).
        fn new(strategy: EngagementStrategy, at: &[(f64, f64, f64)]) -> Self {
            let grid = grid();
            let defense = AreaDefense::new(InstallationId(1), grid.embed(0.0, 0.0), profile(strategy));
            let mut world = hecs::World::new();
            let mut entities = Vec::new();
            let mut contacts = ContactMap::new();
            for (i, (lat, lon, alt)) in at.iter().enumerate() {
                let entity = world.spawn(());
                entities.push(entity);
                contacts.insert(
                    entity,
                    Contact {
                        entity,
                        flight: FlightId(i as u64),
                        position: grid.embed(*lat, *lon),
                        altitude: *alt,
                        airborne: true,
                    },
                );
            }
            Self {
                grid,
                config: SimConfig {
                    tracking_tolerance_deg: 2.5,
                    ..SimConfig::default()
                },
                defense,
                entities,
                contacts,
                rng: ChaCha8Rng::seed_from_u64(7),
                shots: Vec::new(),
                events: Vec::new(),
            }
        }

        fn tick(&mut self) {
            let candidates = self.entities.clone();
            run(
                &mut self.defense,
                &candidates,
                &self.contacts,
                &self.grid,
                &self.config,
                &mut self.rng,
                &mut self.shots,
                &mut self.events,
            )
            .unwrap();
        }

        fn acquisitions(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, FlightEvent::TargetAcquired { .. }))
                .count()
        }
    }

    #[test]
    fn test_acquisition_tick_from_bearing_offset() {
        // Target due east (bearing 90), sweep starts north, arc 30, 0.35°/tick:
        // acquired on tick ceil((90 - 15) / 0.35) = 215.
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        for tick in 1..=214 {
            bench.tick();
            assert_eq!(bench.acquisitions(), 0, "acquired early on tick {tick}");
        }
        bench.tick();
        assert_eq!(bench.acquisitions(), 1, "should acquire on tick 215");
        assert_eq!(bench.defense.current, Some(bench.entities[0]));
    }

    #[test]
    fn test_out_of_range_never_acquired() {
        // ~17.5 units away with a 10 unit reach.
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 10.0, 100.0)]);
        for _ in 0..1100 {
            bench.tick();
        }
        assert_eq!(bench.acquisitions(), 0);
        assert!(bench.defense.acquired.is_empty());
    }

    #[test]
    fn test_locked_target_is_fired_on() {
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        bench.defense.acquire(bench.entities[0]);
        // Bearing 90 from angle 0 at 2°/tick with 2.5° tolerance: 44 slewing
        // ticks, fire on tick 45.
        for _ in 0..44 {
            bench.tick();
        }
        assert!(bench.shots.is_empty(), "must not fire while slewing");
        bench.tick();
        assert_eq!(bench.shots.len(), 1);
        assert!((bench.defense.sweep_angle - 90.0).abs() < 1e-6);
        assert_eq!(bench.shots[0].damage.amount, 4.0);
        assert_eq!(bench.shots[0].installation, InstallationId(1));
    }

    #[test]
    fn test_slew_takes_shorter_side() {
        // Target due west: bearing 270, from angle 0 the short way is -90.
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, -2.0, 100.0)]);
        bench.defense.acquire(bench.entities[0]);
        bench.tick();
        assert!(
            (bench.defense.sweep_angle - 358.0).abs() < 1e-9,
            "should slew counter-clockwise, got {}",
            bench.defense.sweep_angle
        );
    }

    #[test]
    fn test_refire_cooldown_spaces_shots() {
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        bench.defense.profile.refire_ticks = 3;
        bench.defense.sweep_angle = 90.0;
        bench.defense.acquire(bench.entities[0]);
        for _ in 0..7 {
            bench.tick();
        }
        // Shots on ticks 1, 4 and 7.
        assert_eq!(bench.shots.len(), 3);
    }

    #[test]
    fn test_missed_shots_use_rng() {
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        bench.defense.profile.hit_chance = 0.0;
        bench.defense.sweep_angle = 90.0;
        bench.defense.acquire(bench.entities[0]);
        for _ in 0..5 {
            bench.tick();
        }
        let fired = bench
            .events
            .iter()
            .filter(|e| matches!(e, FlightEvent::Fired { .. }))
            .count();
        assert_eq!(fired, 5);
        assert!(bench.shots.is_empty());
    }

    #[test]
    fn test_leaving_range_drops_target() {
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        bench.defense.acquire(bench.entities[0]);
        bench.tick();
        assert_eq!(bench.defense.current, Some(bench.entities[0]));

        let far = bench.grid.embed(0.0, 20.0);
        bench.contacts.get_mut(&bench.entities[0]).unwrap().position = far;
        bench.tick();
        assert!(bench.defense.acquired.is_empty());
        assert_eq!(bench.defense.current, None);
        assert!(bench
            .events
            .iter()
            .any(|e| matches!(e, FlightEvent::TargetLost { .. })));
    }

    #[test]
    fn test_strategy_picks_target() {
        let at = [(0.0, 4.0, 50.0), (0.0, 2.0, 300.0), (0.0, 3.0, 10.0)];

        let mut nearest = Bench::new(EngagementStrategy::Nearest, &at);
        let mut lowest = Bench::new(EngagementStrategy::LowestAltitude, &at);
        let mut first = Bench::new(EngagementStrategy::FirstAcquired, &at);
        for bench in [&mut nearest, &mut lowest, &mut first] {
            for entity in bench.entities.clone() {
                bench.defense.acquire(entity);
            }
            bench.tick();
        }
        assert_eq!(nearest.defense.current, Some(nearest.entities[1]));
        assert_eq!(lowest.defense.current, Some(lowest.entities[2]));
        assert_eq!(first.defense.current, Some(first.entities[0]));
    }

    #[test]
    fn test_grounded_target_is_released() {
        let mut bench = Bench::new(EngagementStrategy::Nearest, &[(0.0, 2.0, 100.0)]);
        bench.defense.acquire(bench.entities[0]);
        bench.contacts.get_mut(&bench.entities[0]).unwrap().airborne = false;
        bench.tick();
        assert!(bench.defense.acquired.is_empty());
    }
}
