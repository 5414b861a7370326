//! Guided projectiles fired by stationary defenses.

use glam::DVec3;
use hecs::{Entity, World};

use overflight_core::components::{DamageInfo, FlightKinematics};
use overflight_core::enums::DamageKind;
use overflight_core::types::{FlightId, InstallationId};
use overflight_world::WorldGrid;

use crate::config::SimConfig;
use crate::defense::{ProjectileLaunch, Shot};
use crate::flight_path::FlightPath;
use crate::systems::flight::current_position;

/// ECS component of an in-flight projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub source: InstallationId,
    pub target: Entity,
    pub flight: FlightId,
    pub position: DVec3,
    /// World units per tick.
    pub speed: f64,
    pub damage: f64,
    pub ticks_left: u32,
}

/// Spawn one projectile per launch, at the installation.
pub fn spawn(world: &mut World, launches: &[ProjectileLaunch], config: &SimConfig) {
    for launch in launches {
        world.spawn((Projectile {
            source: launch.installation,
            target: launch.target,
            flight: launch.flight,
            position: launch.origin,
            speed: launch.speed,
            damage: launch.damage,
            ticks_left: config.projectile_lifetime_ticks,
        },));
    }
}

/// Steer every projectile toward its target's current position. Projectiles
/// that reach their target become hits; those whose target is gone or whose
/// lifetime ran out are queued for despawn.
pub fn run(world: &mut World, grid: &dyn WorldGrid, despawn_buffer: &mut Vec<Entity>) -> Vec<Shot> {
    despawn_buffer.clear();
    let mut hits = Vec::new();

    let targets: Vec<(Entity, Option<DVec3>)> = world
        .query::<&Projectile>()
        .iter()
        .map(|(entity, projectile)| (entity, target_position(world, projectile.target, grid)))
        .collect();

    for (entity, target) in targets {
        let Ok(projectile) = world.query_one_mut::<&mut Projectile>(entity) else {
            continue;
        };
        let Some(target) = target else {
            despawn_buffer.push(entity);
            continue;
        };

        let to_target = target - projectile.position;
        let distance = to_target.length();
        if distance <= projectile.speed {
            projectile.position = target;
            hits.push(Shot {
                installation: projectile.source,
                target: projectile.target,
                flight: projectile.flight,
                damage: DamageInfo {
                    amount: projectile.damage,
                    kind: DamageKind::Projectile,
                },
            });
            despawn_buffer.push(entity);
            continue;
        }

        projectile.position += to_target / distance * projectile.speed;
        projectile.ticks_left = projectile.ticks_left.saturating_sub(1);
        if projectile.ticks_left == 0 || !projectile.position.is_finite() {
            despawn_buffer.push(entity);
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
    hits
}

/// Current position of an airborne flight entity.
fn target_position(world: &World, target: Entity, grid: &dyn WorldGrid) -> Option<DVec3> {
    let kin = world.get::<&FlightKinematics>(target).ok()?;
    if !kin.phase.is_airborne() {
        return None;
    }
    let path = world.get::<&FlightPath>(target).ok()?;
    Some(current_position(&kin, &path, grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use overflight_core::enums::FlightPhase;
    use overflight_core::types::LocationId;
    use overflight_world::SphereGrid;

    fn spawn_target(world: &mut World, position: DVec3, phase: FlightPhase) -> Entity {
        world.spawn((
            FlightKinematics {
                origin: position,
                last_location: LocationId(0),
                fraction: 0.0,
                altitude: 100.0,
                speed_pct_per_tick: 0.0,
                speed: 1.0,
                recon: false,
                phase,
            },
            FlightPath::new(),
        ))
    }

    fn launch(target: Entity, origin: DVec3, speed: f64) -> ProjectileLaunch {
        ProjectileLaunch {
            installation: InstallationId(4),
            target,
            flight: FlightId(1),
            origin,
            aim: DVec3::ZERO,
            speed,
            damage: 3.0,
        }
    }

    #[test]
    fn test_projectile_closes_and_hits() {
        let grid = SphereGrid::new(100.0, 1.0);
        let mut world = World::new();
        let target = spawn_target(&mut world, DVec3::new(100.0, 0.0, 0.0), FlightPhase::Airborne);
        spawn(
            &mut world,
            &[launch(target, DVec3::new(100.0, 5.0, 0.0), 2.0)],
            &SimConfig::default(),
        );
        let mut buffer = Vec::new();

        assert!(run(&mut world, &grid, &mut buffer).is_empty());
        assert!(run(&mut world, &grid, &mut buffer).is_empty());
        let hits = run(&mut world, &grid, &mut buffer);
        assert_eq!(hits.len(), 1, "5 units at 2 per tick: hit on the third tick");
        assert_eq!(hits[0].installation, InstallationId(4));
        assert_eq!(hits[0].damage.kind, DamageKind::Projectile);
        assert_eq!(world.query::<&Projectile>().iter().count(), 0);
    }

    #[test]
    fn test_projectile_dropped_when_target_grounded() {
        let grid = SphereGrid::new(100.0, 1.0);
        let mut world = World::new();
        let target = spawn_target(&mut world, DVec3::new(100.0, 0.0, 0.0), FlightPhase::Crashed);
        spawn(
            &mut world,
            &[launch(target, DVec3::new(100.0, 50.0, 0.0), 1.0)],
            &SimConfig::default(),
        );
        let mut buffer = Vec::new();
        assert!(run(&mut world, &grid, &mut buffer).is_empty());
        assert_eq!(world.query::<&Projectile>().iter().count(), 0);
    }

    #[test]
    fn test_projectile_expires() {
        let grid = SphereGrid::new(100.0, 1.0);
        let mut world = World::new();
        let target = spawn_target(&mut world, DVec3::new(100.0, 0.0, 0.0), FlightPhase::Airborne);
        let config = SimConfig {
            projectile_lifetime_ticks: 3,
            ..SimConfig::default()
        };
        spawn(
            &mut world,
            &[launch(target, DVec3::new(100.0, 50.0, 0.0), 1.0)],
            &config,
        );
        let mut buffer = Vec::new();
        for _ in 0..2 {
            run(&mut world, &grid, &mut buffer);
            assert_eq!(world.query::<&Projectile>().iter().count(), 1);
        }
        run(&mut world, &grid, &mut buffer);
        assert_eq!(world.query::<&Projectile>().iter().count(), 0);
    }
}
