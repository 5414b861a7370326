//! Cleanup system: removes flights that have ended.

use hecs::{Entity, World};

use overflight_core::components::FlightKinematics;

/// Despawn every flight entity that is no longer airborne.
/// `despawn_buffer` is reused across ticks.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>) {
    despawn_buffer.clear();

    for (entity, kin) in world.query_mut::<&FlightKinematics>() {
        if !kin.phase.is_airborne() {
            despawn_buffer.push(entity);
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use overflight_core::enums::FlightPhase;
    use overflight_core::types::LocationId;

    fn kinematics(phase: FlightPhase) -> FlightKinematics {
        FlightKinematics {
            origin: DVec3::X,
            last_location: LocationId(0),
            fraction: 0.0,
            altitude: 0.0,
            speed_pct_per_tick: 0.1,
            speed: 1.0,
            recon: false,
            phase,
        }
    }

    #[test]
    fn test_cleanup_keeps_only_airborne() {
        let mut world = World::new();
        let flying = world.spawn((kinematics(FlightPhase::Airborne),));
        let crashed = world.spawn((kinematics(FlightPhase::Crashed),));
        let converted = world.spawn((kinematics(FlightPhase::Converted),));
        let mut buffer = Vec::new();

        run(&mut world, &mut buffer);
        assert!(world.contains(flying));
        assert!(!world.contains(crashed));
        assert!(!world.contains(converted));
    }
}
