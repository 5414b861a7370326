//! Stationary defense system: rate-limited round-robin fire.

use hecs::Entity;
use log::debug;

use overflight_core::enums::DamageKind;
use overflight_core::events::FlightEvent;
use overflight_world::WorldGrid;

use crate::defense::{Contact, ContactMap, ProjectileLaunch, StationaryAreaDefense};
use crate::error::TickFault;

/// Run one stationary defense for one tick against its registry candidates.
pub fn run(
    defense: &mut StationaryAreaDefense,
    candidates: &[Entity],
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
    launches: &mut Vec<ProjectileLaunch>,
    events: &mut Vec<FlightEvent>,
) -> Result<(), TickFault> {
    schedule(defense, candidates, contacts, grid);
    if defense.targets.is_empty() {
        return Ok(());
    }

    defense.countdown = defense.countdown.saturating_sub(1);
    if defense.countdown >= 0 {
        return Ok(());
    }
    defense.countdown = defense.interval() - 1;

    let Some(target) = defense.rotation.next() else {
        return Ok(());
    };
    let Some(contact) = contacts.get(&target) else {
        defense.forget(target);
        return Ok(());
    };
    if !contact.position.is_finite() {
        return Err(TickFault::NonFinite {
            what: "target position",
            installation: Some(defense.installation),
        });
    }

    debug!(
        "{:?} launched at flight {:?}",
        defense.installation, contact.flight
    );
    launches.push(ProjectileLaunch {
        installation: defense.installation,
        target,
        flight: contact.flight,
        origin: defense.position,
        aim: contact.position,
        speed: defense.profile.projectile_speed,
        damage: defense.profile.damage,
    });
    events.push(FlightEvent::Fired {
        installation: defense.installation,
        flight: contact.flight,
        kind: DamageKind::Projectile,
    });

    if !engageable(defense, contact, grid) {
        defense.forget(target);
    }
    Ok(())
}

fn engageable(defense: &StationaryAreaDefense, contact: &Contact, grid: &dyn WorldGrid) -> bool {
    contact.airborne && grid.distance(defense.position, contact.position) <= defense.profile.max_range
}

/// Scheduling pass: rotation and target set gain engageable candidates and
/// lose everything else, together.
fn schedule(
    defense: &mut StationaryAreaDefense,
    candidates: &[Entity],
    contacts: &ContactMap,
    grid: &dyn WorldGrid,
) {
    for entity in candidates {
        let keep = contacts
            .get(entity)
            .is_some_and(|c| engageable(defense, c, grid));
        if keep {
            defense.add_target(*entity);
        } else {
            defense.forget(*entity);
        }
    }

    defense.rotation.retain(|e| candidates.contains(e));
    defense.targets.retain(|e| candidates.contains(e));
}
