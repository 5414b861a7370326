//! Defense data model: per-installation engagement state.
//!
//! Stored in the `FlightRegistry`, NOT as ECS entities. Targets are held as
//! weak `hecs::Entity` handles and resolved against a fresh contact list
//! every tick.

use std::collections::{BTreeSet, HashMap};

use glam::DVec3;

use overflight_core::components::{AreaDefenseProfile, DamageInfo, StationaryDefenseProfile};
use overflight_core::types::{wrap_degrees, FlightId, InstallationId};

use crate::rotation::Rotation;

/// What a defense can see of one flight this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub entity: hecs::Entity,
    pub flight: FlightId,
    pub position: DVec3,
    pub altitude: f64,
    pub airborne: bool,
}

pub type ContactMap = HashMap<hecs::Entity, Contact>;

/// Damage an area defense landed this tick, applied after all defenses ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub installation: InstallationId,
    pub target: hecs::Entity,
    pub flight: FlightId,
    pub damage: DamageInfo,
}

/// Projectile a stationary defense fired this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileLaunch {
    pub installation: InstallationId,
    pub target: hecs::Entity,
    pub flight: FlightId,
    pub origin: DVec3,
    /// Target position at the moment of firing.
    pub aim: DVec3,
    pub speed: f64,
    pub damage: f64,
}

/// Everything the defenses produced in one registry pass.
#[derive(Debug, Default)]
pub struct DefenseOutput {
    pub shots: Vec<Shot>,
    pub launches: Vec<ProjectileLaunch>,
}

/// Sweeping search-and-track defense with one current target.
#[derive(Debug, Clone)]
pub struct AreaDefense {
    pub installation: InstallationId,
    pub position: DVec3,
    pub profile: AreaDefenseProfile,
    /// Current aim of the search cone, degrees in [0, 360).
    pub sweep_angle: f64,
    /// +1 clockwise, -1 counter-clockwise.
    pub direction: f64,
    /// Acquired targets in acquisition order.
    pub acquired: Vec<hecs::Entity>,
    pub current: Option<hecs::Entity>,
    /// Ticks until the next shot is allowed.
    pub cooldown: u32,
}

impl AreaDefense {
    pub fn new(installation: InstallationId, position: DVec3, profile: AreaDefenseProfile) -> Self {
        Self {
            installation,
            position,
            profile,
            sweep_angle: wrap_degrees(profile.initial_angle_deg),
            direction: if profile.sweep_direction < 0 { -1.0 } else { 1.0 },
            acquired: Vec::new(),
            current: None,
            cooldown: 0,
        }
    }

    pub fn is_acquired(&self, entity: hecs::Entity) -> bool {
        self.acquired.contains(&entity)
    }

    pub fn acquire(&mut self, entity: hecs::Entity) -> bool {
        if self.is_acquired(entity) {
            return false;
        }
        self.acquired.push(entity);
        true
    }

    /// Drop every trace of `entity`. Returns whether it was acquired.
    pub fn forget(&mut self, entity: hecs::Entity) -> bool {
        if self.current == Some(entity) {
            self.current = None;
        }
        let before = self.acquired.len();
        self.acquired.retain(|e| *e != entity);
        before != self.acquired.len()
    }

    /// Installation profile changed but still qualifies: keep engagement state.
    pub fn refresh(&mut self, position: DVec3, profile: AreaDefenseProfile) {
        self.position = position;
        self.profile = profile;
    }
}

/// Fixed defense firing guided projectiles round-robin at every target in
/// range, one shot per fire interval.
#[derive(Debug, Clone)]
pub struct StationaryAreaDefense {
    pub installation: InstallationId,
    pub position: DVec3,
    pub profile: StationaryDefenseProfile,
    pub countdown: i32,
    pub rotation: Rotation<hecs::Entity>,
    /// Mirrors rotation membership.
    pub targets: BTreeSet<hecs::Entity>,
}

impl StationaryAreaDefense {
    pub fn new(
        installation: InstallationId,
        position: DVec3,
        profile: StationaryDefenseProfile,
    ) -> Self {
        Self {
            installation,
            position,
            profile,
            countdown: 0,
            rotation: Rotation::new(),
            targets: BTreeSet::new(),
        }
    }

    /// Ticks between shots, never less than one.
    pub fn interval(&self) -> i32 {
        i32::try_from(self.profile.fire_interval_ticks.max(1)).unwrap_or(i32::MAX)
    }

    pub fn add_target(&mut self, entity: hecs::Entity) -> bool {
        let added = self.targets.insert(entity);
        self.rotation.add(entity);
        added
    }

    /// Remove `entity` from both rotation and target set.
    pub fn forget(&mut self, entity: hecs::Entity) -> bool {
        let in_set = self.targets.remove(&entity);
        let in_rotation = self.rotation.remove(&entity);
        in_set || in_rotation
    }

    pub fn refresh(&mut self, position: DVec3, profile: StationaryDefenseProfile) {
        self.position = position;
        self.profile = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overflight_core::enums::EngagementStrategy;

    fn area_profile() -> AreaDefenseProfile {
        AreaDefenseProfile {
            max_distance: 10.0,
            sweep_arc_deg: 30.0,
            sweep_direction: -1,
            initial_angle_deg: 370.0,
            strategy: EngagementStrategy::Nearest,
            damage: 1.0,
            hit_chance: 1.0,
            refire_ticks: 0,
        }
    }

    fn entities(n: usize) -> Vec<hecs::Entity> {
        let mut world = hecs::World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    #[test]
    fn test_area_defense_initial_state() {
        let d = AreaDefense::new(InstallationId(1), DVec3::X, area_profile());
        assert!((d.sweep_angle - 10.0).abs() < 1e-9, "angle wraps into [0, 360)");
        assert_eq!(d.direction, -1.0);
        assert!(d.current.is_none());
    }

    #[test]
    fn test_area_forget_clears_current() {
        let e = entities(2);
        let mut d = AreaDefense::new(InstallationId(1), DVec3::X, area_profile());
        assert!(d.acquire(e[0]));
        assert!(!d.acquire(e[0]), "acquiring twice is a no-op");
        d.acquire(e[1]);
        d.current = Some(e[0]);

        assert!(d.forget(e[0]));
        assert_eq!(d.current, None);
        assert_eq!(d.acquired, vec![e[1]]);
        assert!(!d.forget(e[0]));
    }

    #[test]
    fn test_stationary_membership_moves_together() {
        let e = entities(3);
        let profile = StationaryDefenseProfile {
            max_range: 5.0,
            fire_interval_ticks: 0,
            damage: 1.0,
            projectile_speed: 1.0,
        };
        let mut d = StationaryAreaDefense::new(InstallationId(2), DVec3::Y, profile);
        assert_eq!(d.interval(), 1, "zero interval is treated as one tick");
        for entity in &e {
            d.add_target(*entity);
        }
        assert!(d.forget(e[1]));
        assert_eq!(d.targets.len(), 2);
        assert_eq!(d.rotation.items(), &[e[0], e[2]]);
        assert!(!d.forget(e[1]));
    }
}
