//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are free functions over `&mut World` (or `&World` for read-only)
//! and the registry-owned defense state. They do not own state.

pub mod area_defense;
pub mod cleanup;
pub mod flight;
pub mod projectile;
pub mod snapshot;
pub mod stationary_defense;
