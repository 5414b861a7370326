//! Simulation engine for OVERFLIGHT.
//!
//! Owns the hecs ECS world holding flights and projectiles, the flight
//! registry that maps flights to the defenses that may engage them, and the
//! collaborator services. Runs the flight, defense and projectile systems at
//! a fixed tick and produces `FlightSnapshot`s.

pub mod arrival;
pub mod climb;
pub mod config;
pub mod defense;
pub mod engine;
pub mod error;
pub mod flight_path;
pub mod persistence;
pub mod reference;
pub mod registry;
pub mod rotation;
pub mod services;
pub mod systems;

pub use config::SimConfig;
pub use engine::{FlightPlan, SimulationEngine};
pub use overflight_core as core;
pub use overflight_world as world;
