//! Core types and definitions for the OVERFLIGHT simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! identifiers, waypoints, components, events, snapshot views and constants.
//! It has no dependency on the ECS or any runtime framework.

pub mod components;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
