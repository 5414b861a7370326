//! World grid for OVERFLIGHT.
//!
//! The `WorldGrid` trait is the geometry collaborator the simulation consumes;
//! `SphereGrid` is a lat/lon lattice on a sphere used by tests and the runner.

pub use overflight_core as core;

pub mod grid;
pub mod sphere;

pub use grid::WorldGrid;
pub use sphere::SphereGrid;
