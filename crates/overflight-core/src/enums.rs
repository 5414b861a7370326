//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Vertical intent attached to a waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vertical {
    #[default]
    Ascend,
    Descend,
}

impl Vertical {
    /// +1.0 for climbing, -1.0 for descending.
    pub fn sign(self) -> f64 {
        match self {
            Vertical::Ascend => 1.0,
            Vertical::Descend => -1.0,
        }
    }
}

/// Lifecycle phase of a flight. Every phase except `Airborne` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    #[default]
    Airborne,
    /// Arrival action completed and requested destruction.
    Arrived,
    /// Converted into a caravan or settled entity at the destination.
    Converted,
    Crashed,
}

impl FlightPhase {
    pub fn is_airborne(self) -> bool {
        self == FlightPhase::Airborne
    }
}

/// Why a flight came down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashCause {
    FuelExhausted,
    ShotDown,
}

/// Result of invoking an arrival action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalOutcome {
    /// Keep flying (e.g. a strafing run with more path left).
    Continue,
    /// The action consumed the aircraft; destroy the flight.
    Destroy,
    /// The aircraft becomes a caravan / settled entity at the destination.
    Convert,
}

/// How an aircraft enters a local map on landing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandingMode {
    #[default]
    Edge,
    Center,
    Targeted,
}

/// Source of damage applied to a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageKind {
    /// Direct fire from a sweeping area defense.
    Flak,
    /// Guided projectile from a stationary defense.
    Projectile,
}

/// Target selection policy of an area defense when several targets are acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementStrategy {
    /// Closest target to the installation.
    #[default]
    Nearest,
    /// Lowest flying target (about to land or take off).
    LowestAltitude,
    /// Oldest acquisition first.
    FirstAcquired,
}

/// Kind of defense, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefenseKind {
    Area,
    Stationary,
}
