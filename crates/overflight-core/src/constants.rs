//! Simulation constants and tuning defaults.
//!
//! `SimConfig` takes its defaults from here; the values below are what the
//! engine runs with when a scenario does not override them.

// --- Horizontal movement ---

/// World-distance units covered per tick at flight speed 1.0.
pub const BASE_PROGRESS_PER_TICK: f64 = 0.05;

/// Lower clamp for the flight speed statistic.
pub const MIN_FLIGHT_SPEED: f64 = 0.25;

/// Upper clamp for the flight speed statistic.
pub const MAX_FLIGHT_SPEED: f64 = 8.0;

/// Progress per tick along a zero-length leg (holding loop over a location).
pub const HOLDING_PROGRESS_PER_TICK: f64 = 0.05;

/// Tolerance when comparing the interpolation fraction against 1.0.
pub const PROGRESS_EPSILON: f64 = 1e-9;

/// Legs shorter than this (world units) are treated as zero-length.
pub const MIN_LEG_DISTANCE: f64 = 1e-9;

/// Speed change that triggers candidate re-sampling.
pub const SPEED_RESAMPLE_EPSILON: f64 = 1e-6;

/// Upper bound on registry samples taken along one flight path.
pub const MAX_PATH_SAMPLES: usize = 100_000;

// --- Vertical movement ---

/// Climb profile breakpoints: (altitude / max altitude, climb-rate multiplier).
/// Slow at takeoff, full rate in cruise, tapering near the ceiling.
pub const CLIMB_PROFILE: [(f64, f64); 4] = [(0.0, 0.65), (0.05, 1.0), (0.95, 1.0), (1.0, 0.15)];

// --- Fuel ---

/// World fuel efficiency multiplier (divides per-tick consumption).
pub const FUEL_EFFICIENCY_MULTIPLIER: f64 = 1.0;

// --- Area defense ---

/// Search sweep rate while idle (degrees per tick).
pub const SWEEP_RATE_DEG: f64 = 0.35;

/// Slew rate once a target is locked (degrees per tick).
pub const TRACKING_RATE_DEG: f64 = 2.0;

/// Angular error under which the defense snaps onto the bearing and fires.
pub const TRACKING_TOLERANCE_DEG: f64 = 2.0;

// --- Projectiles ---

/// Ticks a guided projectile survives before self-destructing.
pub const PROJECTILE_LIFETIME_TICKS: u32 = 600;

// --- Factions ---

/// Faction whose enemies field the defenses this core simulates.
pub const PLAYER_FACTION: u32 = 0;

/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 42;
