//! overflight-run: headless scenario runner for the flight simulation.
//!
//! Usage:
//!   overflight-run run --scenario demos/strait_crossing.json --ticks 600
//!   overflight-run resume --scenario demos/strait_crossing.json --state save.json

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;

use env_logger::{Builder, Env};
use log::{info, warn, LevelFilter};
use serde::{Deserialize, Serialize};

use overflight_core::components::{DefenseProfile, FlightStats, Installation, Vehicle};
use overflight_core::enums::Vertical;
use overflight_core::events::FlightEvent;
use overflight_core::state::FlightView;
use overflight_core::types::{FactionId, InstallationId, LocationId, VehicleId, Waypoint};
use overflight_sim::arrival::ArrivalAction;
use overflight_sim::persistence::SavedState;
use overflight_sim::reference::ReferenceServices;
use overflight_sim::{FlightPlan, SimConfig, SimulationEngine};
use overflight_world::SphereGrid;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    init_logging(has_flag(&args[2..], "--verbose"));

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "resume" => cmd_resume(&args[2..]),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "overflight-run: OVERFLIGHT headless scenario runner\n\
         \n\
         Commands:\n\
         \n\
         run       Launch every flight in a scenario and tick the engine\n\
         \n\
           --scenario <path>  Scenario JSON file\n\
           --ticks <N>        Ticks to run (default: scenario value)\n\
           --save <path>      Write the final engine state here\n\
           --events           Print every event as one JSON line\n\
           --verbose          Debug logging\n\
         \n\
         resume    Restore a saved state against a scenario's world and continue\n\
         \n\
           --scenario <path>  Scenario JSON file (flights are ignored)\n\
           --state <path>     Saved state written by `run --save`\n\
           --ticks <N>        Ticks to run (default: scenario value)\n\
           --save <path>      Write the final engine state here\n\
         \n\
         Examples:\n\
         \n\
           overflight-run run --scenario demos/strait_crossing.json --save out/state.json\n\
           overflight-run resume --scenario demos/strait_crossing.json --state out/state.json --ticks 200\n"
    );
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().default_filter_or(level.to_string());
    let _ = Builder::from_env(env).try_init();
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    for i in 0..args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(&args[i + 1]);
        }
    }
    None
}

fn parse_path(args: &[String], flag: &str) -> Option<PathBuf> {
    parse_value(args, flag).map(PathBuf::from)
}

fn parse_ticks(args: &[String], default: u64) -> u64 {
    parse_value(args, "--ticks")
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn require_path(args: &[String], flag: &str) -> PathBuf {
    match parse_path(args, flag) {
        Some(p) => p,
        None => {
            eprintln!("Error: {flag} <path> is required");
            process::exit(1);
        }
    }
}

// --- Scenario format ---

/// A scenario file. Positions are given as `[lat, lon]` in degrees and
/// snapped to the grid cell containing them.
#[derive(Debug, Clone, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: SimConfig,
    grid: GridSpec,
    #[serde(default = "default_ticks")]
    ticks: u64,
    stats: FlightStats,
    #[serde(default = "default_max_hull")]
    max_hull: f64,
    #[serde(default)]
    hostile: Vec<(FactionId, FactionId)>,
    #[serde(default)]
    installations: Vec<ScenarioInstallation>,
    #[serde(default)]
    flights: Vec<ScenarioFlight>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GridSpec {
    radius: f64,
    cell_deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ScenarioInstallation {
    id: InstallationId,
    at: [f64; 2],
    faction: FactionId,
    #[serde(default)]
    defense: Option<DefenseProfile>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScenarioFlight {
    vehicle: Vehicle,
    #[serde(default)]
    stats: Option<FlightStats>,
    #[serde(default)]
    fuel: Option<FuelSpec>,
    from: [f64; 2],
    route: Vec<ScenarioWaypoint>,
    #[serde(default)]
    arrival: Option<ArrivalAction>,
    #[serde(default)]
    recon: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ScenarioWaypoint {
    at: [f64; 2],
    #[serde(default)]
    vertical: Vertical,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct FuelSpec {
    level: f64,
    per_tick: f64,
}

fn default_ticks() -> u64 {
    600
}

fn default_max_hull() -> f64 {
    10.0
}

impl Scenario {
    fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("invalid scenario {}: {e}", path.display()))
    }

    /// Collaborators for this scenario's world: grid, stats, relations and
    /// installations. Flights are not launched.
    fn services(&self) -> ReferenceServices {
        let grid = SphereGrid::new(self.grid.radius, self.grid.cell_deg);
        let refs = ReferenceServices::new(grid, self.stats, self.max_hull);
        for (a, b) in &self.hostile {
            refs.relations.set_hostile(*a, *b, true);
        }
        for inst in &self.installations {
            refs.installations.add(Installation {
                id: inst.id,
                location: locate(&refs.grid, inst.at),
                faction: inst.faction,
                defense: inst.defense,
            });
        }
        for flight in &self.flights {
            if let Some(stats) = flight.stats {
                refs.stats.set(flight.vehicle.id, stats);
            }
            if let Some(fuel) = flight.fuel {
                refs.fuel.fill(flight.vehicle.id, fuel.level, fuel.per_tick);
            }
        }
        refs
    }
}

impl ScenarioFlight {
    fn plan(&self, grid: &SphereGrid) -> FlightPlan {
        FlightPlan {
            origin: locate(grid, self.from),
            waypoints: self
                .route
                .iter()
                .map(|w| Waypoint::new(locate(grid, w.at), w.vertical))
                .collect(),
            arrival: self.arrival.clone(),
            recon: self.recon,
        }
    }
}

fn locate(grid: &SphereGrid, [lat, lon]: [f64; 2]) -> LocationId {
    grid.location_at(lat, lon)
}

// --- Run summary ---

#[derive(Debug, Default, Serialize)]
struct Summary {
    ticks: u64,
    launched: usize,
    waypoints_reached: usize,
    holding_loops: usize,
    arrived: usize,
    crashed: usize,
    shots_fired: usize,
    hits: usize,
    faults: usize,
    downed: Vec<DownedSummary>,
    arrivals: Vec<ArrivalSummary>,
    airborne: Vec<FlightView>,
}

#[derive(Debug, Serialize)]
struct DownedSummary {
    vehicle: String,
    location: Option<LocationId>,
    attacker: Option<InstallationId>,
}

#[derive(Debug, Serialize)]
struct ArrivalSummary {
    vehicle: String,
    action: &'static str,
    destination: LocationId,
}

impl Summary {
    fn count(&mut self, event: &FlightEvent) {
        match event {
            FlightEvent::Launched { .. } => self.launched += 1,
            FlightEvent::WaypointReached { .. } => self.waypoints_reached += 1,
            FlightEvent::HoldingLoop { .. } => self.holding_loops += 1,
            FlightEvent::Arrived { .. } => self.arrived += 1,
            FlightEvent::Crashed { .. } => self.crashed += 1,
            FlightEvent::Fired { .. } => self.shots_fired += 1,
            FlightEvent::Hit { .. } => self.hits += 1,
            FlightEvent::TickFault { .. } => self.faults += 1,
            FlightEvent::TargetAcquired { .. } | FlightEvent::TargetLost { .. } => {}
        }
    }
}

// --- Commands ---

fn cmd_run(args: &[String]) {
    let scenario_path = require_path(args, "--scenario");
    let scenario = load_or_exit(&scenario_path);
    let refs = scenario.services();

    let mut engine = match SimulationEngine::new(scenario.config.clone(), refs.services()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    for flight in &scenario.flights {
        let plan = flight.plan(&refs.grid);
        if let Err(vehicle) = engine.launch(flight.vehicle.clone(), plan) {
            warn!("{} did not take off", vehicle.label);
        }
    }

    let ticks = parse_ticks(args, scenario.ticks);
    finish(&mut engine, &scenario, &refs, ticks, args);
}

fn cmd_resume(args: &[String]) {
    let scenario_path = require_path(args, "--scenario");
    let state_path = require_path(args, "--state");
    let scenario = load_or_exit(&scenario_path);
    let refs = scenario.services();

    let saved = match SavedState::load_from_file(&state_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading state: {e}");
            process::exit(1);
        }
    };
    let mut engine = match SimulationEngine::restore(scenario.config.clone(), refs.services(), saved) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error restoring state: {e}");
            process::exit(1);
        }
    };

    let ticks = parse_ticks(args, scenario.ticks);
    finish(&mut engine, &scenario, &refs, ticks, args);
}

fn load_or_exit(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Tick `ticks` times, optionally save, and print the summary to stdout.
fn finish(
    engine: &mut SimulationEngine,
    scenario: &Scenario,
    refs: &ReferenceServices,
    ticks: u64,
    args: &[String],
) {
    let labels: HashMap<VehicleId, String> = scenario
        .flights
        .iter()
        .map(|f| (f.vehicle.id, f.vehicle.label.clone()))
        .collect();
    let print_events = has_flag(args, "--events");
    let mut summary = Summary::default();
    let mut airborne = Vec::new();

    info!("running {ticks} ticks from tick {}", engine.time().tick);
    for _ in 0..ticks {
        let snapshot = engine.tick();
        for event in &snapshot.events {
            summary.count(event);
            if print_events {
                if let Ok(line) = serde_json::to_string(&(snapshot.time.tick, event)) {
                    println!("{line}");
                }
            }
        }
        airborne = snapshot.flights;
    }
    summary.ticks = engine.time().tick;
    summary.airborne = airborne;

    summary.downed = refs
        .damage
        .downed()
        .into_iter()
        .map(|d| DownedSummary {
            vehicle: d.vehicle.label,
            location: d.location,
            attacker: d.attacker,
        })
        .collect();
    summary.arrivals = refs
        .arrivals
        .invocations()
        .into_iter()
        .map(|a| ArrivalSummary {
            vehicle: labels
                .get(&a.vehicle)
                .cloned()
                .unwrap_or_else(|| format!("{:?}", a.vehicle)),
            action: a.action,
            destination: a.destination,
        })
        .collect();

    if let Some(path) = parse_path(args, "--save") {
        match engine.export_state().save_to_file(&path) {
            Ok(()) => info!("state saved to {}", path.display()),
            Err(e) => {
                eprintln!("Error saving state: {e}");
                process::exit(1);
            }
        }
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error writing summary: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../../demos/strait_crossing.json");

    #[test]
    fn test_demo_scenario_parses() {
        let scenario: Scenario = serde_json::from_str(DEMO).unwrap();
        assert_eq!(scenario.flights.len(), 3);
        assert_eq!(scenario.installations.len(), 3);
        assert_eq!(scenario.config.seed, 7);
        assert_eq!(
            scenario.config.sweep_rate_deg,
            SimConfig::default().sweep_rate_deg,
            "unlisted config fields keep their defaults"
        );
        assert_eq!(scenario.flights[0].route[1].vertical, Vertical::Descend);
        assert_eq!(scenario.flights[1].route[0].vertical, Vertical::Ascend);
    }

    #[test]
    fn test_demo_flights_take_off() {
        let scenario: Scenario = serde_json::from_str(DEMO).unwrap();
        let refs = scenario.services();
        let mut engine = SimulationEngine::new(scenario.config.clone(), refs.services()).unwrap();
        for flight in &scenario.flights {
            assert!(engine
                .launch(flight.vehicle.clone(), flight.plan(&refs.grid))
                .is_ok());
        }
        let snapshot = engine.tick();
        assert_eq!(snapshot.flights.len(), 3);
        assert_eq!(engine.registry().sites().len(), 2, "friendly outpost has no defense");
    }

    #[test]
    fn test_parse_value_reads_following_argument() {
        let args: Vec<String> = ["--ticks", "25", "--events"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_ticks(&args, 600), 25);
        assert!(has_flag(&args, "--events"));
        assert_eq!(parse_path(&args, "--save"), None);
    }
}
