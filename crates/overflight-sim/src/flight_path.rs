//! Ordered waypoint queue owned by one flight.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use overflight_core::types::{LocationId, Waypoint};
use overflight_world::WorldGrid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPath {
    waypoints: VecDeque<Waypoint>,
}

impl FlightPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole path. Empty lists and lists naming any location
    /// off the grid are ignored; returns whether the path was accepted.
    pub fn replace(&mut self, waypoints: Vec<Waypoint>, grid: &dyn WorldGrid) -> bool {
        if waypoints.is_empty() || !waypoints.iter().all(|w| grid.is_valid(w.destination)) {
            return false;
        }
        self.waypoints = waypoints.into();
        true
    }

    /// Drop the reached waypoint. Returns whether any waypoints remain.
    pub fn pop_front(&mut self) -> bool {
        self.waypoints.pop_front();
        !self.waypoints.is_empty()
    }

    /// Append a holding loop over `location`.
    pub fn push_holding_loop(&mut self, location: LocationId, grid: &dyn WorldGrid) -> bool {
        if !grid.is_valid(location) {
            return false;
        }
        self.waypoints.push_back(Waypoint::holding_loop(location));
        true
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn front(&self) -> Option<&Waypoint> {
        self.waypoints.front()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.back()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overflight_world::SphereGrid;

    fn grid() -> SphereGrid {
        SphereGrid::new(100.0, 10.0)
    }

    #[test]
    fn test_replace_rejects_empty_and_invalid() {
        let grid = grid();
        let mut path = FlightPath::new();
        assert!(path.replace(vec![Waypoint::ascend(LocationId(1))], &grid));

        assert!(!path.replace(Vec::new(), &grid));
        assert!(!path.replace(
            vec![
                Waypoint::ascend(LocationId(2)),
                Waypoint::descend(LocationId(u32::MAX)),
            ],
            &grid
        ));
        // Rejected requests leave the previous path untouched.
        assert_eq!(path.len(), 1);
        assert_eq!(path.front().unwrap().destination, LocationId(1));
    }

    #[test]
    fn test_pop_front_reports_remaining() {
        let grid = grid();
        let mut path = FlightPath::new();
        path.replace(
            vec![
                Waypoint::ascend(LocationId(1)),
                Waypoint::descend(LocationId(2)),
            ],
            &grid,
        );
        assert!(path.pop_front());
        assert_eq!(path.front().unwrap().destination, LocationId(2));
        assert!(!path.pop_front());
        assert!(!path.pop_front(), "popping an empty path stays empty");
    }

    #[test]
    fn test_holding_loop_appends() {
        let grid = grid();
        let mut path = FlightPath::new();
        assert!(path.push_holding_loop(LocationId(5), &grid));
        assert!(!path.push_holding_loop(LocationId(u32::MAX), &grid));
        assert_eq!(path.len(), 1);
        assert!(path.last().unwrap().holding);

        path.clear();
        assert!(path.is_empty());
    }
}
