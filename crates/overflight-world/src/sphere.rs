//! Reference world grid: a regular latitude/longitude lattice on a sphere.
//!
//! Location `row * cols + col` sits at the centre of its lat/lon cell.
//! x points at (0°N, 0°E), y at (0°N, 90°E), z at the north pole.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use overflight_core::types::{wrap_degrees, LocationId};

use crate::grid::WorldGrid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphereGrid {
    pub radius: f64,
    /// Cell size in degrees (both latitude and longitude).
    pub cell_deg: f64,
    rows: u32,
    cols: u32,
}

impl SphereGrid {
    /// Create a lattice with `cell_deg` cells. `cell_deg` must divide 180.
    pub fn new(radius: f64, cell_deg: f64) -> Self {
        let rows = (180.0 / cell_deg).round().max(1.0) as u32;
        let cols = (360.0 / cell_deg).round().max(1.0) as u32;
        Self {
            radius,
            cell_deg,
            rows,
            cols,
        }
    }

    pub fn location_count(&self) -> u32 {
        self.rows * self.cols
    }

    /// Location whose cell contains (lat, lon) in degrees.
    pub fn location_at(&self, lat: f64, lon: f64) -> LocationId {
        let row = (((lat + 90.0) / self.cell_deg).floor() as i64).clamp(0, self.rows as i64 - 1);
        let col = ((wrap_degrees(lon + 180.0) / self.cell_deg).floor() as i64)
            .clamp(0, self.cols as i64 - 1);
        LocationId(row as u32 * self.cols + col as u32)
    }

    /// Cell-centre latitude and longitude of a location, in degrees.
    pub fn lat_lon_of(&self, location: LocationId) -> Option<(f64, f64)> {
        if location.0 >= self.location_count() {
            return None;
        }
        let row = location.0 / self.cols;
        let col = location.0 % self.cols;
        let lat = -90.0 + (row as f64 + 0.5) * self.cell_deg;
        let lon = -180.0 + (col as f64 + 0.5) * self.cell_deg;
        Some((lat, lon))
    }

    /// Embed (lat, lon) in degrees on the sphere.
    pub fn embed(&self, lat: f64, lon: f64) -> DVec3 {
        let (lat, lon) = (lat.to_radians(), lon.to_radians());
        DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()) * self.radius
    }

    fn to_lat_lon(position: DVec3) -> (f64, f64) {
        let dir = position.normalize_or_zero();
        let lat = dir.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = dir.y.atan2(dir.x).to_degrees();
        (lat, lon)
    }
}

impl WorldGrid for SphereGrid {
    fn position_of(&self, location: LocationId) -> Option<DVec3> {
        self.lat_lon_of(location)
            .map(|(lat, lon)| self.embed(lat, lon))
    }

    fn distance(&self, a: DVec3, b: DVec3) -> f64 {
        let angle = a.cross(b).length().atan2(a.dot(b));
        angle * self.radius
    }

    fn nearest_location(&self, position: DVec3) -> Option<LocationId> {
        if position.length_squared() == 0.0 || !position.is_finite() {
            return None;
        }
        let (lat, lon) = Self::to_lat_lon(position);
        Some(self.location_at(lat, lon))
    }

    fn bearing_deg(&self, from: DVec3, to: DVec3) -> f64 {
        let (lat1, lon1) = Self::to_lat_lon(from);
        let (lat2, lon2) = Self::to_lat_lon(to);
        let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
        let d_lambda = (lon2 - lon1).to_radians();
        let y = d_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
        wrap_degrees(y.atan2(x).to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_roundtrip() {
        let grid = SphereGrid::new(100.0, 1.0);
        let loc = grid.location_at(26.5, 56.5);
        let (lat, lon) = grid.lat_lon_of(loc).unwrap();
        assert!((lat - 26.5).abs() < 1e-9, "lat roundtrip: {lat}");
        assert!((lon - 56.5).abs() < 1e-9, "lon roundtrip: {lon}");

        let pos = grid.position_of(loc).unwrap();
        assert_eq!(grid.nearest_location(pos), Some(loc));
    }

    #[test]
    fn test_invalid_location() {
        let grid = SphereGrid::new(100.0, 10.0);
        assert_eq!(grid.location_count(), 18 * 36);
        assert!(grid.position_of(LocationId(18 * 36)).is_none());
        assert!(!grid.is_valid(LocationId(u32::MAX)));
        assert!(grid.is_valid(LocationId(0)));
    }

    #[test]
    fn test_great_circle_distance() {
        let grid = SphereGrid::new(100.0, 1.0);
        let a = grid.embed(0.0, 0.0);
        let b = grid.embed(0.0, 90.0);
        let expected = 100.0 * std::f64::consts::FRAC_PI_2;
        assert!(
            (grid.distance(a, b) - expected).abs() < 1e-9,
            "quarter circle: {}",
            grid.distance(a, b)
        );
        assert!(grid.distance(a, a).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let grid = SphereGrid::new(100.0, 1.0);
        let origin = grid.embed(0.0, 0.0);
        let north = grid.embed(1.0, 0.0);
        let east = grid.embed(0.0, 1.0);
        let south = grid.embed(-1.0, 0.0);
        let west = grid.embed(0.0, -1.0);

        assert!(grid.bearing_deg(origin, north).abs() < 1e-9);
        assert!((grid.bearing_deg(origin, east) - 90.0).abs() < 1e-9);
        assert!((grid.bearing_deg(origin, south) - 180.0).abs() < 1e-9);
        assert!((grid.bearing_deg(origin, west) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_stays_on_sphere() {
        let grid = SphereGrid::new(100.0, 1.0);
        let a = grid.embed(0.0, 0.0);
        let b = grid.embed(0.0, 60.0);
        let mid = grid.interpolate(a, b, 0.5);
        assert!((mid.length() - 100.0).abs() < 1e-9);
        assert!((grid.distance(a, mid) - grid.distance(mid, b)).abs() < 1e-9);
        assert!(grid.interpolate(a, b, 0.0).distance(a) < 1e-9);
    }
}
