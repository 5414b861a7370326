//! Geometry services consumed by the flight and defense systems.

use glam::DVec3;

use overflight_core::types::LocationId;

/// World-grid collaborator: location embedding, spherical distance and bearing.
pub trait WorldGrid {
    /// Embedded 3D position of a location, or `None` for an invalid id.
    fn position_of(&self, location: LocationId) -> Option<DVec3>;

    /// Great-circle distance between two embedded positions.
    fn distance(&self, a: DVec3, b: DVec3) -> f64;

    /// Nearest valid location to an embedded position.
    fn nearest_location(&self, position: DVec3) -> Option<LocationId>;

    /// Bearing in degrees [0, 360) from `from` toward `to`, 0 = north, clockwise.
    fn bearing_deg(&self, from: DVec3, to: DVec3) -> f64;

    fn is_valid(&self, location: LocationId) -> bool {
        self.position_of(location).is_some()
    }

    /// Point a fraction `t` of the way from `a` to `b`, kept on `a`'s sphere.
    fn interpolate(&self, a: DVec3, b: DVec3, t: f64) -> DVec3 {
        let radius = a.length();
        let mid = a.lerp(b, t.clamp(0.0, 1.0));
        match mid.try_normalize() {
            Some(dir) => dir * radius,
            // Antipodal endpoints at the midpoint; fall back to the chord.
            None => mid,
        }
    }
}
