//! Climb-rate profile and altitude integration.

use overflight_core::components::FlightStats;
use overflight_core::constants::CLIMB_PROFILE;
use overflight_core::enums::Vertical;

/// Climb-rate multiplier at `ratio` = altitude / max altitude, by linear
/// interpolation over `CLIMB_PROFILE`.
pub fn climb_multiplier(ratio: f64) -> f64 {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    for pair in CLIMB_PROFILE.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if ratio <= x1 {
            let t = if x1 > x0 { (ratio - x0) / (x1 - x0) } else { 1.0 };
            return y0 + (y1 - y0) * t;
        }
    }
    CLIMB_PROFILE[CLIMB_PROFILE.len() - 1].1
}

/// Altitude after one tick climbing or descending, clamped to the vehicle's
/// altitude band.
pub fn step_altitude(altitude: f64, vertical: Vertical, stats: &FlightStats) -> f64 {
    let ratio = if stats.max_altitude > 0.0 {
        altitude / stats.max_altitude
    } else {
        0.0
    };
    let next = altitude + vertical.sign() * stats.climb_rate * climb_multiplier(ratio);
    next.min(stats.max_altitude).max(stats.min_altitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> FlightStats {
        FlightStats {
            flight_speed: 1.0,
            climb_rate: 10.0,
            min_altitude: 0.0,
            max_altitude: 1000.0,
            landing_altitude: 50.0,
        }
    }

    #[test]
    fn test_profile_breakpoints() {
        assert!((climb_multiplier(0.0) - 0.65).abs() < 1e-12);
        assert!((climb_multiplier(0.05) - 1.0).abs() < 1e-12);
        assert!((climb_multiplier(0.5) - 1.0).abs() < 1e-12);
        assert!((climb_multiplier(0.95) - 1.0).abs() < 1e-12);
        assert!((climb_multiplier(1.0) - 0.15).abs() < 1e-12);
        // Halfway up the takeoff ramp.
        assert!((climb_multiplier(0.025) - 0.825).abs() < 1e-12);
    }

    #[test]
    fn test_profile_clamps_out_of_range() {
        assert_eq!(climb_multiplier(-1.0), climb_multiplier(0.0));
        assert_eq!(climb_multiplier(3.0), climb_multiplier(1.0));
        assert_eq!(climb_multiplier(f64::NAN), climb_multiplier(0.0));
    }

    #[test]
    fn test_takeoff_is_slow() {
        let stats = stats();
        let first = step_altitude(0.0, Vertical::Ascend, &stats);
        assert!((first - 6.5).abs() < 1e-12, "takeoff climb: {first}");
        let cruise = step_altitude(500.0, Vertical::Ascend, &stats) - 500.0;
        assert!((cruise - 10.0).abs() < 1e-12, "cruise climb: {cruise}");
    }

    #[test]
    fn test_altitude_stays_in_band() {
        let stats = stats();
        let mut alt = 0.0;
        for _ in 0..500 {
            alt = step_altitude(alt, Vertical::Ascend, &stats);
            assert!((stats.min_altitude..=stats.max_altitude).contains(&alt));
        }
        assert!(alt > 990.0, "should approach the ceiling, got {alt}");
        for _ in 0..500 {
            alt = step_altitude(alt, Vertical::Descend, &stats);
            assert!((stats.min_altitude..=stats.max_altitude).contains(&alt));
        }
        assert_eq!(alt, 0.0);
    }
}
