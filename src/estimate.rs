//! Mission time and battery estimation.
//!
//! Heuristic, not a flight-dynamics model: ground speed comes from a power
//! curve fit against reference flight logs, and battery draw from an
//! empirical per-minute drain rate. Distances are haversine over the Earth's
//! mean radius, with altitude changes folded in as a Euclidean hypotenuse.

use crate::config::ActionConfig;
use crate::model::{MissionEstimate, Waypoint};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Ground-speed curve `speed = a * spacing^b + c`, fit from reference logs.
const SPEED_CURVE_COEFF: f64 = 0.32;
const SPEED_CURVE_EXPONENT: f64 = 0.62;
const SPEED_CURVE_BASE_MPS: f64 = 1.7;

// Very close waypoints never reach cruise: extra deceleration and
// stabilization overhead, modeled as a flat penalty below the threshold.
const TIGHT_SPACING_METERS: f64 = 8.0;
const TIGHT_SPACING_PENALTY: f64 = 0.85;

// Long missions creep slower per waypoint past the calibration baseline.
const COUNT_BASELINE: f64 = 20.0;
const COUNT_CORRECTION_PER_WAYPOINT: f64 = 0.002;
const COUNT_CORRECTION_FLOOR: f64 = 0.85;

/// Fixed settle-and-store overhead per photograph, on top of any hover.
pub const PHOTO_PROCESS_SECONDS: f64 = 2.5;

// The speed curve was fit on photo-only missions, so the base time already
// assumes this much action time per waypoint. Configured action timing is
// applied as a delta against it.
const CALIBRATION_ACTION_SECONDS: f64 = 2.5;

const BATTERY_DRAIN_PER_MINUTE: f64 = 3.2;

/// Great-circle surface distance between two waypoints, in meters.
/// Ignores altitude.
pub fn haversine_meters(a: &Waypoint, b: &Waypoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Full leg distance: surface distance and altitude delta combined as a
/// hypotenuse. The altitude contribution is straight-line, not a second
/// haversine.
pub fn leg_meters(a: &Waypoint, b: &Waypoint) -> f64 {
    haversine_meters(a, b).hypot(b.altitude_meters - a.altitude_meters)
}

/// Estimate mission duration and battery draw.
///
/// Returns `None` for fewer than two waypoints: there is no route to
/// estimate, and the caller reports the estimate as unavailable.
pub fn estimate(waypoints: &[Waypoint], config: &ActionConfig) -> Option<MissionEstimate> {
    if waypoints.len() < 2 {
        return None;
    }
    let count = waypoints.len() as f64;

    let total_distance_meters: f64 = waypoints
        .windows(2)
        .map(|pair| leg_meters(&pair[0], &pair[1]))
        .sum();

    let spacing = total_distance_meters / count;
    let speed = effective_speed_mps(spacing, count);

    let hover = if config.hover_enabled {
        config.hover_seconds
    } else {
        0.0
    };
    let action_time_seconds = (hover + PHOTO_PROCESS_SECONDS) * count;

    // Base time bakes in the calibration action-time assumption; subtract it
    // out to get pure flight time, then add the configured action time back.
    let base_seconds = total_distance_meters / speed;
    let flight_time_seconds = (base_seconds - CALIBRATION_ACTION_SECONDS * count).max(0.0);
    let total_time_seconds = flight_time_seconds + action_time_seconds;

    let battery_percent = (total_time_seconds / 60.0 * BATTERY_DRAIN_PER_MINUTE).min(100.0);

    Some(MissionEstimate {
        total_distance_meters,
        flight_time_seconds,
        action_time_seconds,
        total_time_seconds,
        battery_percent,
    })
}

/// Calibrated ground speed for a given average spacing and waypoint count.
fn effective_speed_mps(spacing_meters: f64, waypoint_count: f64) -> f64 {
    let mut speed = SPEED_CURVE_COEFF * spacing_meters.powf(SPEED_CURVE_EXPONENT)
        + SPEED_CURVE_BASE_MPS;

    if spacing_meters < TIGHT_SPACING_METERS {
        speed *= TIGHT_SPACING_PENALTY;
    }

    let over_baseline = (waypoint_count - COUNT_BASELINE).max(0.0);
    let count_factor =
        (1.0 - COUNT_CORRECTION_PER_WAYPOINT * over_baseline).max(COUNT_CORRECTION_FLOOR);

    speed * count_factor
}
