//! Waypoint navigation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::scurve::TrackLimits;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for waypoint navigation
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Maximum horizontal speed
    pub speed_xy_ms: f64,

    /// Maximum climb rate
    pub speed_up_ms: f64,

    /// Maximum descent rate, given as a magnitude
    pub speed_down_ms: f64,

    /// Maximum horizontal acceleration
    pub accel_xy_mss: f64,

    /// Maximum vertical acceleration
    pub accel_z_mss: f64,

    /// Duration of each jerk ramp
    pub jerk_time_s: f64,

    /// Maximum jerk
    pub jerk_max_msss: f64,

    /// The maximum distance from a waypoint at which the corner may be cut.
    pub wp_radius_m: f64,

    /// If true the next leg is started before the current one finishes so
    /// the vehicle doesn't stop at intermediate waypoints.
    pub fast_waypoints: bool,

    /// Period of the navigation cycle.
    pub cycle_period_s: f64,

    /// Maximum duration of a mission, after which the executable will stop.
    pub max_duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The kinematic limits used to build each leg.
    pub fn track_limits(&self) -> TrackLimits {
        TrackLimits {
            speed_xy: self.speed_xy_ms,
            speed_up: self.speed_up_ms,
            speed_down: self.speed_down_ms,
            accel_xy: self.accel_xy_mss,
            accel_z: self.accel_z_mss,
            jerk_time: self.jerk_time_s,
            jerk_max: self.jerk_max_msss,
        }
    }
}
